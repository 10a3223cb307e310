//! Options the caller explicitly declared on an entity, in declaration order.

use indexmap::IndexMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A single declarable option. Options sharing a key replace each other.
pub trait DeclaredOption: Clone + Debug {
    type Key: Copy + Eq + Hash + Debug;

    fn key(&self) -> Self::Key;
}

/// Ordered map of declared options.
///
/// Only options the caller set are present, so statement generation can walk
/// them without consulting defaults. Re-declaring an option keeps its first
/// position and replaces its value.
#[derive(Debug, Clone)]
pub struct DeclaredOptions<O: DeclaredOption> {
    options: IndexMap<O::Key, O>,
}

impl<O: DeclaredOption> Default for DeclaredOptions<O> {
    fn default() -> Self {
        Self {
            options: IndexMap::new(),
        }
    }
}

impl<O: DeclaredOption> DeclaredOptions<O> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, option: O) {
        self.options.insert(option.key(), option);
    }

    pub fn get(&self, key: O::Key) -> Option<&O> {
        self.options.get(&key)
    }

    pub fn contains(&self, key: O::Key) -> bool {
        self.options.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &O> {
        self.options.values()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Opt {
        Login(bool),
        Limit(i32),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum OptKey {
        Login,
        Limit,
    }

    impl DeclaredOption for Opt {
        type Key = OptKey;

        fn key(&self) -> OptKey {
            match self {
                Opt::Login(_) => OptKey::Login,
                Opt::Limit(_) => OptKey::Limit,
            }
        }
    }

    #[test]
    fn redeclaring_keeps_position() {
        let mut options = DeclaredOptions::new();
        options.set(Opt::Login(true));
        options.set(Opt::Limit(3));
        options.set(Opt::Login(false));

        let all: Vec<_> = options.iter().cloned().collect();
        assert_eq!(all, vec![Opt::Login(false), Opt::Limit(3)]);
        assert_eq!(options.get(OptKey::Limit), Some(&Opt::Limit(3)));
        assert!(options.contains(OptKey::Login));
    }
}
