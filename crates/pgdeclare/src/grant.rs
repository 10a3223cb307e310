//! Grant declarations and the per-role store they normalize into.

use crate::entity::{DatabaseId, EntityRef, RoleId, SchemaId, TableId};
use crate::privilege::{Privilege, PrivilegeSet};
use indexmap::IndexMap;

/// Something privileges can be granted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantTarget {
    Database(DatabaseId),
    Schema(SchemaId),
    Table(TableId),
}

impl GrantTarget {
    /// The registered entity whose position in the execution order matters
    /// for this target. Tables are created by their content, so they anchor
    /// on it.
    pub fn anchor(self) -> EntityRef {
        match self {
            GrantTarget::Database(id) => EntityRef::Database(id),
            GrantTarget::Schema(id) => EntityRef::Schema(id),
            GrantTarget::Table(id) => EntityRef::Content(id.content),
        }
    }
}

impl From<DatabaseId> for GrantTarget {
    fn from(id: DatabaseId) -> Self {
        GrantTarget::Database(id)
    }
}

impl From<SchemaId> for GrantTarget {
    fn from(id: SchemaId) -> Self {
        GrantTarget::Schema(id)
    }
}

impl From<TableId> for GrantTarget {
    fn from(id: TableId) -> Self {
        GrantTarget::Table(id)
    }
}

/// "Grant these privileges to me on these targets", declared on a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantOn {
    pub privileges: Vec<Privilege>,
    pub on: Vec<GrantTarget>,
}

impl GrantOn {
    pub fn new<T: Into<GrantTarget>>(
        privileges: impl IntoIterator<Item = Privilege>,
        on: impl IntoIterator<Item = T>,
    ) -> Self {
        Self {
            privileges: privileges.into_iter().collect(),
            on: on.into_iter().map(Into::into).collect(),
        }
    }
}

/// "Grant these privileges on me to these roles", declared on a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantTo {
    pub privileges: Vec<Privilege>,
    pub to: Vec<RoleId>,
}

impl GrantTo {
    pub fn new(
        privileges: impl IntoIterator<Item = Privilege>,
        to: impl IntoIterator<Item = RoleId>,
    ) -> Self {
        Self {
            privileges: privileges.into_iter().collect(),
            to: to.into_iter().collect(),
        }
    }
}

/// Privileges a role should hold, keyed by target in declaration order.
///
/// Adding privileges for a target that already has an entry unions them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantStore {
    entries: IndexMap<GrantTarget, PrivilegeSet>,
}

impl GrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, target: GrantTarget, privileges: impl IntoIterator<Item = Privilege>) {
        self.entries.entry(target).or_default().extend(privileges);
    }

    pub fn get(&self, target: GrantTarget) -> Option<&PrivilegeSet> {
        self.entries.get(&target)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GrantTarget, &PrivilegeSet)> {
        self.entries.iter().map(|(target, privileges)| (*target, privileges))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
