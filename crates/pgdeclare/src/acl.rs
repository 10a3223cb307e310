//! Parsing of Postgres ACL items (`aclitem` text such as `dev_reader=cT/postgres`).
//!
//! See <https://www.postgresql.org/docs/current/ddl-priv.html#PRIVILEGE-ABBREVS-TABLE>.

use crate::privilege::{Privilege, PrivilegeSet};
use pgdeclare_sql::unquote_ident;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclGrantee {
    /// Empty grantee segment.
    Public,
    Role(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclEntry {
    pub grantee: AclGrantee,
    pub privileges: PrivilegeSet,
    pub grantor: String,
}

impl AclEntry {
    /// Parse `grantee=codes/grantor`. Returns `None` when the text does not
    /// have that shape.
    pub fn parse(acl: &str) -> Option<Self> {
        let acl = acl.trim();
        let (grantee, rest) = split_name(acl, '=')?;
        let (codes, grantor) = rest.split_once('/')?;

        let mut privileges = PrivilegeSet::new();
        for code in codes.chars() {
            // grant option marker
            if code == '*' {
                continue;
            }
            match Privilege::from_acl_code(code) {
                Some(privilege) => {
                    privileges.insert(privilege);
                }
                None => debug!(code = %code, acl = acl, "skipping unknown ACL privilege code"),
            }
        }

        let grantee = if grantee.is_empty() {
            AclGrantee::Public
        } else {
            AclGrantee::Role(unquote_ident(grantee))
        };

        Some(Self {
            grantee,
            privileges,
            grantor: unquote_ident(grantor),
        })
    }

    pub fn is_for(&self, role: &str) -> bool {
        matches!(&self.grantee, AclGrantee::Role(name) if name == role)
    }
}

/// Split at the first `sep` that is not inside a double-quoted name.
fn split_name(s: &str, sep: char) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    for (idx, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => return Some((&s[..idx], &s[idx + c.len_utf8()..])),
            _ => {}
        }
    }
    None
}

/// Union of the privileges granted to `role` across `acls`.
///
/// Entries for other grantees are ignored, and so are entries that do not
/// parse.
pub fn privileges_for<'a>(acls: impl IntoIterator<Item = &'a str>, role: &str) -> PrivilegeSet {
    let mut privileges = PrivilegeSet::new();
    for acl in acls {
        match AclEntry::parse(acl) {
            Some(entry) if entry.is_for(role) => privileges.extend(entry.privileges),
            Some(_) => {}
            None => warn!(acl = acl, "could not parse ACL entry"),
        }
    }
    privileges
}
