//! Postgres privilege keywords and the set algebra used to compare declared
//! privileges with what a cluster reports.

use std::collections::BTreeSet;
use std::fmt;

/// A Postgres privilege keyword.
///
/// See <https://www.postgresql.org/docs/current/ddl-priv.html>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Privilege {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    References,
    Trigger,
    Usage,
    Create,
    Connect,
    Temporary,
    Execute,
    /// Wildcard: every privilege the object kind supports.
    AllPrivileges,
    AlterSystem,
}

pub type PrivilegeSet = BTreeSet<Privilege>;

/// Privileges that can be granted on a database.
pub const DATABASE_PRIVILEGES: &[Privilege] = &[
    Privilege::Create,
    Privilege::Connect,
    Privilege::Temporary,
    Privilege::AllPrivileges,
];

/// Privileges that can be granted on a schema.
pub const SCHEMA_PRIVILEGES: &[Privilege] = &[Privilege::Create, Privilege::Usage];

/// Privileges that can be granted on a table.
pub const TABLE_PRIVILEGES: &[Privilege] = &[
    Privilege::Insert,
    Privilege::Select,
    Privilege::Update,
    Privilege::Delete,
    Privilege::Truncate,
    Privilege::References,
    Privilege::Trigger,
    Privilege::AllPrivileges,
];

impl Privilege {
    /// The SQL keyword, as written in GRANT/REVOKE statements.
    pub fn keyword(self) -> &'static str {
        match self {
            Privilege::Select => "SELECT",
            Privilege::Insert => "INSERT",
            Privilege::Update => "UPDATE",
            Privilege::Delete => "DELETE",
            Privilege::Truncate => "TRUNCATE",
            Privilege::References => "REFERENCES",
            Privilege::Trigger => "TRIGGER",
            Privilege::Usage => "USAGE",
            Privilege::Create => "CREATE",
            Privilege::Connect => "CONNECT",
            Privilege::Temporary => "TEMPORARY",
            Privilege::Execute => "EXECUTE",
            Privilege::AllPrivileges => "ALL PRIVILEGES",
            Privilege::AlterSystem => "ALTER SYSTEM",
        }
    }

    /// Parse a keyword as reported by `information_schema` (e.g. `privilege_type`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let normalized = keyword.trim().to_ascii_uppercase().replace('_', " ");
        let privilege = match normalized.as_str() {
            "SELECT" => Privilege::Select,
            "INSERT" => Privilege::Insert,
            "UPDATE" => Privilege::Update,
            "DELETE" => Privilege::Delete,
            "TRUNCATE" => Privilege::Truncate,
            "REFERENCES" => Privilege::References,
            "TRIGGER" => Privilege::Trigger,
            "USAGE" => Privilege::Usage,
            "CREATE" => Privilege::Create,
            "CONNECT" => Privilege::Connect,
            "TEMPORARY" | "TEMP" => Privilege::Temporary,
            "EXECUTE" => Privilege::Execute,
            "ALL PRIVILEGES" | "ALL" => Privilege::AllPrivileges,
            "ALTER SYSTEM" => Privilege::AlterSystem,
            _ => return None,
        };
        Some(privilege)
    }

    /// Map a single-character ACL code (as found in `datacl`, `nspacl`, ...).
    pub fn from_acl_code(code: char) -> Option<Self> {
        let privilege = match code {
            'r' => Privilege::Select,
            'w' => Privilege::Update,
            'a' => Privilege::Insert,
            'd' => Privilege::Delete,
            'D' => Privilege::Truncate,
            'x' => Privilege::References,
            't' => Privilege::Trigger,
            'X' => Privilege::Execute,
            'U' => Privilege::Usage,
            'C' => Privilege::Create,
            'c' => Privilege::Connect,
            'T' => Privilege::Temporary,
            'A' => Privilege::AlterSystem,
            _ => return None,
        };
        Some(privilege)
    }

    /// Inverse of [`Privilege::from_acl_code`]. `ALL PRIVILEGES` has no code.
    pub fn acl_code(self) -> Option<char> {
        let code = match self {
            Privilege::Select => 'r',
            Privilege::Update => 'w',
            Privilege::Insert => 'a',
            Privilege::Delete => 'd',
            Privilege::Truncate => 'D',
            Privilege::References => 'x',
            Privilege::Trigger => 't',
            Privilege::Execute => 'X',
            Privilege::Usage => 'U',
            Privilege::Create => 'C',
            Privilege::Connect => 'c',
            Privilege::Temporary => 'T',
            Privilege::AlterSystem => 'A',
            Privilege::AllPrivileges => return None,
        };
        Some(code)
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Render privileges as a comma-separated keyword list.
pub fn format_privileges<'a>(privileges: impl IntoIterator<Item = &'a Privilege>) -> String {
    privileges
        .into_iter()
        .map(|p| p.keyword())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Privilege list for a GRANT or REVOKE statement. `ALL PRIVILEGES` cannot be
/// combined with other keywords, so it absorbs the rest of the set.
pub fn privilege_clause(privileges: &PrivilegeSet) -> String {
    if privileges.contains(&Privilege::AllPrivileges) {
        Privilege::AllPrivileges.keyword().to_string()
    } else {
        format_privileges(privileges)
    }
}

/// Privileges in `requested` that are not in `allowed`, in sorted order.
pub fn invalid_privileges(requested: &[Privilege], allowed: &[Privilege]) -> Vec<Privilege> {
    let invalid: PrivilegeSet = requested
        .iter()
        .filter(|p| !allowed.contains(p))
        .copied()
        .collect();
    invalid.into_iter().collect()
}

/// Whether every `declared` privilege is present in `existing`.
///
/// A declared `ALL PRIVILEGES` stands for every allowed privilege except
/// `ALL PRIVILEGES` itself.
pub fn check_privileges(
    declared: &PrivilegeSet,
    existing: &PrivilegeSet,
    allowed: &[Privilege],
) -> bool {
    if declared.contains(&Privilege::AllPrivileges) {
        return allowed
            .iter()
            .filter(|p| **p != Privilege::AllPrivileges)
            .all(|p| existing.contains(p));
    }
    declared.is_subset(existing)
}
