//! The lifecycle contract shared by every declared entity.

use crate::BoxFuture;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::session::Session;
use std::fmt;
use tracing::{debug, info};

/// Handle to a registered [`Database`](crate::Database).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatabaseId(pub(crate) usize);

/// Handle to a registered [`Role`](crate::Role).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(pub(crate) usize);

/// Handle to a registered [`Schema`](crate::Schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) usize);

/// Handle to a registered [`DatabaseContent`](crate::DatabaseContent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub(crate) usize);

/// Handle to one table of a registered [`DatabaseContent`](crate::DatabaseContent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId {
    pub(crate) content: ContentId,
    pub(crate) index: usize,
}

impl TableId {
    pub fn content(&self) -> ContentId {
        self.content
    }
}

/// Reference to any registered entity, as stored in the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Database(DatabaseId),
    Role(RoleId),
    Schema(SchemaId),
    Content(ContentId),
}

impl From<DatabaseId> for EntityRef {
    fn from(id: DatabaseId) -> Self {
        EntityRef::Database(id)
    }
}

impl From<RoleId> for EntityRef {
    fn from(id: RoleId) -> Self {
        EntityRef::Role(id)
    }
}

impl From<SchemaId> for EntityRef {
    fn from(id: SchemaId) -> Self {
        EntityRef::Schema(id)
    }
}

impl From<ContentId> for EntityRef {
    fn from(id: ContentId) -> Self {
        EntityRef::Content(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Database,
    Role,
    Schema,
    DatabaseContent,
    Table,
}

impl EntityKind {
    /// Object keyword used in GRANT/REVOKE (`ON DATABASE x`, ...).
    pub fn object_keyword(self) -> &'static str {
        match self {
            EntityKind::Database => "DATABASE",
            EntityKind::Role => "ROLE",
            EntityKind::Schema => "SCHEMA",
            EntityKind::DatabaseContent => "DATABASE CONTENT",
            EntityKind::Table => "TABLE",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Database => "database",
            EntityKind::Role => "role",
            EntityKind::Schema => "schema",
            EntityKind::DatabaseContent => "database content",
            EntityKind::Table => "table",
        })
    }
}

/// Identity of an entity: its kind plus its name within its scope.
///
/// Databases and roles are cluster-wide; schemas and contents are scoped to
/// the database they live in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Database(String),
    Role(String),
    Schema { database: String, name: String },
    Content { database: String, name: String },
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Database(name) => write!(f, "database {}", name),
            EntityKey::Role(name) => write!(f, "role {}", name),
            EntityKey::Schema { database, name } => {
                write!(f, "schema {} in database {}", name, database)
            }
            EntityKey::Content { database, name } => {
                write!(f, "database content {} in database {}", name, database)
            }
        }
    }
}

/// What a lifecycle call needs: the declarations and the cluster session.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub session: &'a Session,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, session: &'a Session) -> Self {
        Self { registry, session }
    }

    /// Effective existence-check policy: the entity's own setting, else the
    /// registry-wide default.
    pub fn check_if_exists(&self, entity_policy: Option<bool>) -> bool {
        entity_policy.unwrap_or_else(|| self.registry.check_if_any_exist())
    }
}

/// A declared cluster or database object with a create/exists/drop lifecycle.
///
/// `create` and `drop` do no checking of their own; the `safe_*` wrappers
/// consult `exists` first.
pub trait Entity: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn name(&self) -> &str;

    /// Declared dependencies. Informational only: execution order is the
    /// registration order.
    fn dependencies(&self) -> &[EntityRef];

    /// Entity-level existence-check policy; `None` inherits the registry default.
    fn existence_check(&self) -> Option<bool>;

    fn create<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>>;

    fn exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>>;

    fn drop<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>>;

    /// Create the entity unless it already exists.
    ///
    /// An existing entity is an [`Error::AlreadyExists`] when the
    /// existence-check policy is enabled, and a no-op otherwise.
    fn safe_create<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.exists(cx).await? {
                self.create(cx).await?;
                info!(kind = %self.kind(), name = self.name(), "created");
                return Ok(());
            }
            if cx.check_if_exists(self.existence_check()) {
                return Err(Error::AlreadyExists {
                    kind: self.kind(),
                    name: self.name().to_string(),
                });
            }
            debug!(kind = %self.kind(), name = self.name(), "already exists, skipping");
            Ok(())
        })
    }

    /// Drop the entity if it exists.
    ///
    /// A missing entity is an [`Error::NothingToRemove`] when the
    /// existence-check policy is enabled, and a no-op otherwise.
    fn safe_drop<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if self.exists(cx).await? {
                self.drop(cx).await?;
                info!(kind = %self.kind(), name = self.name(), "dropped");
                return Ok(());
            }
            if cx.check_if_exists(self.existence_check()) {
                return Err(Error::NothingToRemove {
                    kind: self.kind(),
                    name: self.name().to_string(),
                });
            }
            debug!(kind = %self.kind(), name = self.name(), "does not exist, nothing to drop");
            Ok(())
        })
    }
}
