//! Declare Postgres cluster objects, then reconcile a cluster to match.
//!
//! Databases, roles, schemas, table content and the privileges between them
//! are registered into a [`Registry`]. A [`Controller`] walks the registry in
//! registration order to create entities and grant privileges, and in reverse
//! order to revoke and drop them. Every step checks the cluster first, so
//! running the same declarations twice is a no-op.
//!
//! # Ordering
//!
//! Registration order is execution order. `depends_on` is recorded on every
//! entity but never used for sorting: declare things in the order they can be
//! created. The one exception is [`Registry::grant`], which moves grantees
//! declared after the object they are granted privileges on to just before it.
//!
//! ```
//! use pgdeclare::{Database, GrantTo, Privilege, Registry, Role};
//!
//! let mut registry = Registry::new();
//! let dev = registry.add_database(Database::new("dev")).unwrap();
//! let reader = registry.add_role(Role::new("dev_reader")).unwrap();
//! registry
//!     .grant(dev, &[GrantTo::new([Privilege::Connect], [reader])])
//!     .unwrap();
//!
//! assert_eq!(registry.position(reader.into()), Some(0));
//! ```
//!
//! # Existence checks
//!
//! `safe_create` on an entity that already exists and `safe_drop` on one
//! that does not are no-ops unless the existence-check policy is enabled,
//! either per entity (`check_if_exists(true)`) or for the whole registry
//! ([`Registry::set_check_if_any_exist`]). With the policy enabled they fail
//! with [`Error::AlreadyExists`] and [`Error::NothingToRemove`].

use std::future::Future;
use std::pin::Pin;

mod acl;
mod config;
mod controller;
mod entities;
mod entity;
mod error;
mod executor;
mod grant;
mod grantable;
mod inspector;
mod options;
mod postgres;
mod privilege;
mod registry;
mod session;

pub use acl::{AclEntry, AclGrantee, privileges_for};
pub use config::ConnectionConfig;
pub use controller::Controller;
pub use entities::{
    Database, DatabaseContent, DatabaseOption, DatabaseOptionKey, Role, RoleFlag, RoleOption,
    RoleOptionKey, Schema, Table,
};
pub use entity::{
    ContentId, Context, DatabaseId, Entity, EntityKey, EntityKind, EntityRef, RoleId, SchemaId,
    TableId,
};
pub use error::{Error, Result};
pub use executor::{Query, Row, SqlExecutor, Value};
pub use grant::{GrantOn, GrantStore, GrantTarget, GrantTo};
pub use grantable::Grantable;
pub use inspector::{SchemaInspector, SqlInspector};
pub use options::{DeclaredOption, DeclaredOptions};
pub use postgres::PgExecutor;
pub use privilege::{
    DATABASE_PRIVILEGES, Privilege, PrivilegeSet, SCHEMA_PRIVILEGES, TABLE_PRIVILEGES,
    check_privileges, format_privileges, invalid_privileges, privilege_clause,
};
pub use registry::Registry;
pub use session::Session;

pub use pgdeclare_tables as tables;

/// Boxed future returned by the object-safe async traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
