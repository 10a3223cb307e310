use crate::entity::{EntityKey, EntityKind};
use crate::privilege::{Privilege, format_privileges};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("invalid connection configuration: {0}")]
    Config(String),

    #[error("no connection configured: a cluster connection must be set before running lifecycle operations")]
    NoConnectionConfigured,

    #[error(
        "there is already a {kind} with the name {name}; set `check_if_exists` to false to skip existing entities"
    )]
    AlreadyExists { kind: EntityKind, name: String },

    #[error(
        "there is no {kind} with the name {name} to remove; set `check_if_exists` to false to skip missing entities"
    )]
    NothingToRemove { kind: EntityKind, name: String },

    #[error("there is no {kind} with the name {name}; the {kind} must exist to {action} privileges")]
    MustExist {
        kind: EntityKind,
        name: String,
        action: &'static str,
    },

    #[error(
        "cannot grant {} on a {kind}; valid privileges for a {kind} are: {}",
        format_privileges(.invalid),
        format_privileges(.valid)
    )]
    InvalidPrivilege {
        kind: EntityKind,
        invalid: Vec<Privilege>,
        valid: Vec<Privilege>,
    },

    #[error("{0} is already declared")]
    DuplicateEntity(EntityKey),

    #[error("{0} was not issued by this registry")]
    UnknownHandle(String),

    #[error("database content {content} does not describe a table named {table}")]
    UnknownTable { content: String, table: String },

    #[error("unexpected result shape for query: {sql}")]
    UnexpectedRow { sql: String },
}

pub type Result<T> = std::result::Result<T, Error>;
