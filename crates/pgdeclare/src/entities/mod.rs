mod content;
mod database;
mod role;
mod schema;

pub use content::{DatabaseContent, Table};
pub use database::{Database, DatabaseOption, DatabaseOptionKey};
pub use role::{Role, RoleFlag, RoleOption, RoleOptionKey};
pub use schema::Schema;
