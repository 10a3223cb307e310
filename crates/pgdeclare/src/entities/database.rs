use crate::BoxFuture;
use crate::acl::privileges_for;
use crate::config::ConnectionConfig;
use crate::entities::Role;
use crate::entity::{Context, Entity, EntityKind, EntityRef, RoleId};
use crate::error::Result;
use crate::executor::Query;
use crate::grant::GrantTo;
use crate::grantable::Grantable;
use crate::options::{DeclaredOption, DeclaredOptions};
use crate::privilege::{DATABASE_PRIVILEGES, Privilege, PrivilegeSet};
use crate::registry::Registry;
use crate::session::Session;
use pgdeclare_sql::Ident;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseOption {
    Owner(RoleId),
    Template(String),
    AllowConnections(bool),
    ConnectionLimit(i32),
    IsTemplate(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseOptionKey {
    Owner,
    Template,
    AllowConnections,
    ConnectionLimit,
    IsTemplate,
}

impl DeclaredOption for DatabaseOption {
    type Key = DatabaseOptionKey;

    fn key(&self) -> DatabaseOptionKey {
        match self {
            DatabaseOption::Owner(_) => DatabaseOptionKey::Owner,
            DatabaseOption::Template(_) => DatabaseOptionKey::Template,
            DatabaseOption::AllowConnections(_) => DatabaseOptionKey::AllowConnections,
            DatabaseOption::ConnectionLimit(_) => DatabaseOptionKey::ConnectionLimit,
            DatabaseOption::IsTemplate(_) => DatabaseOptionKey::IsTemplate,
        }
    }
}

/// A Postgres database.
///
/// See <https://www.postgresql.org/docs/current/sql-createdatabase.html>.
///
/// Schemas and table content declared in this database run their statements
/// over a connection to it, derived from the cluster connection on first use.
#[derive(Debug)]
pub struct Database {
    name: String,
    depends_on: Vec<EntityRef>,
    check_if_exists: Option<bool>,
    options: DeclaredOptions<DatabaseOption>,
    connection: OnceLock<ConnectionConfig>,
    pub(crate) pending: Vec<GrantTo>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            check_if_exists: None,
            options: DeclaredOptions::new(),
            connection: OnceLock::new(),
            pending: Vec::new(),
        }
    }

    pub fn depends_on(mut self, entities: impl IntoIterator<Item = impl Into<EntityRef>>) -> Self {
        self.depends_on.extend(entities.into_iter().map(Into::into));
        self
    }

    pub fn check_if_exists(mut self, check: bool) -> Self {
        self.check_if_exists = Some(check);
        self
    }

    pub(crate) fn referenced_roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.options.iter().filter_map(|option| match option {
            DatabaseOption::Owner(owner) => Some(*owner),
            _ => None,
        })
    }

    pub fn owner(mut self, owner: RoleId) -> Self {
        self.options.set(DatabaseOption::Owner(owner));
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.options.set(DatabaseOption::Template(template.into()));
        self
    }

    pub fn allow_connections(mut self, allow: bool) -> Self {
        self.options.set(DatabaseOption::AllowConnections(allow));
        self
    }

    pub fn connection_limit(mut self, limit: i32) -> Self {
        self.options.set(DatabaseOption::ConnectionLimit(limit));
        self
    }

    pub fn is_template(mut self, is_template: bool) -> Self {
        self.options.set(DatabaseOption::IsTemplate(is_template));
        self
    }

    /// Privileges to grant on this database, applied when it is registered.
    pub fn grants(mut self, grants: impl IntoIterator<Item = GrantTo>) -> Self {
        self.pending.extend(grants);
        self
    }

    pub fn options(&self) -> &DeclaredOptions<DatabaseOption> {
        &self.options
    }

    fn marked_template(&self) -> bool {
        matches!(
            self.options.get(DatabaseOptionKey::IsTemplate),
            Some(DatabaseOption::IsTemplate(true))
        )
    }

    pub fn create_sql(&self, registry: &Registry) -> String {
        let mut sql = format!("CREATE DATABASE {}", Ident(&self.name));
        for option in self.options.iter() {
            let clause = match option {
                DatabaseOption::Owner(owner) => {
                    format!(" OWNER={}", Ident(registry.role(*owner).name()))
                }
                DatabaseOption::Template(template) => format!(" TEMPLATE={}", Ident(template)),
                DatabaseOption::AllowConnections(allow) => format!(" ALLOW_CONNECTIONS={}", allow),
                DatabaseOption::ConnectionLimit(limit) => format!(" CONNECTION_LIMIT={}", limit),
                DatabaseOption::IsTemplate(is_template) => format!(" IS_TEMPLATE={}", is_template),
            };
            sql.push_str(&clause);
        }
        sql
    }

    /// Template databases cannot be dropped, so the flag is cleared first.
    pub fn drop_sql(&self) -> Vec<String> {
        let mut statements = Vec::with_capacity(2);
        if self.marked_template() {
            statements.push(format!("ALTER DATABASE {} IS_TEMPLATE false", Ident(&self.name)));
        }
        statements.push(format!("DROP DATABASE {} (FORCE)", Ident(&self.name)));
        statements
    }

    pub fn exists_query(&self) -> Query {
        Query::new("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)").bind(&self.name)
    }

    pub fn acl_query(&self) -> Query {
        Query::new("SELECT unnest(datacl)::text AS acl FROM pg_catalog.pg_database WHERE datname = $1")
            .bind(&self.name)
    }

    /// Connection target for statements that must run inside this database.
    pub fn connection(&self, session: &Session) -> Result<&ConnectionConfig> {
        if let Some(config) = self.connection.get() {
            return Ok(config);
        }
        let config = session.cluster()?.for_database(&self.name);
        Ok(self.connection.get_or_init(|| config))
    }
}

impl Entity for Database {
    fn kind(&self) -> EntityKind {
        EntityKind::Database
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[EntityRef] {
        &self.depends_on
    }

    fn existence_check(&self) -> Option<bool> {
        self.check_if_exists
    }

    fn create<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = cx.session.cluster()?;
            let statements = [self.create_sql(cx.registry)];
            cx.session.executor().commit(target, &statements).await
        })
    }

    fn exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let target = cx.session.cluster()?;
            cx.session
                .executor()
                .fetch_bool(target, &self.exists_query())
                .await
        })
    }

    fn drop<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = cx.session.cluster()?;
            cx.session
                .executor()
                .commit(target, &self.drop_sql())
                .await
        })
    }
}

impl Grantable for Database {
    fn target_kind(&self) -> EntityKind {
        EntityKind::Database
    }

    fn target_sql_name(&self) -> String {
        Ident(&self.name).to_string()
    }

    fn allowed_privileges(&self) -> &'static [Privilege] {
        DATABASE_PRIVILEGES
    }

    fn grant_connection<'a>(&'a self, cx: Context<'a>) -> Result<&'a ConnectionConfig> {
        cx.session.cluster()
    }

    fn target_exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>> {
        Entity::exists(self, cx)
    }

    fn existing_privileges<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
    ) -> BoxFuture<'a, Result<PrivilegeSet>> {
        Box::pin(async move {
            let target = cx.session.cluster()?;
            let acls = cx
                .session
                .executor()
                .fetch_text(target, &self.acl_query())
                .await?;
            Ok(privileges_for(acls.iter().map(String::as_str), grantee.name()))
        })
    }
}
