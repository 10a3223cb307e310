use crate::BoxFuture;
use crate::acl::privileges_for;
use crate::config::ConnectionConfig;
use crate::entities::Role;
use crate::entity::{Context, DatabaseId, Entity, EntityKind, EntityRef, RoleId};
use crate::error::Result;
use crate::executor::Query;
use crate::grant::GrantTo;
use crate::grantable::Grantable;
use crate::privilege::{Privilege, PrivilegeSet, SCHEMA_PRIVILEGES};
use crate::registry::Registry;
use pgdeclare_sql::Ident;

/// A schema inside a declared database.
///
/// See <https://www.postgresql.org/docs/current/sql-createschema.html>.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    database: DatabaseId,
    owner: Option<RoleId>,
    depends_on: Vec<EntityRef>,
    check_if_exists: Option<bool>,
    pub(crate) pending: Vec<GrantTo>,
}

impl Schema {
    pub fn new(name: impl Into<String>, database: DatabaseId) -> Self {
        Self {
            name: name.into(),
            database,
            owner: None,
            depends_on: Vec::new(),
            check_if_exists: None,
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

    /// Rendered as `AUTHORIZATION <owner>`.
    pub fn owner(mut self, owner: RoleId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Privileges to grant on this schema, applied when it is registered.
    pub fn grants(mut self, grants: impl IntoIterator<Item = GrantTo>) -> Self {
        self.pending.extend(grants);
        self
    }

    pub fn database(&self) -> DatabaseId {
        self.database
    }

    pub(crate) fn referenced_roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.owner.into_iter()
    }

    pub fn create_sql(&self, registry: &Registry) -> String {
        match self.owner {
            Some(owner) => format!(
                "CREATE SCHEMA {} AUTHORIZATION {}",
                Ident(&self.name),
                Ident(registry.role(owner).name())
            ),
            None => format!("CREATE SCHEMA {}", Ident(&self.name)),
        }
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP SCHEMA {}", Ident(&self.name))
    }

    pub fn exists_query(&self) -> Query {
        Query::new("SELECT EXISTS(SELECT 1 FROM pg_namespace WHERE nspname = $1)").bind(&self.name)
    }

    pub fn acl_query(&self) -> Query {
        Query::new("SELECT unnest(nspacl)::text AS acl FROM pg_catalog.pg_namespace WHERE nspname = $1")
            .bind(&self.name)
    }

    fn connection<'a>(&self, cx: Context<'a>) -> Result<&'a ConnectionConfig> {
        cx.registry.database(self.database).connection(cx.session)
    }
}

impl Entity for Schema {
    fn kind(&self) -> EntityKind {
        EntityKind::Schema
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
            let target = self.connection(cx)?;
            let statements = [self.create_sql(cx.registry)];
            cx.session.executor().commit(target, &statements).await
        })
    }

    fn exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let target = self.connection(cx)?;
            cx.session
                .executor()
                .fetch_bool(target, &self.exists_query())
                .await
        })
    }

    fn drop<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = self.connection(cx)?;
            cx.session
                .executor()
                .commit(target, &[self.drop_sql()])
                .await
        })
    }
}

impl Grantable for Schema {
    fn target_kind(&self) -> EntityKind {
        EntityKind::Schema
    }

    fn target_sql_name(&self) -> String {
        Ident(&self.name).to_string()
    }

    fn allowed_privileges(&self) -> &'static [Privilege] {
        SCHEMA_PRIVILEGES
    }

    fn grant_connection<'a>(&'a self, cx: Context<'a>) -> Result<&'a ConnectionConfig> {
        self.connection(cx)
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
            let target = self.connection(cx)?;
            let acls = cx
                .session
                .executor()
                .fetch_text(target, &self.acl_query())
                .await?;
            Ok(privileges_for(acls.iter().map(String::as_str), grantee.name()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Database;

    #[test]
    fn create_with_and_without_owner() {
        let mut registry = Registry::new();
        let owner = registry.add_role(Role::new("log_owner")).unwrap();
        let db = registry.add_database(Database::new("dev")).unwrap();
        let plain = registry.add_schema(Schema::new("log", db)).unwrap();
        let owned = registry
            .add_schema(Schema::new("audit", db).owner(owner))
            .unwrap();

        assert_eq!(registry.schema(plain).create_sql(&registry), "CREATE SCHEMA log");
        assert_eq!(
            registry.schema(owned).create_sql(&registry),
            "CREATE SCHEMA audit AUTHORIZATION log_owner"
        );
        assert_eq!(registry.schema(plain).drop_sql(), "DROP SCHEMA log");
    }

    #[test]
    fn grant_statements() {
        let schema = Schema::new("log", DatabaseId(0));
        let role = Role::new("dev_writer");
        let privileges = PrivilegeSet::from([Privilege::Usage, Privilege::Create]);
        assert_eq!(
            schema.grant_sql(&role, &privileges),
            "GRANT USAGE, CREATE ON SCHEMA log TO dev_writer"
        );
    }
}
