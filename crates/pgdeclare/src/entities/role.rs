//! Roles: cluster-wide entities, and the grantee side of every grant.

use crate::BoxFuture;
use crate::entity::{Context, Entity, EntityKind, EntityRef, RoleId};
use crate::error::{Error, Result};
use crate::executor::Query;
use crate::grant::{GrantOn, GrantStore};
use crate::grantable::Grantable;
use crate::options::{DeclaredOption, DeclaredOptions};
use crate::registry::Registry;
use chrono::{DateTime, Utc};
use pgdeclare_sql::{Ident, Lit};

/// Boolean role attributes, rendered as `FLAG` or `NOFLAG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleFlag {
    Superuser,
    CreateDb,
    CreateRole,
    Inherit,
    Login,
    Replication,
    BypassRls,
}

impl RoleFlag {
    pub fn keyword(self) -> &'static str {
        match self {
            RoleFlag::Superuser => "SUPERUSER",
            RoleFlag::CreateDb => "CREATEDB",
            RoleFlag::CreateRole => "CREATEROLE",
            RoleFlag::Inherit => "INHERIT",
            RoleFlag::Login => "LOGIN",
            RoleFlag::Replication => "REPLICATION",
            RoleFlag::BypassRls => "BYPASSRLS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoleOption {
    Flag(RoleFlag, bool),
    ConnectionLimit(i32),
    Password(String),
    ValidUntil(DateTime<Utc>),
    InRole(Vec<RoleId>),
    Role(Vec<RoleId>),
    Admin(Vec<RoleId>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleOptionKey {
    Flag(RoleFlag),
    ConnectionLimit,
    Password,
    ValidUntil,
    InRole,
    Role,
    Admin,
}

impl DeclaredOption for RoleOption {
    type Key = RoleOptionKey;

    fn key(&self) -> RoleOptionKey {
        match self {
            RoleOption::Flag(flag, _) => RoleOptionKey::Flag(*flag),
            RoleOption::ConnectionLimit(_) => RoleOptionKey::ConnectionLimit,
            RoleOption::Password(_) => RoleOptionKey::Password,
            RoleOption::ValidUntil(_) => RoleOptionKey::ValidUntil,
            RoleOption::InRole(_) => RoleOptionKey::InRole,
            RoleOption::Role(_) => RoleOptionKey::Role,
            RoleOption::Admin(_) => RoleOptionKey::Admin,
        }
    }
}

/// A Postgres role.
///
/// See <https://www.postgresql.org/docs/current/sql-createrole.html>.
///
/// ```
/// use pgdeclare::{Registry, Role};
///
/// let mut registry = Registry::new();
/// let reader = registry.add_role(Role::new("dev_reader")).unwrap();
/// let user = registry
///     .add_role(Role::new("dev_user").login(true).password("s3cret").in_role([reader]))
///     .unwrap();
///
/// assert_eq!(
///     registry.role(user).create_sql(&registry),
///     "CREATE ROLE dev_user LOGIN PASSWORD 's3cret' IN ROLE dev_reader"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Role {
    name: String,
    depends_on: Vec<EntityRef>,
    check_if_exists: Option<bool>,
    options: DeclaredOptions<RoleOption>,
    encrypted: bool,
    pub(crate) grants: GrantStore,
    pub(crate) pending: Vec<GrantOn>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends_on: Vec::new(),
            check_if_exists: None,
            options: DeclaredOptions::new(),
            encrypted: false,
            grants: GrantStore::new(),
            pending: Vec::new(),
        }
    }

    /// Roles named in `IN ROLE`, `ROLE` and `ADMIN`.
    pub(crate) fn referenced_roles(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.options
            .iter()
            .filter_map(|option| match option {
                RoleOption::InRole(roles) | RoleOption::Role(roles) | RoleOption::Admin(roles) => {
                    Some(roles.iter().copied())
                }
                _ => None,
            })
            .flatten()
    }

    pub fn depends_on(mut self, entities: impl IntoIterator<Item = impl Into<EntityRef>>) -> Self {
        self.depends_on.extend(entities.into_iter().map(Into::into));
        self
    }

    pub fn check_if_exists(mut self, check: bool) -> Self {
        self.check_if_exists = Some(check);
        self
    }

    fn flag(mut self, flag: RoleFlag, value: bool) -> Self {
        self.options.set(RoleOption::Flag(flag, value));
        self
    }

    pub fn superuser(self, value: bool) -> Self {
        self.flag(RoleFlag::Superuser, value)
    }

    pub fn createdb(self, value: bool) -> Self {
        self.flag(RoleFlag::CreateDb, value)
    }

    pub fn createrole(self, value: bool) -> Self {
        self.flag(RoleFlag::CreateRole, value)
    }

    pub fn inherit(self, value: bool) -> Self {
        self.flag(RoleFlag::Inherit, value)
    }

    pub fn login(self, value: bool) -> Self {
        self.flag(RoleFlag::Login, value)
    }

    pub fn replication(self, value: bool) -> Self {
        self.flag(RoleFlag::Replication, value)
    }

    pub fn bypassrls(self, value: bool) -> Self {
        self.flag(RoleFlag::BypassRls, value)
    }

    pub fn connection_limit(mut self, limit: i32) -> Self {
        self.options.set(RoleOption::ConnectionLimit(limit));
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.options.set(RoleOption::Password(password.into()));
        self
    }

    /// Prefix the password with `ENCRYPTED`. Has no effect without a password.
    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn valid_until(mut self, until: DateTime<Utc>) -> Self {
        self.options.set(RoleOption::ValidUntil(until));
        self
    }

    /// Roles this role becomes a member of.
    pub fn in_role(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.options
            .set(RoleOption::InRole(roles.into_iter().collect()));
        self
    }

    /// Roles that become members of this role.
    pub fn role(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.options.set(RoleOption::Role(roles.into_iter().collect()));
        self
    }

    /// Roles that become members of this role with the right to grant
    /// membership to others.
    pub fn admin(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.options.set(RoleOption::Admin(roles.into_iter().collect()));
        self
    }

    /// Privileges this role should hold, applied when the role is registered.
    pub fn grants(mut self, grants: impl IntoIterator<Item = GrantOn>) -> Self {
        self.pending.extend(grants);
        self
    }

    pub fn options(&self) -> &DeclaredOptions<RoleOption> {
        &self.options
    }

    /// Every target this role should hold privileges on.
    pub fn grant_store(&self) -> &GrantStore {
        &self.grants
    }

    pub fn create_sql(&self, registry: &Registry) -> String {
        let mut sql = format!("CREATE ROLE {}", Ident(&self.name));
        for option in self.options.iter() {
            match option {
                RoleOption::Flag(flag, true) => {
                    sql.push_str(&format!(" {}", flag.keyword()));
                }
                RoleOption::Flag(flag, false) => {
                    sql.push_str(&format!(" NO{}", flag.keyword()));
                }
                RoleOption::ConnectionLimit(limit) => {
                    sql.push_str(&format!(" CONNECTION LIMIT {}", limit));
                }
                RoleOption::Password(password) => {
                    if self.encrypted {
                        sql.push_str(" ENCRYPTED");
                    }
                    sql.push_str(&format!(" PASSWORD {}", Lit(password)));
                    if let Some(RoleOption::ValidUntil(until)) =
                        self.options.get(RoleOptionKey::ValidUntil)
                    {
                        sql.push_str(&valid_until_clause(until));
                    }
                }
                RoleOption::ValidUntil(until) => {
                    // rendered with the password when there is one
                    if !self.options.contains(RoleOptionKey::Password) {
                        sql.push_str(&valid_until_clause(until));
                    }
                }
                RoleOption::InRole(roles) => sql.push_str(&role_list("IN ROLE", roles, registry)),
                RoleOption::Role(roles) => sql.push_str(&role_list("ROLE", roles, registry)),
                RoleOption::Admin(roles) => sql.push_str(&role_list("ADMIN", roles, registry)),
            }
        }
        sql
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP ROLE {}", Ident(&self.name))
    }

    pub fn exists_query(&self) -> Query {
        Query::new("SELECT EXISTS(SELECT 1 FROM pg_authid WHERE rolname = $1)").bind(&self.name)
    }

    async fn require_exists(&self, cx: Context<'_>, action: &'static str) -> Result<()> {
        if Entity::exists(self, cx).await? {
            return Ok(());
        }
        Err(Error::MustExist {
            kind: EntityKind::Role,
            name: self.name.clone(),
            action,
        })
    }

    /// Grant every stored privilege, target by target.
    ///
    /// A role with no stored grants does nothing; otherwise the role must exist.
    pub async fn safe_grant(&self, cx: Context<'_>) -> Result<()> {
        if self.grants.is_empty() {
            return Ok(());
        }
        self.require_exists(cx, "grant").await?;
        for (target, privileges) in self.grants.iter() {
            cx.registry
                .grantable(target)
                .safe_grant(cx, self, privileges)
                .await?;
        }
        Ok(())
    }

    /// Revoke every stored privilege, target by target.
    pub async fn safe_revoke(&self, cx: Context<'_>) -> Result<()> {
        if self.grants.is_empty() {
            return Ok(());
        }
        self.require_exists(cx, "revoke").await?;
        for (target, privileges) in self.grants.iter() {
            cx.registry
                .grantable(target)
                .safe_revoke(cx, self, privileges)
                .await?;
        }
        Ok(())
    }

    /// Whether every stored privilege is granted in the cluster.
    pub async fn grants_exist(&self, cx: Context<'_>) -> Result<bool> {
        if self.grants.is_empty() {
            return Ok(true);
        }
        self.require_exists(cx, "check").await?;
        for (target, privileges) in self.grants.iter() {
            if !cx
                .registry
                .grantable(target)
                .grants_exist(cx, self, privileges)
                .await?
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn valid_until_clause(until: &DateTime<Utc>) -> String {
    let timestamp = until.format("%Y-%m-%d %H:%M:%S%:z").to_string();
    format!(" VALID UNTIL {}", Lit(timestamp))
}

fn role_list(keyword: &str, roles: &[RoleId], registry: &Registry) -> String {
    if roles.is_empty() {
        return String::new();
    }
    let names: Vec<String> = roles
        .iter()
        .map(|id| Ident(registry.role(*id).name()).to_string())
        .collect();
    format!(" {} {}", keyword, names.join(", "))
}

impl Entity for Role {
    fn kind(&self) -> EntityKind {
        EntityKind::Role
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
                .commit(target, &[self.drop_sql()])
                .await
        })
    }
}
