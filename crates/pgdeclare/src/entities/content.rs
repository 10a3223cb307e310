//! Table content of a database, described by a [`TableSet`], and the
//! per-table grant targets derived from it.

use crate::BoxFuture;
use crate::config::ConnectionConfig;
use crate::entities::Role;
use crate::entity::{ContentId, Context, DatabaseId, Entity, EntityKind, EntityRef};
use crate::error::Result;
use crate::executor::Query;
use crate::grantable::Grantable;
use crate::privilege::{Privilege, PrivilegeSet, TABLE_PRIVILEGES};
use pgdeclare_sql::Qualified;
use pgdeclare_tables::TableSet;
use tracing::debug;

/// The tables of a [`TableSet`], created and dropped as one unit inside a
/// declared database.
///
/// Table DDL is left to the session's
/// [`SchemaInspector`](crate::SchemaInspector). Every described table also
/// becomes a [`Table`] grant target once the content is registered.
#[derive(Debug, Clone)]
pub struct DatabaseContent {
    name: String,
    database: DatabaseId,
    tables: TableSet,
    depends_on: Vec<EntityRef>,
    check_if_exists: Option<bool>,
    pub(crate) handles: Vec<Table>,
}

impl DatabaseContent {
    pub fn new(name: impl Into<String>, database: DatabaseId, tables: TableSet) -> Self {
        Self {
            name: name.into(),
            database,
            tables,
            depends_on: Vec::new(),
            check_if_exists: None,
            handles: Vec::new(),
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

    pub fn database(&self) -> DatabaseId {
        self.database
    }

    pub fn tables(&self) -> &TableSet {
        &self.tables
    }

    /// Position of the table named `key` (`name` or `schema.name`).
    pub(crate) fn table_index(&self, key: &str) -> Option<usize> {
        if let Some(idx) = self.tables.tables.get_index_of(key) {
            return Some(idx);
        }
        self.handles
            .iter()
            .position(|table| format!("{}.{}", table.schema, table.name) == key)
    }

    /// Build one [`Table`] per described table.
    pub(crate) fn build_handles(&mut self, id: ContentId) {
        self.handles = self
            .tables
            .iter()
            .map(|def| Table {
                name: def.name.clone(),
                schema: def.schema_name().to_string(),
                content: id,
                database: self.database,
            })
            .collect();
    }

    fn connection<'a>(&self, cx: Context<'a>) -> Result<&'a ConnectionConfig> {
        cx.registry.database(self.database).connection(cx.session)
    }
}

impl Entity for DatabaseContent {
    fn kind(&self) -> EntityKind {
        EntityKind::DatabaseContent
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
            cx.session.inspector().create_all(target, &self.tables).await
        })
    }

    /// Present only when every described table is present.
    fn exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let target = self.connection(cx)?;
            for table in self.tables.iter() {
                let present = cx
                    .session
                    .inspector()
                    .has_table(target, &table.name, table.schema_name())
                    .await?;
                if !present {
                    debug!(content = %self.name, table = %table.key(), "table missing");
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    fn drop<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let target = self.connection(cx)?;
            cx.session.inspector().drop_all(target, &self.tables).await
        })
    }
}

/// One table of a registered [`DatabaseContent`], as a grant target.
///
/// Tables are never created or dropped on their own; their content is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    schema: String,
    content: ContentId,
    database: DatabaseId,
}

impl Table {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn content(&self) -> ContentId {
        self.content
    }

    pub fn privileges_query(&self, grantee: &str) -> Query {
        Query::new(
            "SELECT privilege_type::text FROM information_schema.table_privileges \
             WHERE table_schema = $1::text AND table_name = $2::text AND grantee = $3::text",
        )
        .bind(&self.schema)
        .bind(&self.name)
        .bind(grantee)
    }

    fn connection<'a>(&self, cx: Context<'a>) -> Result<&'a ConnectionConfig> {
        cx.registry.database(self.database).connection(cx.session)
    }
}

impl Grantable for Table {
    fn target_kind(&self) -> EntityKind {
        EntityKind::Table
    }

    fn target_sql_name(&self) -> String {
        Qualified(Some(&self.schema), &self.name).to_string()
    }

    fn allowed_privileges(&self) -> &'static [Privilege] {
        TABLE_PRIVILEGES
    }

    fn grant_connection<'a>(&'a self, cx: Context<'a>) -> Result<&'a ConnectionConfig> {
        self.connection(cx)
    }

    fn target_exists<'a>(&'a self, cx: Context<'a>) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let target = self.connection(cx)?;
            cx.session
                .inspector()
                .has_table(target, &self.name, &self.schema)
                .await
        })
    }

    fn existing_privileges<'a>(
        &'a self,
        cx: Context<'a>,
        grantee: &'a Role,
    ) -> BoxFuture<'a, Result<PrivilegeSet>> {
        Box::pin(async move {
            let target = self.connection(cx)?;
            let rows = cx
                .session
                .executor()
                .fetch_text(target, &self.privileges_query(grantee.name()))
                .await?;
            let mut privileges = PrivilegeSet::new();
            for keyword in rows {
                match Privilege::from_keyword(&keyword) {
                    Some(privilege) => {
                        privileges.insert(privilege);
                    }
                    None => debug!(%keyword, table = %self.name, "ignoring unknown privilege"),
                }
            }
            Ok(privileges)
        })
    }
}
