//! Table schema descriptions for pgdeclare.
//!
//! A [`TableSet`] is the collection of tables a `DatabaseContent` entity
//! brings into a database. It is plain data: the core only asks it for
//! table names/schemas and hands it to a schema inspector, which uses the
//! [`ddl`] module to render the statements.
//!
//! ```
//! use pgdeclare_tables::{Column, PgType, TableDef, TableSet};
//!
//! let tables = TableSet::new()
//!     .with(
//!         TableDef::new("article")
//!             .column(Column::new("id", PgType::BigSerial).primary_key())
//!             .column(Column::new("title", PgType::Text)),
//!     )
//!     .with(TableDef::new("bad_request").in_schema("log"));
//!
//! assert!(tables.get("log.bad_request").is_some());
//! ```

pub mod ddl;

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

/// Schema tables land in when none is given.
pub const DEFAULT_SCHEMA: &str = "public";

/// Column types a [`Column`] can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PgType {
    SmallInt,
    Integer,
    BigInt,
    Serial,
    BigSerial,
    Real,
    DoublePrecision,
    Numeric,
    Boolean,
    Text,
    /// `VARCHAR(n)`
    Varchar(u32),
    Bytea,
    Timestamptz,
    Date,
    Time,
    Uuid,
    Jsonb,
}

impl PgType {
    /// Type name as written in DDL, for types without a modifier.
    fn sql_name(self) -> Option<&'static str> {
        let name = match self {
            PgType::SmallInt => "SMALLINT",
            PgType::Integer => "INTEGER",
            PgType::BigInt => "BIGINT",
            PgType::Serial => "SERIAL",
            PgType::BigSerial => "BIGSERIAL",
            PgType::Real => "REAL",
            PgType::DoublePrecision => "DOUBLE PRECISION",
            PgType::Numeric => "NUMERIC",
            PgType::Boolean => "BOOLEAN",
            PgType::Text => "TEXT",
            PgType::Bytea => "BYTEA",
            PgType::Timestamptz => "TIMESTAMPTZ",
            PgType::Date => "DATE",
            PgType::Time => "TIME",
            PgType::Uuid => "UUID",
            PgType::Jsonb => "JSONB",
            PgType::Varchar(_) => return None,
        };
        Some(name)
    }
}

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.sql_name()) {
            (_, Some(name)) => f.write_str(name),
            (PgType::Varchar(len), None) => write!(f, "VARCHAR({})", len),
            (other, None) => write!(f, "{:?}", other),
        }
    }
}

/// One column of a [`TableDef`]. Columns are `NOT NULL` unless made
/// [`nullable`](Column::nullable).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub pg_type: PgType,
    pub nullable: bool,
    /// SQL expression used as `DEFAULT`
    pub default: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, pg_type: PgType) -> Self {
        Self {
            name: name.into(),
            pg_type,
            nullable: false,
            default: None,
            primary_key: false,
            unique: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// e.g. `Column::new("created_at", PgType::Timestamptz).default("now()")`
    pub fn default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// `FOREIGN KEY (columns) REFERENCES references_table(references_columns)`.
///
/// `references_table` may be schema-qualified; a bare name resolves in the
/// schema of the table declaring the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
}

impl ForeignKey {
    /// Build a single-column foreign key from a reference such as
    /// `"tenant.id"`, `"log.tenant.id"` or `"tenant(id)"`.
    pub fn parse(column: impl Into<String>, reference: &str) -> Option<Self> {
        let (table, referenced) = parse_fk_reference(reference)?;
        Some(Self {
            columns: vec![column.into()],
            references_table: table.to_string(),
            references_columns: vec![referenced.to_string()],
        })
    }
}

/// Split a foreign key reference into `(table, column)`.
///
/// Accepts `table.column` (the table part may itself be schema-qualified)
/// and `table(column)`.
pub fn parse_fk_reference(fk_ref: &str) -> Option<(&str, &str)> {
    if let Some(open) = fk_ref.find('(') {
        let inner = fk_ref.strip_suffix(')')?.get(open + 1..)?;
        let table = &fk_ref[..open];
        if table.is_empty() || inner.is_empty() || inner.contains(['(', ')']) {
            return None;
        }
        return Some((table, inner));
    }

    let dot = fk_ref.rfind('.')?;
    let (table, column) = (&fk_ref[..dot], &fk_ref[dot + 1..]);
    if table.is_empty() || column.is_empty() {
        return None;
    }
    Some((table, column))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Suffix for an index column; ascending is implied.
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "",
            SortOrder::Desc => " DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullsOrder {
    /// Whatever Postgres picks for the sort order.
    #[default]
    Default,
    First,
    Last,
}

impl NullsOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            NullsOrder::Default => "",
            NullsOrder::First => " NULLS FIRST",
            NullsOrder::Last => " NULLS LAST",
        }
    }
}

/// One column of an [`Index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub order: SortOrder,
    pub nulls: NullsOrder,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Asc,
            nulls: NullsOrder::Default,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            order: SortOrder::Desc,
            ..Self::new(name)
        }
    }

    /// Parse `name [ASC|DESC] [NULLS FIRST|NULLS LAST]`. The name may be
    /// double-quoted; trailing words that are not recognized stay part of it.
    pub fn parse(text: &str) -> Self {
        let mut words: Vec<&str> = text.split_whitespace().collect();
        let upper = |w: &str| w.to_ascii_uppercase();

        let mut nulls = NullsOrder::Default;
        if words.len() >= 3 && upper(words[words.len() - 2]) == "NULLS" {
            match upper(words[words.len() - 1]).as_str() {
                "FIRST" => nulls = NullsOrder::First,
                "LAST" => nulls = NullsOrder::Last,
                _ => {}
            }
            if nulls != NullsOrder::Default {
                words.truncate(words.len() - 2);
            }
        }

        let mut order = SortOrder::Asc;
        if words.len() >= 2 {
            match upper(words[words.len() - 1]).as_str() {
                "DESC" => {
                    order = SortOrder::Desc;
                    words.pop();
                }
                "ASC" => {
                    words.pop();
                }
                _ => {}
            }
        }

        Self {
            name: pgdeclare_sql::unquote_ident(&words.join(" ")),
            order,
            nulls,
        }
    }
}

/// `CREATE [UNIQUE] INDEX name ON table (columns) [WHERE ...]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    /// Predicate of a partial index
    pub where_clause: Option<String>,
}

impl Index {
    /// An index named `idx_{table}_{columns}`, each column parsed with
    /// [`IndexColumn::parse`].
    pub fn on(table: &str, columns: &[&str]) -> Self {
        let columns: Vec<IndexColumn> = columns.iter().map(|c| IndexColumn::parse(c)).collect();
        let mut name = format!("idx_{}", table);
        for column in &columns {
            name.push('_');
            name.push_str(&column.name);
        }
        Self {
            name,
            columns,
            unique: false,
            where_clause: None,
        }
    }

    /// Make the index unique; its name switches to the `uq_` prefix.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        if let Some(rest) = self.name.strip_prefix("idx_") {
            self.name = format!("uq_{}", rest);
        }
        self
    }

    pub fn filter(mut self, where_clause: impl Into<String>) -> Self {
        self.where_clause = Some(where_clause.into());
        self
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Schema the table lives in; `None` means [`DEFAULT_SCHEMA`]
    pub schema: Option<String>,
    /// Columns
    pub columns: Vec<Column>,
    /// Foreign keys
    pub foreign_keys: Vec<ForeignKey>,
    /// Indices
    pub indices: Vec<Index>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn in_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    /// The schema name, defaulting to `public`.
    pub fn schema_name(&self) -> &str {
        self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA)
    }

    /// `schema.name` when a schema was given, `name` otherwise.
    pub fn key(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether `reference` (as written in a foreign key) names this table.
    fn is_named(&self, reference: &str, from_schema: &str) -> bool {
        match reference.split_once('.') {
            Some((schema, name)) => schema == self.schema_name() && name == self.name,
            None => reference == self.name && from_schema == self.schema_name(),
        }
    }
}

/// A collection of tables, keyed by [`TableDef::key`] in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    pub tables: IndexMap<String, TableDef>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table. A table with the same key replaces the earlier one.
    pub fn with(mut self, table: TableDef) -> Self {
        self.add(table);
        self
    }

    pub fn add(&mut self, table: TableDef) {
        self.tables.insert(table.key(), table);
    }

    /// Get a table by key (`name` or `schema.name`).
    pub fn get(&self, key: &str) -> Option<&TableDef> {
        self.tables.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables ordered so that every table comes after the tables its foreign
    /// keys reference. Tables caught in a reference cycle keep their
    /// declaration order at the end.
    pub fn dependency_order(&self) -> Vec<&TableDef> {
        let tables: Vec<&TableDef> = self.tables.values().collect();
        let depends: Vec<Vec<usize>> = tables
            .iter()
            .map(|table| {
                table
                    .foreign_keys
                    .iter()
                    .filter_map(|fk| {
                        tables.iter().position(|other| {
                            other.is_named(&fk.references_table, table.schema_name())
                        })
                    })
                    .filter(|&idx| tables[idx].key() != table.key())
                    .collect()
            })
            .collect();

        let mut placed: HashSet<usize> = HashSet::new();
        let mut order = Vec::with_capacity(tables.len());
        loop {
            let ready: Vec<usize> = (0..tables.len())
                .filter(|idx| !placed.contains(idx))
                .filter(|&idx| depends[idx].iter().all(|dep| placed.contains(dep)))
                .collect();
            if ready.is_empty() {
                break;
            }
            for idx in ready {
                placed.insert(idx);
                order.push(tables[idx]);
            }
        }

        for (idx, table) in tables.iter().enumerate() {
            if !placed.contains(&idx) {
                order.push(*table);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests;
