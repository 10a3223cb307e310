//! In-memory stand-in for a Postgres cluster.
//!
//! Understands exactly the statements and catalog queries pgdeclare emits,
//! and keeps a log of every committed statement. Table DDL goes through
//! [`SqlInspector`](pgdeclare::SqlInspector), so `CREATE TABLE` / `DROP TABLE`
//! are parsed here too.

#![allow(dead_code)]

use pgdeclare::{
    BoxFuture, ConnectionConfig, DATABASE_PRIVILEGES, Privilege, PrivilegeSet, Query, Result, Row,
    SCHEMA_PRIVILEGES, Session, SqlExecutor, TABLE_PRIVILEGES, Value,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

type Acl = BTreeMap<String, PrivilegeSet>;

#[derive(Debug, Default)]
struct DatabaseState {
    is_template: bool,
    acl: Acl,
}

#[derive(Debug, Default)]
struct State {
    roles: BTreeSet<String>,
    databases: BTreeMap<String, DatabaseState>,
    /// (database, schema)
    schemas: BTreeMap<(String, String), Acl>,
    /// (database, schema, table)
    tables: BTreeMap<(String, String, String), Acl>,
    log: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

pub fn cluster_target() -> ConnectionConfig {
    ConnectionConfig::new("localhost", 5432, "postgres")
}

/// A session on a fresh fake cluster, plus a handle to inspect it.
pub fn session() -> (Arc<FakeCluster>, Session) {
    let cluster = Arc::new(FakeCluster::default());
    let session = Session::new(cluster.clone()).with_connection(cluster_target());
    (cluster, session)
}

fn split_qualified(name: &str) -> (String, String) {
    match name.split_once('.') {
        Some((schema, table)) => (schema.to_string(), table.to_string()),
        None => ("public".to_string(), name.to_string()),
    }
}

fn parse_privileges(list: &str, allowed: &[Privilege]) -> PrivilegeSet {
    let keywords: Vec<&str> = list.split(", ").collect();
    assert!(
        keywords.len() == 1 || !keywords.contains(&"ALL PRIVILEGES"),
        "syntax error: ALL PRIVILEGES combined with other privileges in {list}"
    );
    let mut privileges = PrivilegeSet::new();
    for keyword in keywords {
        let privilege = Privilege::from_keyword(keyword)
            .unwrap_or_else(|| panic!("unknown privilege {keyword}"));
        if privilege == Privilege::AllPrivileges {
            privileges.extend(allowed.iter().filter(|p| **p != Privilege::AllPrivileges));
        } else {
            privileges.insert(privilege);
        }
    }
    privileges
}

fn acl_text(acl: &Acl) -> Vec<Row> {
    acl.iter()
        .filter(|(_, privileges)| !privileges.is_empty())
        .map(|(grantee, privileges)| {
            let codes: String = privileges.iter().filter_map(|p| p.acl_code()).collect();
            vec![Value::Text(format!("{grantee}={codes}/postgres"))]
        })
        .collect()
}

fn bool_row(value: bool) -> Vec<Row> {
    vec![vec![Value::Bool(value)]]
}

impl FakeCluster {
    /// Every committed statement, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.statements()
            .iter()
            .filter(|s| s.starts_with(prefix))
            .count()
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.state.lock().unwrap().roles.contains(name)
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.state.lock().unwrap().databases.contains_key(name)
    }

    pub fn has_table(&self, database: &str, schema: &str, table: &str) -> bool {
        self.state.lock().unwrap().tables.contains_key(&(
            database.to_string(),
            schema.to_string(),
            table.to_string(),
        ))
    }

    /// Grant privileges behind pgdeclare's back, e.g. to simulate drift.
    pub fn grant_on_database(&self, database: &str, role: &str, privileges: &[Privilege]) {
        let mut state = self.state.lock().unwrap();
        let db = state.databases.get_mut(database).expect("unknown database");
        db.acl
            .entry(role.to_string())
            .or_default()
            .extend(privileges.iter().copied());
    }

    fn apply(state: &mut State, dbname: &str, sql: &str) {
        let words: Vec<&str> = sql.split_whitespace().collect();
        match words.as_slice() {
            ["CREATE", "ROLE", name, ..] => {
                assert!(state.roles.insert(name.to_string()), "role {name} exists");
            }
            ["DROP", "ROLE", name] => {
                assert!(state.roles.remove(*name), "role {name} does not exist");
                for db in state.databases.values_mut() {
                    db.acl.remove(*name);
                }
            }
            ["CREATE", "DATABASE", name, options @ ..] => {
                let is_template = options.contains(&"IS_TEMPLATE=true");
                let previous = state.databases.insert(
                    name.to_string(),
                    DatabaseState {
                        is_template,
                        acl: Acl::new(),
                    },
                );
                assert!(previous.is_none(), "database {name} exists");
            }
            ["ALTER", "DATABASE", name, "IS_TEMPLATE", value] => {
                let db = state.databases.get_mut(*name).expect("unknown database");
                db.is_template = *value == "true";
            }
            ["DROP", "DATABASE", name, "(FORCE)"] => {
                let db = state.databases.get(*name).expect("unknown database");
                assert!(!db.is_template, "cannot drop a template database");
                state.databases.remove(*name);
                state.schemas.retain(|(db, _), _| db != name);
                state.tables.retain(|(db, _, _), _| db != name);
            }
            ["CREATE", "SCHEMA", name, ..] => {
                state
                    .schemas
                    .insert((dbname.to_string(), name.to_string()), Acl::new());
            }
            ["DROP", "SCHEMA", name] => {
                let key = (dbname.to_string(), name.to_string());
                assert!(state.schemas.remove(&key).is_some(), "schema {name} does not exist");
            }
            ["CREATE", "TABLE", name, ..] => {
                let (schema, table) = split_qualified(name);
                state
                    .tables
                    .insert((dbname.to_string(), schema, table), Acl::new());
            }
            ["DROP", "TABLE", "IF", "EXISTS", name] => {
                let (schema, table) = split_qualified(name.trim_end_matches(';'));
                state.tables.remove(&(dbname.to_string(), schema, table));
            }
            ["ALTER", "TABLE", ..] | ["CREATE", "INDEX", ..] | ["CREATE", "UNIQUE", "INDEX", ..] => {}
            ["GRANT", ..] => Self::apply_grant(state, dbname, sql, true),
            ["REVOKE", ..] => Self::apply_grant(state, dbname, sql, false),
            _ => panic!("unexpected statement: {sql}"),
        }
    }

    fn apply_grant(state: &mut State, dbname: &str, sql: &str, grant: bool) {
        let (verb, joiner) = if grant { ("GRANT ", " TO ") } else { ("REVOKE ", " FROM ") };
        let rest = sql.strip_prefix(verb).expect("grant verb");
        let (privileges, rest) = rest.split_once(" ON ").expect("ON clause");
        let (object, grantee) = rest.split_once(joiner).expect("grantee clause");
        let (kind, name) = object.split_once(' ').expect("object kind");
        assert!(state.roles.contains(grantee), "role {grantee} does not exist");

        let (acl, allowed) = match kind {
            "DATABASE" => (
                &mut state
                    .databases
                    .get_mut(name)
                    .expect("unknown database")
                    .acl,
                DATABASE_PRIVILEGES,
            ),
            "SCHEMA" => (
                state
                    .schemas
                    .get_mut(&(dbname.to_string(), name.to_string()))
                    .expect("unknown schema"),
                SCHEMA_PRIVILEGES,
            ),
            "TABLE" => {
                let (schema, table) = split_qualified(name);
                (
                    state
                        .tables
                        .get_mut(&(dbname.to_string(), schema, table))
                        .expect("unknown table"),
                    TABLE_PRIVILEGES,
                )
            }
            other => panic!("unexpected grant object kind {other}"),
        };

        let privileges = parse_privileges(privileges, allowed);
        let entry = acl.entry(grantee.to_string()).or_default();
        if grant {
            entry.extend(privileges);
        } else {
            entry.retain(|p| !privileges.contains(p));
        }
    }

    fn answer(state: &State, dbname: &str, query: &Query) -> Vec<Row> {
        let sql = query.sql.as_str();
        let param = |i: usize| query.params[i].clone();
        if sql.contains("pg_authid") {
            bool_row(state.roles.contains(&param(0)))
        } else if sql.contains("unnest(datacl)") {
            state
                .databases
                .get(&param(0))
                .map(|db| acl_text(&db.acl))
                .unwrap_or_default()
        } else if sql.contains("pg_database") {
            bool_row(state.databases.contains_key(&param(0)))
        } else if sql.contains("unnest(nspacl)") {
            state
                .schemas
                .get(&(dbname.to_string(), param(0)))
                .map(acl_text)
                .unwrap_or_default()
        } else if sql.contains("pg_namespace") {
            bool_row(state.schemas.contains_key(&(dbname.to_string(), param(0))))
        } else if sql.contains("information_schema.tables") {
            bool_row(
                state
                    .tables
                    .contains_key(&(dbname.to_string(), param(0), param(1))),
            )
        } else if sql.contains("information_schema.table_privileges") {
            state
                .tables
                .get(&(dbname.to_string(), param(0), param(1)))
                .and_then(|acl| acl.get(&param(2)))
                .map(|privileges| {
                    privileges
                        .iter()
                        .map(|p| vec![Value::Text(p.keyword().to_string())])
                        .collect()
                })
                .unwrap_or_default()
        } else {
            panic!("unexpected query: {sql}")
        }
    }
}

impl SqlExecutor for FakeCluster {
    fn commit<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        statements: &'a [String],
    ) -> BoxFuture<'a, Result<()>> {
        let mut state = self.state.lock().unwrap();
        for statement in statements {
            Self::apply(&mut state, &target.dbname, statement);
            state.log.push(statement.clone());
        }
        Box::pin(async { Ok(()) })
    }

    fn fetch<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<Vec<Row>>> {
        let rows = Self::answer(&self.state.lock().unwrap(), &target.dbname, query);
        Box::pin(async move { Ok(rows) })
    }
}
