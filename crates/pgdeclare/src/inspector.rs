//! The schema inspector capability: creating, dropping and probing the tables
//! a [`DatabaseContent`](crate::DatabaseContent) describes.

use crate::BoxFuture;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::executor::{Query, SqlExecutor};
use pgdeclare_tables::ddl::{create_statements, drop_statements};
use pgdeclare_tables::{TableDef, TableSet};
use std::sync::Arc;
use tracing::debug;

pub trait SchemaInspector: Send + Sync {
    /// Create every table of `tables` that is missing on `target`.
    fn create_all<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        tables: &'a TableSet,
    ) -> BoxFuture<'a, Result<()>>;

    /// Drop every table of `tables` that is present on `target`.
    fn drop_all<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        tables: &'a TableSet,
    ) -> BoxFuture<'a, Result<()>>;

    fn has_table<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        name: &'a str,
        schema: &'a str,
    ) -> BoxFuture<'a, Result<bool>>;
}

/// [`SchemaInspector`] that queries `information_schema` and emits DDL
/// through a [`SqlExecutor`].
pub struct SqlInspector {
    executor: Arc<dyn SqlExecutor>,
}

impl SqlInspector {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }

    async fn present<'a>(
        &self,
        target: &ConnectionConfig,
        tables: impl IntoIterator<Item = &'a TableDef>,
        want_present: bool,
    ) -> Result<Vec<&'a TableDef>> {
        let mut selected = Vec::new();
        for table in tables {
            let present = self
                .has_table(target, &table.name, table.schema_name())
                .await?;
            if present == want_present {
                selected.push(table);
            } else {
                debug!(
                    table = %table.key(),
                    present,
                    "skipping table already in the desired state"
                );
            }
        }
        Ok(selected)
    }
}

pub(crate) fn has_table_query(name: &str, schema: &str) -> Query {
    Query::new(
        "SELECT EXISTS(SELECT 1 FROM information_schema.tables \
         WHERE table_schema = $1::text AND table_name = $2::text)",
    )
    .bind(schema)
    .bind(name)
}

impl SchemaInspector for SqlInspector {
    fn create_all<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        tables: &'a TableSet,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let missing = self
                .present(target, tables.dependency_order(), false)
                .await?;
            if missing.is_empty() {
                return Ok(());
            }
            let statements = create_statements(missing);
            self.executor.commit(target, &statements).await
        })
    }

    fn drop_all<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        tables: &'a TableSet,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut order = tables.dependency_order();
            order.reverse();
            let present = self.present(target, order, true).await?;
            if present.is_empty() {
                return Ok(());
            }
            let statements = drop_statements(present);
            self.executor.commit(target, &statements).await
        })
    }

    fn has_table<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        name: &'a str,
        schema: &'a str,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let query = has_table_query(name, schema);
            self.executor.fetch_bool(target, &query).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{Row, Value};
    use pgdeclare_tables::{Column, ForeignKey, PgType};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Records commits and answers `has_table` from a fixed set of keys.
    #[derive(Default)]
    struct Recorder {
        present: HashSet<(String, String)>,
        committed: Mutex<Vec<String>>,
    }

    impl SqlExecutor for Recorder {
        fn commit<'a>(
            &'a self,
            _target: &'a ConnectionConfig,
            statements: &'a [String],
        ) -> BoxFuture<'a, Result<()>> {
            self.committed
                .lock()
                .unwrap()
                .extend(statements.iter().cloned());
            Box::pin(async { Ok(()) })
        }

        fn fetch<'a>(
            &'a self,
            _target: &'a ConnectionConfig,
            query: &'a Query,
        ) -> BoxFuture<'a, Result<Vec<Row>>> {
            let key = (query.params[0].clone(), query.params[1].clone());
            let present = self.present.contains(&key);
            Box::pin(async move { Ok(vec![vec![Value::Bool(present)]]) })
        }
    }

    fn tables() -> TableSet {
        TableSet::new()
            .with(
                TableDef::new("article")
                    .column(Column::new("id", PgType::BigSerial).primary_key())
                    .column(Column::new("keyword_id", PgType::BigInt))
                    .foreign_key(ForeignKey::parse("keyword_id", "keyword.id").unwrap()),
            )
            .with(TableDef::new("keyword").column(Column::new("id", PgType::BigSerial).primary_key()))
            .with(TableDef::new("bad_request").in_schema("log"))
    }

    fn target() -> ConnectionConfig {
        ConnectionConfig::new("localhost", 5432, "postgres").dbname("dev")
    }

    #[tokio::test]
    async fn create_all_only_creates_missing_tables() {
        let recorder = Arc::new(Recorder {
            present: [("public".to_string(), "keyword".to_string())].into(),
            ..Default::default()
        });
        let inspector = SqlInspector::new(recorder.clone());
        inspector.create_all(&target(), &tables()).await.unwrap();

        let committed = recorder.committed.lock().unwrap().clone();
        assert_eq!(committed.len(), 3);
        assert_eq!(committed[0], "CREATE TABLE log.bad_request ();");
        assert!(committed[1].starts_with("CREATE TABLE article"));
        assert!(committed[2].starts_with("ALTER TABLE article ADD CONSTRAINT"));
    }

    #[tokio::test]
    async fn drop_all_drops_present_tables_in_reverse_dependency_order() {
        let recorder = Arc::new(Recorder {
            present: [
                ("public".to_string(), "keyword".to_string()),
                ("public".to_string(), "article".to_string()),
            ]
            .into(),
            ..Default::default()
        });
        let inspector = SqlInspector::new(recorder.clone());
        inspector.drop_all(&target(), &tables()).await.unwrap();

        let committed = recorder.committed.lock().unwrap().clone();
        assert_eq!(
            committed,
            vec![
                "DROP TABLE IF EXISTS article;".to_string(),
                "DROP TABLE IF EXISTS keyword;".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn has_table_binds_schema_then_name() {
        let recorder = Arc::new(Recorder {
            present: [("log".to_string(), "bad_request".to_string())].into(),
            ..Default::default()
        });
        let inspector = SqlInspector::new(recorder);
        assert!(inspector.has_table(&target(), "bad_request", "log").await.unwrap());
        assert!(!inspector.has_table(&target(), "bad_request", "public").await.unwrap());
    }
}
