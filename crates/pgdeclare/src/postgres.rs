//! tokio-postgres backed [`SqlExecutor`].
//!
//! Every statement and query runs inside a `tracing::debug_span!`, so running
//! with `RUST_LOG=pgdeclare=debug` shows the SQL sent to the cluster.

use crate::BoxFuture;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::executor::{Query, Row, SqlExecutor, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls};
use tracing::Instrument;

/// Executes statements over one cached connection per target.
///
/// Connections are opened on first use and kept for the lifetime of the
/// executor. A connection the server closed (e.g. after `DROP DATABASE ...
/// (FORCE)`) is replaced on next use.
#[derive(Default)]
pub struct PgExecutor {
    clients: Mutex<HashMap<ConnectionConfig, Arc<Client>>>,
}

impl PgExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    async fn client(&self, target: &ConnectionConfig) -> Result<Arc<Client>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(target) {
            if !client.is_closed() {
                return Ok(client.clone());
            }
            tracing::debug!(connection = %target, "cached connection was closed, reconnecting");
        }

        let (client, connection) = target.to_pg_config().connect(NoTls).await?;
        let label = target.to_string();
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(connection = %label, "connection error: {}", e);
            }
        });

        let client = Arc::new(client);
        clients.insert(target.clone(), client.clone());
        Ok(client)
    }
}

impl SqlExecutor for PgExecutor {
    fn commit<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        statements: &'a [String],
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let client = self.client(target).await?;
            for sql in statements {
                let span = tracing::debug_span!(
                    "db.commit",
                    sql = %sql,
                    database = %target.dbname,
                );
                // simple query protocol: each statement autocommits
                client.batch_execute(sql).instrument(span).await?;
            }
            Ok(())
        })
    }

    fn fetch<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(async move {
            let client = self.client(target).await?;
            let params: Vec<&(dyn ToSql + Sync)> = query
                .params
                .iter()
                .map(|p| p as &(dyn ToSql + Sync))
                .collect();
            let span = tracing::debug_span!(
                "db.query",
                sql = %query.sql,
                database = %target.dbname,
                params = params.len(),
                rows = tracing::field::Empty,
            );
            let rows = client
                .query(query.sql.as_str(), &params)
                .instrument(span.clone())
                .await?;
            span.record("rows", rows.len());
            rows.iter().map(decode_row).collect()
        })
    }
}

fn decode_row(row: &tokio_postgres::Row) -> Result<Row> {
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(idx)?.map(Value::Bool)
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(idx)?
                .map(|v| Value::Int(v.into()))
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(idx)?
                .map(|v| Value::Int(v.into()))
        } else if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(idx)?.map(Value::Int)
        } else {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        };
        values.push(value.unwrap_or(Value::Null));
    }
    Ok(values)
}
