//! The SQL executor capability.

use crate::BoxFuture;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};

/// A column value as returned by [`SqlExecutor::fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

pub type Row = Vec<Value>;

/// A read-only query with `$n` placeholders bound to text parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<String>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// Executes statements against a connection target.
pub trait SqlExecutor: Send + Sync {
    /// Execute each statement on its own, in order, with autocommit semantics.
    fn commit<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        statements: &'a [String],
    ) -> BoxFuture<'a, Result<()>>;

    /// Run a read-only query and return its rows.
    fn fetch<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<Vec<Row>>>;

    /// Run a query whose first row's first column is a boolean.
    fn fetch_bool<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let rows = self.fetch(target, query).await?;
            rows.first()
                .and_then(|row| row.first())
                .and_then(Value::as_bool)
                .ok_or_else(|| Error::UnexpectedRow {
                    sql: query.sql.clone(),
                })
        })
    }

    /// Run a query and collect its first column as text, skipping NULLs.
    fn fetch_text<'a>(
        &'a self,
        target: &'a ConnectionConfig,
        query: &'a Query,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        Box::pin(async move {
            let rows = self.fetch(target, query).await?;
            let mut values = Vec::with_capacity(rows.len());
            for row in rows {
                match row.into_iter().next() {
                    Some(Value::Text(s)) => values.push(s),
                    Some(Value::Null) => {}
                    _ => {
                        return Err(Error::UnexpectedRow {
                            sql: query.sql.clone(),
                        });
                    }
                }
            }
            Ok(values)
        })
    }
}
