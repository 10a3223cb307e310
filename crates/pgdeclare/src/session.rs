use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::executor::SqlExecutor;
use crate::inspector::{SchemaInspector, SqlInspector};
use crate::postgres::PgExecutor;
use std::sync::Arc;

/// The cluster side of a reconciliation run: how statements are executed,
/// how table metadata is inspected, and the cluster-wide connection target.
#[derive(Clone)]
pub struct Session {
    executor: Arc<dyn SqlExecutor>,
    inspector: Arc<dyn SchemaInspector>,
    cluster: Option<ConnectionConfig>,
}

impl Session {
    /// A session without a connection target, inspecting tables through the
    /// same executor.
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        let inspector = Arc::new(SqlInspector::new(executor.clone()));
        Self {
            executor,
            inspector,
            cluster: None,
        }
    }

    /// A tokio-postgres backed session connected to `cluster`.
    pub fn postgres(cluster: ConnectionConfig) -> Self {
        Self::new(Arc::new(PgExecutor::new())).with_connection(cluster)
    }

    pub fn with_inspector(mut self, inspector: Arc<dyn SchemaInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_connection(mut self, cluster: ConnectionConfig) -> Self {
        self.cluster = Some(cluster);
        self
    }

    pub fn set_connection(&mut self, cluster: ConnectionConfig) {
        self.cluster = Some(cluster);
    }

    /// The cluster-wide connection target.
    pub fn cluster(&self) -> Result<&ConnectionConfig> {
        self.cluster.as_ref().ok_or(Error::NoConnectionConfigured)
    }

    pub fn executor(&self) -> &dyn SqlExecutor {
        self.executor.as_ref()
    }

    pub fn inspector(&self) -> &dyn SchemaInspector {
        self.inspector.as_ref()
    }
}
