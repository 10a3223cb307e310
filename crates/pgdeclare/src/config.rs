//! Connection targets.

use crate::error::{Error, Result};
use std::fmt;
use tokio_postgres::config::Host;

const DEFAULT_PORT: u16 = 5432;

/// Where to connect: the cluster-wide target, or one derived for a single
/// database with [`ConnectionConfig::for_database`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
}

impl ConnectionConfig {
    /// A target on the `postgres` maintenance database.
    pub fn new(host: impl Into<String>, port: u16, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password: None,
            dbname: "postgres".to_string(),
        }
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = dbname.into();
        self
    }

    /// Parse a libpq URL (`postgres://user:pw@host:port/db`) or key/value
    /// string (`host=... user=...`).
    pub fn from_url(url: &str) -> Result<Self> {
        let config: tokio_postgres::Config = url
            .parse()
            .map_err(|e| Error::Config(format!("could not parse connection string: {}", e)))?;

        let host = match config.get_hosts().first() {
            Some(Host::Tcp(host)) => host.clone(),
            Some(_) => {
                return Err(Error::Config(
                    "unix socket connection targets are not supported".to_string(),
                ));
            }
            None => "localhost".to_string(),
        };
        let port = config.get_ports().first().copied().unwrap_or(DEFAULT_PORT);
        let user = config.get_user().unwrap_or("postgres").to_string();
        let password = config
            .get_password()
            .map(|pw| String::from_utf8_lossy(pw).into_owned());
        let dbname = config.get_dbname().unwrap_or(&user).to_string();

        Ok(Self {
            host,
            port,
            user,
            password,
            dbname,
        })
    }

    /// Read `DATABASE_URL`, loading a `.env` file first if there is one.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".to_string()))?;
        Self::from_url(&url)
    }

    /// Same host, port and credentials, connected to `dbname` instead.
    pub fn for_database(&self, dbname: &str) -> Self {
        Self {
            dbname: dbname.to_string(),
            ..self.clone()
        }
    }

    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname);
        if let Some(password) = &self.password {
            config.password(password);
        }
        config
    }
}

// Never print the password.
impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgres://{}@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("dbname", &self.dbname)
            .finish()
    }
}
