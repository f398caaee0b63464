//! PostgreSQL connection configuration.

use std::time::Duration;

use crate::error::{PgError, PgResult};

/// PostgreSQL connection configuration.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Host (extracted from URL or explicit).
    pub host: String,
    /// Port (default: 5432).
    pub port: u16,
    /// Database name.
    pub database: String,
    /// Username.
    pub user: String,
    /// Password.
    pub password: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Server-side statement timeout applied to every session.
    pub statement_timeout: Option<Duration>,
    /// Application name (shown in pg_stat_activity).
    pub application_name: Option<String>,
    /// Maximum pooled connections.
    pub max_connections: usize,
}

impl Default for PgConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            user: "postgres".to_string(),
            password: None,
            connect_timeout: Duration::from_secs(30),
            statement_timeout: None,
            application_name: Some("driftless".to_string()),
            max_connections: 4,
        }
    }
}

impl PgConfig {
    /// Create a new configuration from a database URL.
    ///
    /// Query options: `connect_timeout` (seconds), `statement_timeout`
    /// (milliseconds), `application_name`, `max_connections`.
    pub fn from_url(url: impl AsRef<str>) -> PgResult<Self> {
        let parsed = url::Url::parse(url.as_ref())
            .map_err(|e| PgError::config(format!("invalid database URL: {}", e)))?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            return Err(PgError::config(format!(
                "invalid scheme: expected 'postgresql' or 'postgres', got '{}'",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| PgError::config("missing host in URL"))?
            .to_string();

        let database = parsed.path().trim_start_matches('/').to_string();
        if database.is_empty() {
            return Err(PgError::config("missing database name in URL"));
        }

        let mut config = Self {
            host,
            port: parsed.port().unwrap_or(5432),
            database,
            password: parsed.password().map(String::from),
            ..Default::default()
        };
        if !parsed.username().is_empty() {
            config.user = parsed.username().to_string();
        }

        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "connect_timeout" => {
                    let secs: u64 = value
                        .parse()
                        .map_err(|_| PgError::config("invalid connect_timeout"))?;
                    config.connect_timeout = Duration::from_secs(secs);
                }
                "statement_timeout" => {
                    let ms: u64 = value
                        .parse()
                        .map_err(|_| PgError::config("invalid statement_timeout"))?;
                    config.statement_timeout = Some(Duration::from_millis(ms));
                }
                "application_name" => config.application_name = Some(value.into_owned()),
                "max_connections" => {
                    config.max_connections = value
                        .parse()
                        .map_err(|_| PgError::config("invalid max_connections"))?;
                }
                _ => {}
            }
        }

        Ok(config)
    }

    /// Database identity without credentials, used to key advisory locks.
    pub fn identity(&self) -> String {
        format!("postgresql://{}:{}/{}", self.host, self.port, self.database)
    }

    /// Convert to tokio-postgres config.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config.host(&self.host);
        config.port(self.port);
        config.dbname(&self.database);
        config.user(&self.user);

        if let Some(ref password) = self.password {
            config.password(password);
        }

        if let Some(ref app_name) = self.application_name {
            config.application_name(app_name);
        }

        if let Some(timeout) = self.statement_timeout {
            config.options(&format!("-c statement_timeout={}", timeout.as_millis()));
        }

        config.connect_timeout(self.connect_timeout);

        config
    }
}
