use serde::Deserialize;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
}

/// Deployment environment. Development turns on debug logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Development,
    Testing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// Settings for the HTTP server itself.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Reported to Postgres as the `application_name`.
    pub name: String,
    pub environment: Environment,
    /// Hostnames the service is reachable at. Each becomes an allowed CORS origin.
    pub hosts: Vec<String>,
    pub scheme: Scheme,
    pub port: u16,
    /// Seconds to wait for in-flight work during shutdown.
    pub graceful_timeout: u64,
}

impl AppSettings {
    /// `scheme://host` for every configured host.
    pub fn origins(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| format!("{}://{}", self.scheme.as_str(), host))
            .collect()
    }
}

/// Settings for the PostgreSQL connection pool.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub min_connections: u32,
    pub max_connections: u32,
    /// Seconds to keep retrying the initial connection.
    pub connect_retries: u64,
    /// A full connection string. Takes precedence over the individual fields.
    #[serde(default)]
    pub url: Option<String>,
}

impl DatabaseSettings {
    /// The connection string for the pool.
    pub fn dsn(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgresql://{}:{}@{}:{}/{}?sslmode={}",
                self.user, self.password, self.host, self.port, self.name, self.ssl_mode
            ),
        }
    }
}
