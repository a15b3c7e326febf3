use std::env;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Which set of collaborators the service wires at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted row store, object store, identity provider, and email API.
    Hosted,
    /// Process-local adapters; nothing leaves the process.
    Memory,
}

impl BackendKind {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "hosted" => Ok(Self::Hosted),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidBackend {
                value: other.to_string(),
            }),
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub backend: BackendKind,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub store: StoreConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );
        let backend = BackendKind::from_str(&env::var("APP_BACKEND").unwrap_or_default())?;

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::from_str(&env::var("APP_LOG_FORMAT").unwrap_or_default());

        Ok(Self {
            environment,
            backend,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            store: StoreConfig {
                url: optional_var("STORE_URL"),
                service_key: optional_var("STORE_SERVICE_KEY"),
            },
            email: EmailConfig {
                api_key: optional_var("EMAIL_API_KEY"),
                from: env::var("EMAIL_FROM")
                    .unwrap_or_else(|_| EmailConfig::DEFAULT_FROM.to_string()),
                api_url: env::var("EMAIL_API_URL")
                    .unwrap_or_else(|_| EmailConfig::DEFAULT_API_URL.to_string()),
            },
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Hosted backend credentials. Both values are only required once an adapter
/// actually talks to the backend.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub service_key: Option<String>,
}

impl StoreConfig {
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        self.url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .ok_or(ConfigError::Missing {
                variable: "STORE_URL",
            })
    }

    pub fn service_key(&self) -> Result<&str, ConfigError> {
        self.service_key.as_deref().ok_or(ConfigError::Missing {
            variable: "STORE_SERVICE_KEY",
        })
    }
}

/// Transactional email provider settings.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from: String,
    pub api_url: String,
}

impl EmailConfig {
    pub const DEFAULT_FROM: &'static str = "Talent Match <team@talentmatch.dev>";
    pub const DEFAULT_API_URL: &'static str = "https://api.resend.com";

    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key.as_deref().ok_or(ConfigError::Missing {
            variable: "EMAIL_API_KEY",
        })
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            from: Self::DEFAULT_FROM.to_string(),
            api_url: Self::DEFAULT_API_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a valid u16")]
    InvalidPort,
    #[error("APP_HOST must parse to an IPv4 or IPv6 address")]
    InvalidHost { source: std::net::AddrParseError },
    #[error("APP_BACKEND must be 'hosted' or 'memory', got '{value}'")]
    InvalidBackend { value: String },
    #[error("{variable} is not set; it is required to reach the hosted services")]
    Missing { variable: &'static str },
}
