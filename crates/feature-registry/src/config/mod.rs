use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::store::Database;
use crate::workflows::notebook::{ClientCredentials, NotebookTarget};

const DEFAULT_FABRIC_API_BASE: &str = "https://api.fabric.microsoft.com";
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_SCOPE: &str = "https://api.fabric.microsoft.com/.default";

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

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub database: DatabaseConfig,
    pub notebook: NotebookConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = LogFormat::parse(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        )?;

        let database = DatabaseConfig {
            path: optional_var("FEATURE_DB_PATH"),
            cache_schema: parse_flag("FEATURE_SCHEMA_CACHE")?,
        };

        let notebook = NotebookConfig {
            api_base: optional_var("FABRIC_API_BASE")
                .unwrap_or_else(|| DEFAULT_FABRIC_API_BASE.to_string()),
            workspace_id: optional_var("FABRIC_WORKSPACE_ID"),
            artifact_id: optional_var("FABRIC_ARTIFACT_ID"),
            tenant_id: optional_var("FABRIC_TENANT_ID"),
            client_id: optional_var("FABRIC_CLIENT_ID"),
            client_secret: optional_var("FABRIC_CLIENT_SECRET"),
            authority: optional_var("FABRIC_AUTHORITY")
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
            scope: optional_var("FABRIC_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            database,
            notebook,
        })
    }

    /// Names of every feature setting that is absent, in declaration order.
    pub fn missing_settings(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.database.path.is_none() {
            missing.push("FEATURE_DB_PATH");
        }
        missing.extend(self.notebook.missing());
        missing
    }
}

/// Empty or whitespace-only values count as unset.
fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(key: &'static str) -> Result<bool, ConfigError> {
    match optional_var(key) {
        None => Ok(false),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { key, value }),
        },
    }
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
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidLogFormat(other.to_string())),
        }
    }
}

/// Location of the feature store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: Option<String>,
    pub cache_schema: bool,
}

impl DatabaseConfig {
    pub fn require(&self) -> Result<Database, ConfigError> {
        self.path
            .as_deref()
            .map(Database::new)
            .ok_or(ConfigError::Missing("FEATURE_DB_PATH"))
    }
}

/// Orchestration API target and service principal used to start notebook runs.
#[derive(Clone)]
pub struct NotebookConfig {
    pub api_base: String,
    pub workspace_id: Option<String>,
    pub artifact_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authority: String,
    pub scope: String,
}

impl NotebookConfig {
    pub fn target(&self) -> Result<NotebookTarget, ConfigError> {
        let workspace_id = self
            .workspace_id
            .clone()
            .ok_or(ConfigError::Missing("FABRIC_WORKSPACE_ID"))?;
        let artifact_id = self
            .artifact_id
            .clone()
            .ok_or(ConfigError::Missing("FABRIC_ARTIFACT_ID"))?;
        Ok(NotebookTarget::new(&self.api_base, workspace_id, artifact_id))
    }

    pub fn credentials(&self) -> Result<ClientCredentials, ConfigError> {
        let tenant_id = self
            .tenant_id
            .clone()
            .ok_or(ConfigError::Missing("FABRIC_TENANT_ID"))?;
        let client_id = self
            .client_id
            .clone()
            .ok_or(ConfigError::Missing("FABRIC_CLIENT_ID"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or(ConfigError::Missing("FABRIC_CLIENT_SECRET"))?;
        Ok(ClientCredentials {
            tenant_id,
            client_id,
            client_secret,
            authority: self.authority.clone(),
            scope: self.scope.clone(),
        })
    }

    fn missing(&self) -> Vec<&'static str> {
        [
            ("FABRIC_WORKSPACE_ID", self.workspace_id.is_none()),
            ("FABRIC_ARTIFACT_ID", self.artifact_id.is_none()),
            ("FABRIC_TENANT_ID", self.tenant_id.is_none()),
            ("FABRIC_CLIENT_ID", self.client_id.is_none()),
            ("FABRIC_CLIENT_SECRET", self.client_secret.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, absent)| absent.then_some(key))
        .collect()
    }
}

impl fmt::Debug for NotebookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotebookConfig")
            .field("api_base", &self.api_base)
            .field("workspace_id", &self.workspace_id)
            .field("artifact_id", &self.artifact_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("authority", &self.authority)
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidLogFormat(String),
    InvalidFlag { key: &'static str, value: String },
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidLogFormat(value) => {
                write!(f, "APP_LOG_FORMAT must be 'compact' or 'json', got '{value}'")
            }
            ConfigError::InvalidFlag { key, value } => {
                write!(f, "{key} must be a boolean flag, got '{value}'")
            }
            ConfigError::Missing(key) => write!(f, "{key} is not set."),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidLogFormat(_)
            | ConfigError::InvalidFlag { .. }
            | ConfigError::Missing(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    const KEYS: &[&str] = &[
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "APP_LOG_FORMAT",
        "FEATURE_DB_PATH",
        "FEATURE_SCHEMA_CACHE",
        "FABRIC_API_BASE",
        "FABRIC_WORKSPACE_ID",
        "FABRIC_ARTIFACT_ID",
        "FABRIC_TENANT_ID",
        "FABRIC_CLIENT_ID",
        "FABRIC_CLIENT_SECRET",
        "FABRIC_AUTHORITY",
        "FABRIC_SCOPE",
    ];

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.log_format, LogFormat::Compact);
        assert!(!config.database.cache_schema);
        assert_eq!(config.notebook.api_base, DEFAULT_FABRIC_API_BASE);
        assert_eq!(config.notebook.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reports_every_missing_feature_setting() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FABRIC_TENANT_ID", "tenant");
        env::set_var("FABRIC_CLIENT_SECRET", "   ");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(
            config.missing_settings(),
            vec![
                "FEATURE_DB_PATH",
                "FABRIC_WORKSPACE_ID",
                "FABRIC_ARTIFACT_ID",
                "FABRIC_CLIENT_ID",
                "FABRIC_CLIENT_SECRET",
            ]
        );
        match config.notebook.credentials() {
            Err(ConfigError::Missing("FABRIC_CLIENT_ID")) => {}
            other => panic!("expected missing client id, got {other:?}"),
        }
        reset_env();
    }

    #[test]
    fn builds_notebook_target_and_credentials_when_complete() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FABRIC_API_BASE", "https://fabric.example/");
        env::set_var("FABRIC_WORKSPACE_ID", "ws-1");
        env::set_var("FABRIC_ARTIFACT_ID", "nb-9");
        env::set_var("FABRIC_TENANT_ID", "tenant");
        env::set_var("FABRIC_CLIENT_ID", "client");
        env::set_var("FABRIC_CLIENT_SECRET", "secret");
        let config = AppConfig::load().expect("config loads");

        let target = config.notebook.target().expect("target configured");
        assert_eq!(
            target.trigger_url(),
            "https://fabric.example/v1/workspaces/ws-1/items/nb-9/jobs/instances?jobType=RunNotebook"
        );
        let credentials = config.notebook.credentials().expect("credentials configured");
        assert_eq!(
            credentials.token_url(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
        assert!(!format!("{:?}", config.notebook).contains("secret\""));
        reset_env();
    }

    #[test]
    fn rejects_invalid_flags_and_formats() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("FEATURE_SCHEMA_CACHE", "maybe");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag {
                key: "FEATURE_SCHEMA_CACHE",
                ..
            })
        ));
        reset_env();
        env::set_var("APP_LOG_FORMAT", "xml");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidLogFormat(_))
        ));
        reset_env();
    }

    #[test]
    fn database_requires_path() {
        let config = DatabaseConfig {
            path: None,
            cache_schema: false,
        };
        assert!(matches!(
            config.require(),
            Err(ConfigError::Missing("FEATURE_DB_PATH"))
        ));
    }
}
