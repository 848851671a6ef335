/*
 * Responsibility
 * - load the dotenv file named on the command line, then read settings from the environment
 * - validate settings (missing or malformed values fail startup)
 */
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::services::supervisor::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
    File { path: PathBuf, source: dotenvy::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
            ConfigError::File { path, source } => {
                write!(f, "cannot load config file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::File { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_url: String,
    pub max_connections: u32,
    // Deadline for every store call on a request path.
    pub max_query_time: Duration,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub storage: StorageConfig,
    pub jwt_secret: String,
    pub access_token_ttl_seconds: u64,
    pub cluster_secret: String,
    pub host_online_ttl: Duration,
    pub request_timeout: Duration,
    pub version_check_url: Option<Url>,
    pub log: LogConfig,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Secrets stay out of logs.
        f.debug_struct("ServerConfig")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("max_query_time", &self.storage.max_query_time)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("host_online_ttl", &self.host_online_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct WorkerConfig {
    pub listen_addr: SocketAddr,
    pub app_env: AppEnv,
    pub server_url: Url,
    pub cluster_secret: String,
    pub pool_size: usize,
    pub retry: RetryPolicy,
    // None disables periodic re-registration.
    pub heartbeat_interval: Option<Duration>,
    pub log: LogConfig,
}

impl fmt::Debug for WorkerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerConfig")
            .field("listen_addr", &self.listen_addr)
            .field("server_url", &self.server_url.as_str())
            .field("pool_size", &self.pool_size)
            .field("retry", &self.retry)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .finish_non_exhaustive()
    }
}

/// Loads `path` as a dotenv file. Variables already present in the
/// environment win over the file.
pub fn load_file(path: &Path) -> Result<(), ConfigError> {
    dotenvy::from_path(path).map_err(|source| ConfigError::File {
        path: path.to_path_buf(),
        source,
    })
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn required<F>(get: &F, key: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn parsed_or<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

fn log_config<F>(get: &F) -> Result<LogConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let filter = get("RUST_LOG").unwrap_or_else(|| "info,tower_http=info".to_string());
    let format = match get("LOG_FORMAT")
        .unwrap_or_else(|| "text".to_string())
        .to_ascii_lowercase()
        .as_str()
    {
        "text" => LogFormat::Text,
        "json" => LogFormat::Json,
        _ => return Err(ConfigError::Invalid("LOG_FORMAT")),
    };

    Ok(LogConfig { filter, format })
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_file(path)?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port: u16 = parsed_or(&get, "SERVER_PORT", 8080)?;
        let addr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("SERVER_PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let storage = StorageConfig {
            database_url: required(&get, "DATABASE_URL")?,
            max_connections: parsed_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            max_query_time: Duration::from_millis(parsed_or(&get, "DB_MAX_QUERY_TIME_MS", 3000)?),
        };
        if storage.max_query_time.is_zero() {
            return Err(ConfigError::Invalid("DB_MAX_QUERY_TIME_MS"));
        }

        let jwt_secret = required(&get, "JWT_SECRET")?;
        if jwt_secret.len() < 16 {
            return Err(ConfigError::Invalid("JWT_SECRET"));
        }

        let access_token_ttl_seconds = parsed_or(&get, "ACCESS_TOKEN_TTL_SECONDS", 86_400)?; // 1 day
        let cluster_secret = required(&get, "CLUSTER_SECRET")?;
        let host_online_ttl = Duration::from_secs(parsed_or(&get, "HOST_ONLINE_TTL_SECONDS", 90)?);
        let request_timeout = Duration::from_secs(parsed_or(&get, "REQUEST_TIMEOUT_SECONDS", 30)?);

        let version_check_url = get("VERSION_CHECK_URL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| Url::parse(v.trim()).map_err(|_| ConfigError::Invalid("VERSION_CHECK_URL")))
            .transpose()?;

        Ok(ServerConfig {
            addr,
            app_env,
            storage,
            jwt_secret,
            access_token_ttl_seconds,
            cluster_secret,
            host_online_ttl,
            request_timeout,
            version_check_url,
            log: log_config(&get)?,
        })
    }
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        load_file(path)?;
        Self::from_env()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host: IpAddr = parsed_or(&get, "WORKER_HOST", IpAddr::from([0, 0, 0, 0]))?;
        // 0 asks the OS for an ephemeral port.
        let port: u16 = parsed_or(&get, "WORKER_PORT", 0)?;
        let listen_addr = SocketAddr::new(host, port);

        let app_env = AppEnv::parse(get("APP_ENV"));

        let server_url = Url::parse(&required(&get, "SERVER_URL")?)
            .map_err(|_| ConfigError::Invalid("SERVER_URL"))?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid("SERVER_URL"));
        }

        let cluster_secret = required(&get, "CLUSTER_SECRET")?;

        let pool_size: usize = parsed_or(&get, "WORKER_POOL_SIZE", 8)?;
        if pool_size == 0 {
            return Err(ConfigError::Invalid("WORKER_POOL_SIZE"));
        }

        let max_attempts: u32 = parsed_or(&get, "REGISTRY_MAX_ATTEMPTS", 5)?;
        if max_attempts == 0 {
            return Err(ConfigError::Invalid("REGISTRY_MAX_ATTEMPTS"));
        }
        let retry = RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(parsed_or(&get, "REGISTRY_BACKOFF_BASE_MS", 500)?),
            max_delay: Duration::from_millis(parsed_or(&get, "REGISTRY_BACKOFF_MAX_MS", 30_000)?),
        };

        let heartbeat_secs: u64 = parsed_or(&get, "HEARTBEAT_INTERVAL_SECONDS", 30)?;
        let heartbeat_interval = (heartbeat_secs > 0).then(|| Duration::from_secs(heartbeat_secs));

        Ok(WorkerConfig {
            listen_addr,
            app_env,
            server_url,
            cluster_secret,
            pool_size,
            retry,
            heartbeat_interval,
            log: log_config(&get)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const SERVER_MIN: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/taskgate"),
        ("JWT_SECRET", "0123456789abcdef0123"),
        ("CLUSTER_SECRET", "cluster"),
    ];

    #[test]
    fn server_defaults_apply() {
        let cfg = ServerConfig::from_lookup(lookup(SERVER_MIN)).unwrap();

        assert_eq!(cfg.addr.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.app_env, AppEnv::Development);
        assert_eq!(cfg.storage.max_query_time, Duration::from_millis(3000));
        assert_eq!(cfg.storage.max_connections, 10);
        assert_eq!(cfg.access_token_ttl_seconds, 86_400);
        assert_eq!(cfg.host_online_ttl, Duration::from_secs(90));
        assert!(cfg.version_check_url.is_none());
        assert_eq!(cfg.log.format, LogFormat::Text);
    }

    #[test]
    fn server_requires_database_url() {
        let err = ServerConfig::from_lookup(lookup(&[("JWT_SECRET", "0123456789abcdef")]))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn server_rejects_short_jwt_secret() {
        let mut pairs = SERVER_MIN.to_vec();
        pairs[1] = ("JWT_SECRET", "short");
        let err = ServerConfig::from_lookup(lookup(&pairs)).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid("JWT_SECRET")));
    }

    #[test]
    fn server_rejects_malformed_number() {
        let mut pairs = SERVER_MIN.to_vec();
        pairs.push(("DB_MAX_QUERY_TIME_MS", "soon"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).err().unwrap();
        assert_eq!(err.to_string(), "invalid configuration: DB_MAX_QUERY_TIME_MS");
    }

    #[test]
    fn server_debug_hides_secrets() {
        let cfg = ServerConfig::from_lookup(lookup(SERVER_MIN)).unwrap();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("0123456789abcdef0123"));
        assert!(!printed.contains("cluster_secret"));
    }

    #[test]
    fn worker_defaults_to_ephemeral_port() {
        let cfg = WorkerConfig::from_lookup(lookup(&[
            ("SERVER_URL", "http://127.0.0.1:8080"),
            ("CLUSTER_SECRET", "cluster"),
        ]))
        .unwrap();

        assert_eq!(cfg.listen_addr.port(), 0);
        assert_eq!(cfg.pool_size, 8);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.heartbeat_interval, Some(Duration::from_secs(30)));
    }

    #[test]
    fn worker_heartbeat_zero_disables() {
        let cfg = WorkerConfig::from_lookup(lookup(&[
            ("SERVER_URL", "http://127.0.0.1:8080"),
            ("CLUSTER_SECRET", "cluster"),
            ("HEARTBEAT_INTERVAL_SECONDS", "0"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();

        assert!(cfg.heartbeat_interval.is_none());
        assert_eq!(cfg.log.format, LogFormat::Json);
    }

    #[test]
    fn worker_rejects_non_http_server_url() {
        let err = WorkerConfig::from_lookup(lookup(&[
            ("SERVER_URL", "ftp://example.com"),
            ("CLUSTER_SECRET", "cluster"),
        ]))
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::Invalid("SERVER_URL")));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_file(Path::new("/nonexistent/taskgate.env")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/taskgate.env"));
    }
}
