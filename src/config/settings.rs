use std::env;
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppSettings {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub frontend: FrontendConfig,
    pub websocket: WebSocketConfig,
    pub scan_session: ScanSessionConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
    pub log_level: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Where the mobile scanning page lives; used to build the URL shown as a QR code.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FrontendConfig {
    pub base_url: String,
    pub mobile_scan_path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebSocketConfig {
    pub heartbeat_interval_secs: u64,
    pub client_timeout_secs: u64,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_per_sec: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanSessionConfig {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl WebSocketConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn client_timeout(&self) -> Duration {
        Duration::from_secs(self.client_timeout_secs)
    }
}

/// Longest idle lifetime accepted for a scan session (30 days).
pub const MAX_SCAN_SESSION_TTL_SECS: u64 = 30 * 24 * 60 * 60;

impl ScanSessionConfig {
    pub fn ttl(&self) -> AppResult<chrono::Duration> {
        to_time_delta("SCAN_SESSION_TTL_SECS", self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> AppResult<chrono::Duration> {
        to_time_delta("SCAN_SESSION_CLEANUP_INTERVAL_SECS", self.cleanup_interval_secs)
    }
}

fn to_time_delta(name: &str, secs: u64) -> AppResult<chrono::Duration> {
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| AppError::Configuration(format!("{} is out of range", name)))
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: 30,
            client_timeout_secs: 60,
            rate_limit_capacity: 50,
            rate_limit_refill_per_sec: 25,
        }
    }
}

impl FrontendConfig {
    /// Builds `<base_url><mobile_scan_path>?sessionId=<id>`.
    pub fn mobile_scan_url(&self, session_id: &str) -> AppResult<String> {
        let mut url = Url::parse(&self.base_url)?.join(&self.mobile_scan_path)?;
        url.query_pairs_mut().clear().append_pair("sessionId", session_id);
        Ok(url.to_string())
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            mobile_scan_path: "/mobile-scan".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: &str) -> AppResult<T> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse::<T>()
        .map_err(|_| AppError::Configuration(format!("{} must be a valid number", name)))
}

impl AppSettings {
    pub fn from_env() -> AppResult<Self> {
        // App config
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "student-notify-relay".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        // Server config
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3001".to_string())
            .parse::<u16>()
            .map_err(|_| AppError::Configuration("SERVER_PORT must be a valid port number".to_string()))?;

        // CORS origins
        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // Frontend (mobile scan page)
        let frontend_url = env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());
        let mobile_scan_path = env::var("MOBILE_SCAN_PATH")
            .unwrap_or_else(|_| "/mobile-scan".to_string());

        // WebSocket transport
        let heartbeat_interval_secs = parse_var::<u64>("WS_HEARTBEAT_INTERVAL_SECS", "30")?;
        let client_timeout_secs = parse_var::<u64>("WS_CLIENT_TIMEOUT_SECS", "60")?;
        let rate_limit_capacity = parse_var::<u32>("WS_RATE_LIMIT_CAPACITY", "50")?;
        let rate_limit_refill_per_sec = parse_var::<u32>("WS_RATE_LIMIT_REFILL_PER_SEC", "25")?;

        // Scan URL sessions
        let scan_ttl_secs = parse_var::<u64>("SCAN_SESSION_TTL_SECS", "600")?;
        let scan_cleanup_interval_secs = parse_var::<u64>("SCAN_SESSION_CLEANUP_INTERVAL_SECS", "60")?;

        let settings = Self {
            app: AppConfig {
                name: app_name,
                environment,
                log_level,
            },
            server: ServerConfig {
                host: server_host,
                port: server_port,
                cors_origins,
            },
            frontend: FrontendConfig {
                base_url: frontend_url,
                mobile_scan_path,
            },
            websocket: WebSocketConfig {
                heartbeat_interval_secs,
                client_timeout_secs,
                rate_limit_capacity,
                rate_limit_refill_per_sec,
            },
            scan_session: ScanSessionConfig {
                ttl_secs: scan_ttl_secs,
                cleanup_interval_secs: scan_cleanup_interval_secs,
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        Url::parse(&self.frontend.base_url)
            .map_err(|e| AppError::Configuration(format!("FRONTEND_URL is not a valid URL: {}", e)))?;

        if self.websocket.heartbeat_interval_secs == 0 {
            return Err(AppError::Configuration(
                "WS_HEARTBEAT_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.websocket.client_timeout_secs <= self.websocket.heartbeat_interval_secs {
            return Err(AppError::Configuration(
                "WS_CLIENT_TIMEOUT_SECS must exceed WS_HEARTBEAT_INTERVAL_SECS".to_string(),
            ));
        }
        if self.websocket.rate_limit_capacity == 0 {
            return Err(AppError::Configuration(
                "WS_RATE_LIMIT_CAPACITY must be greater than zero".to_string(),
            ));
        }
        if self.scan_session.cleanup_interval_secs == 0 {
            return Err(AppError::Configuration(
                "SCAN_SESSION_CLEANUP_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.scan_session.ttl_secs > MAX_SCAN_SESSION_TTL_SECS {
            return Err(AppError::Configuration(format!(
                "SCAN_SESSION_TTL_SECS must not exceed {}",
                MAX_SCAN_SESSION_TTL_SECS
            )));
        }
        if self.scan_session.cleanup_interval_secs > MAX_SCAN_SESSION_TTL_SECS {
            return Err(AppError::Configuration(format!(
                "SCAN_SESSION_CLEANUP_INTERVAL_SECS must not exceed {}",
                MAX_SCAN_SESSION_TTL_SECS
            )));
        }
        self.scan_session.ttl()?;
        self.scan_session.cleanup_interval()?;

        Ok(())
    }
}
