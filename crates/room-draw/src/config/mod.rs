use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::draw::roster::RosterFiles;

pub const DEFAULT_NOTIFY_SENDER: &str = "no-reply@roomdraw.local";

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

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub draw: DrawConfig,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
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

        let roster = optional_path("ROOM_DRAW_ROSTER");
        let students_csv = optional_path("ROOM_DRAW_STUDENTS_CSV");
        if students_csv.is_some() && roster.is_none() {
            return Err(ConfigError::StudentsWithoutRoster);
        }

        let notify_sender = env::var("ROOM_DRAW_NOTIFY_SENDER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_NOTIFY_SENDER.to_string());
        if !notify_sender.contains('@') {
            return Err(ConfigError::InvalidSender(notify_sender));
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            draw: DrawConfig {
                roster,
                students_csv,
                notify_sender,
            },
        })
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the roster comes from and who bump notifications are sent as.
#[derive(Debug, Clone)]
pub struct DrawConfig {
    pub roster: Option<PathBuf>,
    pub students_csv: Option<PathBuf>,
    pub notify_sender: String,
}

impl DrawConfig {
    /// File-backed roster source, when one is configured.
    pub fn roster_files(&self) -> Option<RosterFiles> {
        self.roster.as_ref().map(|layout| RosterFiles {
            layout: layout.clone(),
            students_csv: self.students_csv.clone(),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    StudentsWithoutRoster,
    InvalidSender(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::StudentsWithoutRoster => write!(
                f,
                "ROOM_DRAW_STUDENTS_CSV requires ROOM_DRAW_ROSTER for the housing layout"
            ),
            ConfigError::InvalidSender(value) => {
                write!(f, "ROOM_DRAW_NOTIFY_SENDER '{}' is not an email address", value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::StudentsWithoutRoster
            | ConfigError::InvalidSender(_) => None,
        }
    }
}
