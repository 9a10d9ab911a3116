//! Service configuration from environment variables.
//!
//! Each service reads its listening port from its own variable and finds its
//! model artifact next to the running executable unless told otherwise:
//!
//! | Service | Port variable | Default port | Artifact |
//! |---|---|---|---|
//! | biometric classifier | `PREDICTOR_PORT` | 4000 | `relapse_predictor.json` |
//! | event classifier | `CLASSIFIER_PORT` | 6002 | `relapse_classifier.json` |
//! | next-relapse regressor | `REGRESSOR_PORT` | 6003 | `relapse_regressor.json` |
//!
//! `RELAPSE_MODEL_DIR` replaces the executable directory for all services;
//! `<PREFIX>_MODEL_PATH` points one service at a specific file.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

const BIND_HOST_ENV: &str = "RELAPSE_BIND_HOST";
const MODEL_DIR_ENV: &str = "RELAPSE_MODEL_DIR";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a port number between 1 and 65535, got '{value}'")]
    InvalidPort { var: &'static str, value: String },

    #[error("{BIND_HOST_ENV} must be an IP address, got '{0}'")]
    InvalidHost(String),

    #[error("Cannot locate the service executable: {0}")]
    ExecutableDir(#[source] std::io::Error),
}

/// Which of the three services is being configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    RelapseClassifier,
    EventClassifier,
    NextRelapse,
}

impl ServiceKind {
    /// Short name used in logs and on `/health`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RelapseClassifier => "relapse-classifier",
            Self::EventClassifier => "event-classifier",
            Self::NextRelapse => "next-relapse-regressor",
        }
    }

    #[must_use]
    pub fn port_env(&self) -> &'static str {
        match self {
            Self::RelapseClassifier => "PREDICTOR_PORT",
            Self::EventClassifier => "CLASSIFIER_PORT",
            Self::NextRelapse => "REGRESSOR_PORT",
        }
    }

    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            Self::RelapseClassifier => 4000,
            Self::EventClassifier => 6002,
            Self::NextRelapse => 6003,
        }
    }

    #[must_use]
    pub fn model_path_env(&self) -> &'static str {
        match self {
            Self::RelapseClassifier => "PREDICTOR_MODEL_PATH",
            Self::EventClassifier => "CLASSIFIER_MODEL_PATH",
            Self::NextRelapse => "REGRESSOR_MODEL_PATH",
        }
    }

    /// Artifact file name written by the matching trainer.
    #[must_use]
    pub fn artifact_file(&self) -> &'static str {
        match self {
            Self::RelapseClassifier => "relapse_predictor.json",
            Self::EventClassifier => "relapse_classifier.json",
            Self::NextRelapse => "relapse_regressor.json",
        }
    }
}

/// Resolved configuration for one service process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub kind: ServiceKind,
    pub host: IpAddr,
    pub port: u16,
    pub model_path: PathBuf,
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns error if a variable is malformed or the executable directory
    /// cannot be determined.
    pub fn from_env(kind: ServiceKind) -> Result<Self, ConfigError> {
        Self::from_lookup(kind, |name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    /// Returns error if a variable is malformed or the executable directory
    /// cannot be determined.
    pub fn from_lookup<F>(kind: ServiceKind, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match lookup(kind.port_env()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or(ConfigError::InvalidPort {
                    var: kind.port_env(),
                    value: raw,
                })?,
            None => kind.default_port(),
        };

        let host = match lookup(BIND_HOST_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidHost(raw))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let model_path = match lookup(kind.model_path_env()) {
            Some(path) => PathBuf::from(path),
            None => {
                let dir = match lookup(MODEL_DIR_ENV) {
                    Some(dir) => PathBuf::from(dir),
                    None => executable_dir()?,
                };
                dir.join(kind.artifact_file())
            }
        };

        Ok(Self {
            kind,
            host,
            port,
            model_path,
        })
    }

    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Directory containing the running binary.
fn executable_dir() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(ConfigError::ExecutableDir)?;
    exe.parent().map(PathBuf::from).ok_or_else(|| {
        ConfigError::ExecutableDir(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{exe:?} has no parent directory"),
        ))
    })
}
