use std::io::Error as IoError;

use thiserror::Error;
use uptime_engine::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Address parsing error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Engine startup failed: {0:#}")]
    Engine(#[from] anyhow::Error),
}
