//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

pub mod options;
pub mod message;
pub mod frame;
pub mod lease;
pub mod prefix;
pub mod alert;
pub mod engine;
pub mod capture;
pub mod view;
pub mod config;
pub mod monitor;

use thiserror::Error;

use common::WireError;

#[derive(Error, Debug)]
pub enum DhcpError {
    #[error("Insuffcient buffer size {0}")]
    InsufficientBufferSize(String),
    #[error("Decode error {0}")]
    DecodeError(String),
    #[error("Invalid prefix {0}")]
    InvalidPrefix(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Syslog error: {0}")]
    SyslogError(String),
    #[error("Signal error: {0}")]
    SignalError(#[from] nix::errno::Errno),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<WireError> for DhcpError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::InsufficientBufferSize(s) => DhcpError::InsufficientBufferSize(s),
            other => DhcpError::DecodeError(other.to_string()),
        }
    }
}
