use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to enumerate devices: {0}")]
    DeviceEnumeration(String),

    #[error("failed to build stream: {0}")]
    StreamBuild(String),
}

/// A single inbound audio payload was malformed. Non-fatal: the caller drops
/// the chunk and keeps processing subsequent messages.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid transport encoding: {0}")]
    Base64(String),

    #[error("payload length {0} is not a multiple of the sample width")]
    OddLength(usize),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to establish session: {0}")]
    Connect(String),

    #[error("connect() is only valid from the idle state (current: {0})")]
    InvalidState(&'static str),

    #[error(transparent)]
    Audio(#[from] AudioError),
}
