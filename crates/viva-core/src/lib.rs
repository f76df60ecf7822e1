pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, AudioConfig, GeneralConfig, SessionConfig};
pub use error::{AudioError, ConfigError, DecodeError, SessionError};
pub use types::{AudioFrame, EncodedChunk, PlayableBuffer, SessionState, Speaker};
