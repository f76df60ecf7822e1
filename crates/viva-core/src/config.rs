use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub audio: AudioConfig,

    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AudioConfig {
    #[serde(default = "default_device_name")]
    pub input_device: String,

    #[serde(default = "default_device_name")]
    pub output_device: String,

    /// Microphone rate; the remote endpoint expects 16 kHz mono PCM.
    #[serde(default = "default_input_rate")]
    pub input_sample_rate: u32,

    /// Response audio rate; the endpoint streams 24 kHz mono PCM.
    #[serde(default = "default_output_rate")]
    pub output_sample_rate: u32,

    /// Capture buffer in frames. Smaller lowers latency at higher per-buffer
    /// overhead; 2048 ≈ 128 ms at 16 kHz.
    #[serde(default = "default_capture_buffer")]
    pub capture_buffer_size: u32,

    /// Inbound buffers are metered over at most this many leading samples.
    #[serde(default = "default_meter_window")]
    pub meter_window: usize,

    /// Gain applied to the inbound level before it is surfaced. Synthesized
    /// speech meters quieter than microphone input; this is visualization
    /// tuning, not a correctness constant.
    #[serde(default = "default_response_gain")]
    pub response_gain: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: default_device_name(),
            output_device: default_device_name(),
            input_sample_rate: default_input_rate(),
            output_sample_rate: default_output_rate(),
            capture_buffer_size: default_capture_buffer(),
            meter_window: default_meter_window(),
            response_gain: default_response_gain(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Websocket endpoint of the speech service.
    pub endpoint: String,

    pub api_key: String,

    pub model: String,

    #[serde(default = "default_voice")]
    pub voice: String,

    /// System persona text sent at session setup.
    #[serde(default)]
    pub persona: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device_name() -> String {
    "default".to_string()
}

fn default_input_rate() -> u32 {
    16000
}

fn default_output_rate() -> u32 {
    24000
}

fn default_capture_buffer() -> u32 {
    2048
}

fn default_meter_window() -> usize {
    1000
}

fn default_response_gain() -> f32 {
    5.0
}

fn default_voice() -> String {
    "Fenrir".to_string()
}

/// Interpolate `${VAR}` patterns with environment variable values.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(val) => {
                result = result.replace(&cap[0], &val);
            }
            Err(_) => {
                errors.push(var_name.to_string());
            }
        }
    }

    if let Some(first_missing) = errors.into_iter().next() {
        return Err(ConfigError::EnvVarNotFound(first_missing));
    }

    Ok(result)
}

impl AppConfig {
    /// Load configuration from a TOML file, with environment variable interpolation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let interpolated = interpolate_env_vars(&content)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }

    /// Parse configuration from a TOML string (for testing).
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let interpolated = interpolate_env_vars(s)?;
        let config: AppConfig = toml::from_str(&interpolated)?;
        Ok(config)
    }
}
