//! Process configuration, read once at startup

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";
const DEFAULT_EXPORT_DIR: &str = "./exports";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Errors raised while reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Sandbox configuration
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Base address of the generation backend
    pub api_base: String,
    /// Bearer token sent with every request, if any
    pub api_token: Option<String>,
    /// Where export artifacts are written
    pub export_dir: PathBuf,
    pub course_id: String,
    pub assignment_id: String,
    /// Assignment file whose metadata is attached to the export
    pub attachment_path: Option<PathBuf>,
    /// Pause after each streamed text delta. Zero means a plain yield.
    pub delta_pause: Duration,
    pub request_timeout: Duration,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_token: None,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            course_id: "sandbox-course".to_string(),
            assignment_id: "sandbox-assignment".to_string(),
            attachment_path: None,
            delta_pause: Duration::ZERO,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl SandboxConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base = match lookup("SANDBOX_API_BASE") {
            Some(base) if base.trim().is_empty() => {
                return Err(ConfigError::Empty {
                    var: "SANDBOX_API_BASE",
                })
            }
            Some(base) => base.trim().trim_end_matches('/').to_string(),
            None => defaults.api_base,
        };

        let delta_pause = match lookup("SANDBOX_DELTA_PAUSE_MS") {
            Some(raw) => Duration::from_millis(parse_number("SANDBOX_DELTA_PAUSE_MS", &raw)?),
            None => defaults.delta_pause,
        };

        let request_timeout = match lookup("SANDBOX_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_number("SANDBOX_REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            api_base,
            api_token: lookup("SANDBOX_API_TOKEN").filter(|t| !t.trim().is_empty()),
            export_dir: lookup("SANDBOX_EXPORT_DIR").map_or(defaults.export_dir, PathBuf::from),
            course_id: lookup("SANDBOX_COURSE_ID").unwrap_or(defaults.course_id),
            assignment_id: lookup("SANDBOX_ASSIGNMENT_ID").unwrap_or(defaults.assignment_id),
            attachment_path: lookup("SANDBOX_ATTACHMENT_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            delta_pause,
            request_timeout,
        })
    }

    /// Absolute URL for an API path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: raw.to_string(),
    })
}
