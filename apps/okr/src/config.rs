//! # Configuration
//!
//! `okr.toml` carries logging defaults and the static RBAC table:
//!
//! ```toml
//! [logging]
//! format = "json"
//! filter = "okr=debug,okr_core=info"
//!
//! [rbac]
//! elevated = ["lead"]
//!
//! [[rbac.grants]]
//! user = "alice"
//! action = "okr:edit_locked"
//! tenant = "org-a"
//! ```
//!
//! A missing file yields the defaults. Environment variables override the
//! logging section (`OKR_LOG`, `OKR_LOG_FORMAT`).

use crate::error::AppError;
use okr_core::{Grant, StaticRbac};
use serde::Deserialize;
use std::path::Path;

/// Default filter when neither `OKR_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "okr=info,okr_core=info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Parse an `OKR_LOG_FORMAT` value; anything but "json" is text.
    pub fn from_env_value(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Users holding `okr:edit_locked` everywhere.
    pub elevated: Vec<String>,
    pub grants: Vec<Grant>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub rbac: RbacConfig,
}

impl AppConfig {
    /// Read `path`, or return defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
        Self::parse(&text).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Effective log filter: `OKR_LOG` wins over the config file.
    pub fn log_filter(&self, env: Option<String>) -> String {
        env.or_else(|| self.logging.filter.clone())
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
    }

    /// Effective log format: `OKR_LOG_FORMAT` wins over the config file.
    pub fn log_format(&self, env: Option<String>) -> LogFormat {
        env.map(|v| LogFormat::from_env_value(&v))
            .unwrap_or(self.logging.format)
    }

    /// Build the RBAC oracle the service consults on lock escalation.
    pub fn rbac(&self) -> StaticRbac {
        let rbac = self
            .rbac
            .elevated
            .iter()
            .fold(StaticRbac::new(), |rbac, user| rbac.with_elevated(user.as_str()));
        self.rbac
            .grants
            .iter()
            .cloned()
            .fold(rbac, StaticRbac::with_grant)
    }
}
