// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names, defaults, and the configuration loaded from
//! them at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `AUTH_URL` | Base URL of the hosted auth backend | Unset: no HTTP provider |
//! | `AUTH_API_KEY` | Public API key sent with every request | Required with `AUTH_URL` |
//! | `AUTH_PROFILE_TABLE` | Table holding profile rows | `profiles` |
//! | `AUTH_HTTP_TIMEOUT_SECS` | HTTP client timeout | `10` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,session_gate=debug` |
//!
//! ## Development Tooling
//!
//! Dev impersonation is decided when the crate is compiled, never at
//! runtime. The fixture table is only compiled in when `debug_assertions`
//! are on or the `dev` cargo feature is enabled. Configuration can switch
//! dev tooling off in such a build but never on in any other.

use std::time::Duration;

use url::Url;

/// Base URL of the hosted auth backend.
pub const AUTH_URL_ENV: &str = "AUTH_URL";

/// Public API key for the hosted auth backend.
pub const AUTH_API_KEY_ENV: &str = "AUTH_API_KEY";

/// Table holding profile rows.
pub const AUTH_PROFILE_TABLE_ENV: &str = "AUTH_PROFILE_TABLE";

/// HTTP client timeout in seconds.
pub const AUTH_HTTP_TIMEOUT_SECS_ENV: &str = "AUTH_HTTP_TIMEOUT_SECS";

/// Logging format selector.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default profile table name.
pub const DEFAULT_PROFILE_TABLE: &str = "profiles";

/// Default HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,session_gate=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Connection settings for the hosted auth backend.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Always ends with `/` so relative endpoints join below it
    pub base_url: Url,
    pub api_key: String,
    pub profile_table: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// `None` when `AUTH_URL` is unset
    pub provider: Option<ProviderConfig>,
    pub log_format: LogFormat,
    dev_tools: bool,
}

/// Whether the running binary was built with development tooling.
pub const fn dev_build() -> bool {
    cfg!(any(debug_assertions, feature = "dev"))
}

impl AuthConfig {
    /// Whether dev impersonation is enabled. Always false outside
    /// development builds.
    pub fn dev_tools(&self) -> bool {
        self.dev_tools && dev_build()
    }

    /// Turn dev impersonation off, e.g. for a staging run of a debug build.
    pub fn without_dev_tools(mut self) -> Self {
        self.dev_tools = false;
        self
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of
    /// a variable or `None` when unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let log_format = match read(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        let provider = match read(AUTH_URL_ENV) {
            None => None,
            Some(raw_url) => {
                let mut base_url = Url::parse(&raw_url).map_err(|e| ConfigError::Invalid {
                    name: AUTH_URL_ENV,
                    reason: e.to_string(),
                })?;
                if !base_url.path().ends_with('/') {
                    let path = format!("{}/", base_url.path());
                    base_url.set_path(&path);
                }

                let api_key = read(AUTH_API_KEY_ENV).ok_or(ConfigError::Missing(AUTH_API_KEY_ENV))?;
                let profile_table = read(AUTH_PROFILE_TABLE_ENV)
                    .unwrap_or_else(|| DEFAULT_PROFILE_TABLE.to_string());
                let timeout = match read(AUTH_HTTP_TIMEOUT_SECS_ENV) {
                    None => DEFAULT_HTTP_TIMEOUT,
                    Some(raw) => raw
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|e| ConfigError::Invalid {
                            name: AUTH_HTTP_TIMEOUT_SECS_ENV,
                            reason: e.to_string(),
                        })?,
                };

                Some(ProviderConfig {
                    base_url,
                    api_key,
                    profile_table,
                    timeout,
                })
            }
        };

        Ok(Self {
            provider,
            log_format,
            dev_tools: dev_build(),
        })
    }
}
