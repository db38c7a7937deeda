//! Configuration for the tech tree graph

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const ENV_DB_PATH: &str = "TECHTREE_DB_PATH";
pub const ENV_NAMESPACE: &str = "TECHTREE_NAMESPACE";
pub const ENV_DATABASE: &str = "TECHTREE_DATABASE";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "TECHTREE_RETRY_MAX_ATTEMPTS";
pub const ENV_CALL_TIMEOUT_MS: &str = "TECHTREE_CALL_TIMEOUT_MS";
pub const ENV_MIGRATION_CONCURRENCY: &str = "TECHTREE_MIGRATION_CONCURRENCY";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Environment variable {var} has unparseable value '{value}'")]
    Env { var: String, value: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// On-disk location of the embedded SurrealDB database
    pub database_path: PathBuf,

    pub namespace: String,

    pub database: String,

    pub retry: RetryConfig,

    pub migration: MigrationConfig,
}

/// Per-call timeout and retry bounds for store access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first (1 = no retry)
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles per retry
    pub initial_backoff_ms: u64,

    pub max_backoff_ms: u64,

    /// Deadline for a single store call
    pub call_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Records processed concurrently within a phase
    pub concurrency: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            namespace: crate::db::DEFAULT_NAMESPACE.to_string(),
            database: crate::db::DEFAULT_DATABASE.to_string(),
            retry: RetryConfig::default(),
            migration: MigrationConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 50,
            max_backoff_ms: 2_000,
            call_timeout_ms: 10_000,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { concurrency: 8 }
    }
}

/// `~/.techtree/database/techtree.db`, or a relative path when there is no home
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".techtree").join("database").join("techtree.db"))
        .unwrap_or_else(|| PathBuf::from("./techtree.db"))
}

impl GraphConfig {
    /// Defaults overridden by `TECHTREE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DB_PATH) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            config.namespace = namespace;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            config.database = database;
        }
        if let Some(value) = lookup(ENV_RETRY_MAX_ATTEMPTS) {
            config.retry.max_attempts = parse_env(ENV_RETRY_MAX_ATTEMPTS, &value)?;
        }
        if let Some(value) = lookup(ENV_CALL_TIMEOUT_MS) {
            config.retry.call_timeout_ms = parse_env(ENV_CALL_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_MIGRATION_CONCURRENCY) {
            config.migration.concurrency = parse_env(ENV_MIGRATION_CONCURRENCY, &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.trim().is_empty() {
            return Err(ConfigError::invalid("namespace", "must not be empty"));
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::invalid("database", "must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "retry.max_attempts",
                "must be at least 1",
            ));
        }
        if self.retry.call_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "retry.call_timeout_ms",
                "must be greater than 0",
            ));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(ConfigError::invalid(
                "retry.initial_backoff_ms",
                "must not exceed retry.max_backoff_ms",
            ));
        }
        if self.migration.concurrency == 0 {
            return Err(ConfigError::invalid(
                "migration.concurrency",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn parse_env<T: FromStr>(var: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var: var.to_string(),
        value: value.to_string(),
    })
}
