//! Configuration module for the parts-client system.
//!
//! This module provides structures and utilities for managing client
//! configuration. It supports loading configuration from TOML files with
//! environment-variable substitution and validates that all required
//! values are properly set before the engine is built, so a misconfigured
//! client fails at startup rather than mid-session.

use parts_types::Role;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Bounds on the realtime debounce window, in milliseconds.
const DEBOUNCE_MS_MIN: u64 = 100;
const DEBOUNCE_MS_MAX: u64 = 30_000;

/// Main configuration structure for the parts client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity and role of the signed-in account.
	pub client: ClientConfig,
	/// Configuration for the backend API boundary.
	pub api: ApiConfig,
	/// Configuration for the real-time notification listener.
	pub realtime: RealtimeConfig,
	/// Configuration for the local storage service.
	pub storage: StorageConfig,
}

/// Identity and role of the signed-in account.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Identifier of the provider (or user) this client acts for.
	pub provider_id: String,
	/// Account role, gating which lifecycle transitions are offered.
	#[serde(default = "default_role")]
	pub role: Role,
	/// Part categories assigned to the provider, gating open-order
	/// visibility.
	#[serde(default)]
	pub assigned_categories: Vec<String>,
}

fn default_role() -> Role {
	Role::Provider
}

/// Configuration for the backend API boundary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of backend implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the real-time notification listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RealtimeConfig {
	/// Coalescing window for refetch triggers, in milliseconds.
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
	/// Map of notification source names to their configurations. All
	/// configured sources are started and feed one stream.
	pub implementations: HashMap<String, toml::Value>,
}

/// Returns the default debounce window in milliseconds.
fn default_debounce_ms() -> u64 {
	1000
}

/// Configuration for the local storage service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

/// Returns the default cleanup interval in seconds.
fn default_cleanup_interval_seconds() -> u64 {
	3600
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable
/// VAR_NAME. Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let full_match = cap.get(0).map(|m| (m.start(), m.end()));
		let var_name = cap.get(1).map(|m| m.as_str());
		let (Some((start, end)), Some(var_name)) = (full_match, var_name) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name) {
			Ok(v) => v,
			Err(_) => {
				if let Some(default) = default_value {
					default.to_string()
				} else {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name
					)));
				}
			}
		};

		replacements.push((start, end, value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables
	/// before parsing.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		raw.parse()
	}

	/// Validates the configuration to ensure all required fields are
	/// properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		// Validate client config
		if self.client.provider_id.is_empty() {
			return Err(ConfigError::Validation(
				"Client provider_id cannot be empty".into(),
			));
		}
		if self.client.role == Role::Provider && self.client.assigned_categories.is_empty() {
			return Err(ConfigError::Validation(
				"Provider accounts must have at least one assigned category".into(),
			));
		}

		// Validate api config
		if self.api.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one api implementation must be configured".into(),
			));
		}
		if !self.api.implementations.contains_key(&self.api.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary api implementation '{}' not found in implementations",
				self.api.primary
			)));
		}

		// Validate realtime config
		if self.realtime.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one realtime implementation must be configured".into(),
			));
		}
		if self.realtime.debounce_ms < DEBOUNCE_MS_MIN || self.realtime.debounce_ms > DEBOUNCE_MS_MAX
		{
			return Err(ConfigError::Validation(format!(
				"realtime debounce_ms must be between {} and {}",
				DEBOUNCE_MS_MIN, DEBOUNCE_MS_MAX
			)));
		}

		// Validate storage config
		if self.storage.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one storage implementation must be configured".into(),
			));
		}
		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' not found in implementations",
				self.storage.primary
			)));
		}
		if self.storage.cleanup_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds must be greater than 0".into(),
			));
		}
		if self.storage.cleanup_interval_seconds > 86400 {
			return Err(ConfigError::Validation(
				"Storage cleanup_interval_seconds cannot exceed 86400 (24 hours)".into(),
			));
		}

		Ok(())
	}
}

/// Implementation of FromStr trait for Config to enable parsing from
/// string.
///
/// Environment variables are resolved and the configuration is
/// automatically validated after parsing.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
