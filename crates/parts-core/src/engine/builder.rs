//! Builder for constructing a ClientEngine with pluggable implementations.
//!
//! The builder uses the factory pattern to wire concrete backend,
//! storage, and realtime implementations by the names they carry in the
//! configuration. The binary registers the factories it ships; tests
//! register closures over mocks.

use super::{ClientEngine, EngineError};
use crate::cache::OrderCache;
use crate::event_bus::EventBus;
use crate::handlers::{OrdersHandler, QuotesHandler, StatusHandler, WalletHandler};
use crate::session::ViewSession;
use parts_api::{ApiService, BackendInterface};
use parts_config::Config;
use parts_realtime::{RealtimeInterface, RealtimeService};
use parts_storage::{StorageInterface, StorageService};
use parts_types::Provider;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// Type alias for backend factory functions.
type BackendFactory = Box<
	dyn Fn(&toml::Value) -> Result<Box<dyn BackendInterface>, parts_api::BackendError> + Send,
>;
/// Type alias for storage factory functions.
type StorageFactory = Box<
	dyn Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, parts_storage::StorageError> + Send,
>;
/// Type alias for realtime source factory functions.
type RealtimeFactory = Box<
	dyn Fn(&toml::Value) -> Result<Box<dyn RealtimeInterface>, parts_realtime::RealtimeError>
		+ Send,
>;

/// Builder for the client engine.
pub struct ClientBuilder {
	config: Config,
	backend_factories: HashMap<String, BackendFactory>,
	storage_factories: HashMap<String, StorageFactory>,
	realtime_factories: HashMap<String, RealtimeFactory>,
}

impl ClientBuilder {
	/// Creates a new ClientBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self {
			config,
			backend_factories: HashMap::new(),
			storage_factories: HashMap::new(),
			realtime_factories: HashMap::new(),
		}
	}

	/// Registers every implementation shipped in the workspace crates.
	pub fn with_default_factories(mut self) -> Self {
		for (name, factory) in parts_api::get_all_implementations() {
			self = self.with_backend_factory(name, factory);
		}
		for (name, factory) in parts_storage::get_all_implementations() {
			self = self.with_storage_factory(name, factory);
		}
		for (name, factory) in parts_realtime::get_all_implementations() {
			self = self.with_realtime_factory(name, factory);
		}
		self
	}

	/// Adds a factory function for creating backend implementations.
	///
	/// The name parameter should match the implementation name in the
	/// configuration.
	pub fn with_backend_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn BackendInterface>, parts_api::BackendError>
			+ Send
			+ 'static,
	{
		self.backend_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Adds a factory function for creating storage backends.
	pub fn with_storage_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, parts_storage::StorageError>
			+ Send
			+ 'static,
	{
		self.storage_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Adds a factory function for creating realtime sources.
	pub fn with_realtime_factory<F>(mut self, name: &str, factory: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<Box<dyn RealtimeInterface>, parts_realtime::RealtimeError>
			+ Send
			+ 'static,
	{
		self.realtime_factories
			.insert(name.to_string(), Box::new(factory));
		self
	}

	/// Builds the ClientEngine using the configured factories.
	///
	/// This method:
	/// 1. Creates the backend, storage, and realtime services
	/// 2. Validates that the configured implementations have factories
	/// 3. Wires the cache, session, event bus, and handlers
	pub fn build(self) -> Result<ClientEngine, EngineError> {
		// Create the backend
		let api_primary = &self.config.api.primary;
		let backend_factory = self.backend_factories.get(api_primary).ok_or_else(|| {
			EngineError::Config(format!("Backend factory '{}' not provided", api_primary))
		})?;
		let backend_config = self
			.config
			.api
			.implementations
			.get(api_primary)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"Backend implementation '{}' not configured",
					api_primary
				))
			})?;
		let backend = backend_factory(backend_config).map_err(|e| {
			tracing::error!(
				component = "api",
				implementation = %api_primary,
				error = %e,
				"Failed to create backend"
			);
			EngineError::Config(format!("Failed to create backend '{}': {}", api_primary, e))
		})?;
		let api = Arc::new(ApiService::new(backend));
		tracing::info!(component = "api", implementation = %api_primary, "Loaded");

		// Create the storage backend
		let storage_primary = &self.config.storage.primary;
		let storage_factory = self.storage_factories.get(storage_primary).ok_or_else(|| {
			EngineError::Config(format!(
				"Storage factory '{}' not provided",
				storage_primary
			))
		})?;
		let storage_config = self
			.config
			.storage
			.implementations
			.get(storage_primary)
			.ok_or_else(|| {
				EngineError::Config(format!(
					"Storage implementation '{}' not configured",
					storage_primary
				))
			})?;
		let storage_backend = storage_factory(storage_config).map_err(|e| {
			tracing::error!(
				component = "storage",
				implementation = %storage_primary,
				error = %e,
				"Failed to create storage backend"
			);
			EngineError::Config(format!(
				"Failed to create storage backend '{}': {}",
				storage_primary, e
			))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));
		tracing::info!(component = "storage", implementation = %storage_primary, "Loaded");

		// Create realtime sources
		let mut sources = Vec::new();
		for (name, source_config) in &self.config.realtime.implementations {
			match self.realtime_factories.get(name) {
				Some(factory) => match factory(source_config) {
					Ok(source) => {
						sources.push(source);
						tracing::info!(component = "realtime", implementation = %name, "Loaded");
					}
					Err(e) => {
						tracing::error!(
							component = "realtime",
							implementation = %name,
							error = %e,
							"Failed to create realtime source, skipping"
						);
					}
				},
				None => {
					tracing::error!(
						component = "realtime",
						implementation = %name,
						"No factory registered for realtime source, skipping"
					);
				}
			}
		}
		if sources.is_empty() {
			tracing::warn!(
				"No realtime sources available - client will not receive push notifications"
			);
		}
		let realtime = Arc::new(RealtimeService::new(sources));

		// Wire the cache, session, and handlers
		let cache = Arc::new(OrderCache::new());
		let session = Arc::new(ViewSession::new());
		let event_bus = EventBus::new(1000);

		let client = &self.config.client;
		let provider = Provider {
			id: client.provider_id.clone(),
			name: None,
			wallet_balance: Decimal::ZERO,
			assigned_categories: client.assigned_categories.iter().cloned().collect(),
		};

		let orders = Arc::new(OrdersHandler::new(
			api.clone(),
			cache.clone(),
			session.clone(),
			storage.clone(),
			provider,
			event_bus.clone(),
		));
		let quotes = Arc::new(QuotesHandler::new(
			api.clone(),
			cache.clone(),
			storage.clone(),
			client.provider_id.clone(),
			event_bus.clone(),
		));
		let status = Arc::new(StatusHandler::new(
			api.clone(),
			cache.clone(),
			orders.clone(),
			client.role,
			event_bus.clone(),
		));
		let wallet = Arc::new(WalletHandler::new(
			api.clone(),
			storage.clone(),
			client.provider_id.clone(),
			event_bus.clone(),
		));

		Ok(ClientEngine {
			config: self.config,
			api,
			storage,
			realtime,
			cache,
			session,
			event_bus,
			orders,
			quotes,
			status,
			wallet,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> Config {
		r#"
[client]
provider_id = "p-1"
role = "provider"
assigned_categories = ["engine"]

[api]
primary = "mock"
[api.implementations.mock]
provider_id = "p-1"

[realtime]
debounce_ms = 1000
[realtime.implementations.channel]

[storage]
primary = "memory"
cleanup_interval_seconds = 3600
[storage.implementations.memory]
"#
		.parse()
		.unwrap()
	}

	#[tokio::test]
	async fn test_build_with_default_factories() {
		let engine = ClientBuilder::new(config())
			.with_default_factories()
			.build()
			.unwrap();
		assert_eq!(engine.config().client.provider_id, "p-1");
		assert!(engine.wallet().snapshot().is_none());
	}

	#[tokio::test]
	async fn test_missing_backend_factory_is_a_config_error() {
		let result = ClientBuilder::new(config()).build();
		assert!(matches!(result, Err(EngineError::Config(_))));
	}
}
