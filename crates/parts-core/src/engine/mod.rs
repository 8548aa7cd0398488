//! Client engine orchestrating the order lifecycle.
//!
//! The engine owns the services (API, storage, realtime), the order
//! cache, and the handlers, and runs the main event loop: notifications
//! come in from the realtime service, are classified and coalesced by the
//! reconciler, and come out the other side as authoritative refetches.
//! Everything a view needs is reachable through the handler accessors and
//! the event bus.

use crate::cache::OrderCache;
use crate::event_bus::EventBus;
use crate::handlers::{OrdersHandler, QuotesHandler, StatusHandler, WalletHandler};
use crate::reconcile::Reconciler;
use crate::session::ViewSession;
use parts_api::ApiService;
use parts_config::Config;
use parts_realtime::{Channel, RealtimeService};
use parts_storage::StorageService;
use parts_types::{ClientEvent, RefetchKind, Role, Toast};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod builder;
pub mod lifecycle;

pub use builder::ClientBuilder;

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	/// Error related to configuration issues.
	#[error("Configuration error: {0}")]
	Config(String),
	/// Error from one of the underlying services.
	#[error("Service error: {0}")]
	Service(String),
}

/// Main client engine for the order lifecycle.
pub struct ClientEngine {
	/// Client configuration.
	config: Config,
	/// Backend API boundary.
	api: Arc<ApiService>,
	/// Local key/value storage service.
	storage: Arc<StorageService>,
	/// Real-time notification sources.
	realtime: Arc<RealtimeService>,
	/// In-memory order cache.
	cache: Arc<OrderCache>,
	/// Session epoch guarding stale fetch application.
	session: Arc<ViewSession>,
	/// Event bus for view-layer consumers.
	event_bus: EventBus,
	/// Projection refresh and visibility handler.
	orders: Arc<OrdersHandler>,
	/// Quote submission handler.
	quotes: Arc<QuotesHandler>,
	/// Status transition handler.
	status: Arc<StatusHandler>,
	/// Wallet handler.
	wallet: Arc<WalletHandler>,
}

impl ClientEngine {
	/// Main event loop for the client engine.
	///
	/// This method:
	/// 1. Primes the cache with an initial fetch of every projection
	/// 2. Starts the realtime listeners on the account's private channel
	/// 3. Routes notifications through the debounced reconciler
	/// 4. Handles graceful shutdown on Ctrl+C
	pub async fn run(&self) -> Result<(), EngineError> {
		self.initialize().await?;

		let (notification_tx, mut notification_rx) = mpsc::unbounded_channel();
		let channel = self.private_channel();
		self.realtime
			.start_all(&channel, notification_tx)
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		tracing::info!(channel = %channel, "Listening for notifications");

		let window = Duration::from_millis(self.config.realtime.debounce_ms);
		let (reconciler, mut triggers) = Reconciler::new(window, self.event_bus.clone());

		let mut cleanup = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		cleanup.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				// Classify incoming notifications
				Some(event) = notification_rx.recv() => {
					reconciler.observe(&event);
				}

				// Execute coalesced refetches
				Some(kind) = triggers.recv() => {
					self.handle_refetch(kind).await;
				}

				// Periodic storage expiry sweep
				_ = cleanup.tick() => {
					match self.storage.cleanup_expired().await {
						Ok(0) => {}
						Ok(removed) => tracing::debug!(removed, "Cleaned up expired storage entries"),
						Err(e) => tracing::warn!(error = %e, "Storage cleanup failed"),
					}
				}

				// Shutdown signal
				_ = tokio::signal::ctrl_c() => {
					break;
				}
			}
		}

		self.shutdown().await
	}

	/// Executes one due refetch.
	///
	/// Failures surface as toasts and keep the last-known-good cache; the
	/// next notification or user action retries naturally.
	async fn handle_refetch(&self, kind: RefetchKind) {
		tracing::debug!(kind = %kind, "Running coalesced refetch");
		let result = match kind {
			RefetchKind::Wallet => self.wallet.refresh().await.map(|_| ()),
			other => match other.projection() {
				Some(projection) => self.orders.refresh(projection).await.map(|_| ()),
				None => Ok(()),
			},
		};

		if let Err(e) = result {
			tracing::warn!(kind = %kind, error = %e, "Refetch failed, keeping cached state");
			self.event_bus
				.publish(ClientEvent::Toast(Toast::error(format!(
					"Could not refresh {}: {}",
					kind, e
				))))
				.ok();
		}
	}

	/// Derives the private notification channel for the signed-in account.
	fn private_channel(&self) -> Channel {
		match self.config.client.role {
			Role::Provider => Channel::provider(&self.config.client.provider_id),
			Role::Admin => Channel::user(&self.config.client.provider_id),
		}
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the order cache.
	pub fn cache(&self) -> &Arc<OrderCache> {
		&self.cache
	}

	/// Returns a reference to the session epoch source.
	pub fn session(&self) -> &Arc<ViewSession> {
		&self.session
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns a reference to the API service.
	pub fn api(&self) -> &Arc<ApiService> {
		&self.api
	}

	/// Returns a reference to the orders handler.
	pub fn orders(&self) -> &Arc<OrdersHandler> {
		&self.orders
	}

	/// Returns a reference to the quotes handler.
	pub fn quotes(&self) -> &Arc<QuotesHandler> {
		&self.quotes
	}

	/// Returns a reference to the status handler.
	pub fn status(&self) -> &Arc<StatusHandler> {
		&self.status
	}

	/// Returns a reference to the wallet handler.
	pub fn wallet(&self) -> &Arc<WalletHandler> {
		&self.wallet
	}
}
