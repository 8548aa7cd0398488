//! Lifecycle management for the client engine.
//!
//! Handles startup priming and shutdown procedures, ensuring listeners
//! are cleanly torn down and no in-flight fetch can land after the
//! session ends.

use super::{ClientEngine, EngineError};
use parts_types::OrderProjection;

impl ClientEngine {
	/// Primes the cache before the event loop starts.
	///
	/// Each projection and the wallet get one initial fetch. Individual
	/// failures are logged and tolerated: the client starts with whatever
	/// could be loaded and reconciliation fills the gaps.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!("Initializing client engine");

		for projection in [
			OrderProjection::Open,
			OrderProjection::MyBids,
			OrderProjection::Accepted,
		] {
			if let Err(e) = self.orders().refresh(projection).await {
				tracing::warn!(projection = %projection, error = %e, "Initial fetch failed");
			}
		}
		if let Err(e) = self.wallet().refresh().await {
			tracing::warn!(error = %e, "Initial wallet fetch failed");
		}

		Ok(())
	}

	/// Performs cleanup operations.
	///
	/// Invalidates the session first so any fetch still in flight cannot
	/// apply its result, then stops the notification listeners.
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down client engine");

		self.session().invalidate();

		self.realtime
			.stop_all()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;

		Ok(())
	}
}
