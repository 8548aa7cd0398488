//! Wallet operations.
//!
//! The balance is server-authoritative: the handler holds a cached
//! snapshot that is only ever replaced by a refetch, never adjusted
//! locally. Withdrawal requests get a client-side precheck against the
//! cached balance to catch obvious mistakes early, but the backend
//! remains the authority and its verdict is reflected by refetching.

use crate::event_bus::EventBus;
use crate::handlers::HandlerError;
use arc_swap::ArcSwapOption;
use parts_api::ApiService;
use parts_storage::StorageService;
use parts_types::{ClientEvent, StoreKey, Toast, WalletEvent, WalletSnapshot, WithdrawalRequest};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::instrument;

/// Handler for wallet reads and withdrawal requests.
pub struct WalletHandler {
	api: Arc<ApiService>,
	storage: Arc<StorageService>,
	provider_id: String,
	snapshot: ArcSwapOption<WalletSnapshot>,
	event_bus: EventBus,
}

impl WalletHandler {
	pub fn new(
		api: Arc<ApiService>,
		storage: Arc<StorageService>,
		provider_id: String,
		event_bus: EventBus,
	) -> Self {
		Self {
			api,
			storage,
			provider_id,
			snapshot: ArcSwapOption::const_empty(),
			event_bus,
		}
	}

	/// Returns the cached wallet snapshot, if any fetch has completed.
	pub fn snapshot(&self) -> Option<Arc<WalletSnapshot>> {
		self.snapshot.load_full()
	}

	/// Replaces the cached snapshot with fresh server state.
	#[instrument(skip_all)]
	pub async fn refresh(&self) -> Result<Arc<WalletSnapshot>, HandlerError> {
		let snapshot = Arc::new(self.api.fetch_wallet().await?);
		self.snapshot.store(Some(snapshot.clone()));

		if let Err(e) = self
			.storage
			.store(StoreKey::Wallet.as_str(), &self.provider_id, snapshot.as_ref())
			.await
		{
			tracing::debug!(error = %e, "Could not persist wallet snapshot");
		}

		tracing::debug!(balance = %snapshot.balance, "Wallet refreshed");
		self.event_bus
			.publish(ClientEvent::Wallet(WalletEvent::Refreshed {
				balance: snapshot.balance,
			}))
			.ok();

		Ok(snapshot)
	}

	/// Fetches the account's withdrawal requests.
	pub async fn withdrawals(&self) -> Result<Vec<WithdrawalRequest>, HandlerError> {
		Ok(self.api.fetch_withdrawals().await?)
	}

	/// Creates a withdrawal request.
	///
	/// The amount must be positive and, when a cached snapshot exists,
	/// within the cached balance. The resulting balance change is never
	/// computed locally; a wallet refetch follows the successful request.
	#[instrument(skip_all, fields(amount = %amount))]
	pub async fn request_withdrawal(
		&self,
		amount: Decimal,
	) -> Result<WithdrawalRequest, HandlerError> {
		if amount <= Decimal::ZERO {
			return Err(HandlerError::InvalidWithdrawal(
				"amount must be positive".to_string(),
			));
		}
		if let Some(snapshot) = self.snapshot() {
			if amount > snapshot.balance {
				return Err(HandlerError::InvalidWithdrawal(format!(
					"amount {} exceeds balance {}",
					amount, snapshot.balance
				)));
			}
		}

		let request = match self.api.request_withdrawal(amount).await {
			Ok(request) => request,
			Err(e) => {
				self.event_bus
					.publish(ClientEvent::Toast(Toast::error(format!(
						"Withdrawal request failed: {}",
						e
					))))
					.ok();
				return Err(e.into());
			}
		};

		if let Err(e) = self.refresh().await {
			tracing::warn!(error = %e, "Wallet refetch after withdrawal failed");
		}

		self.event_bus
			.publish(ClientEvent::Wallet(WalletEvent::WithdrawalRequested {
				id: request.id.clone(),
				amount: request.amount,
			}))
			.ok();

		Ok(request)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parts_api::implementations::mock::MockBackend;
	use parts_storage::implementations::memory::MemoryStorage;
	use parts_types::WithdrawalStatus;

	async fn setup(balance: Decimal) -> (WalletHandler, MockBackend) {
		let mock = MockBackend::new("p1");
		mock.seed_wallet(balance).await;
		let handler = WalletHandler::new(
			Arc::new(ApiService::new(Box::new(mock.clone()))),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			"p1".to_string(),
			EventBus::new(16),
		);
		(handler, mock)
	}

	#[tokio::test]
	async fn test_refresh_replaces_cached_snapshot() {
		let (handler, mock) = setup(Decimal::new(500, 0)).await;
		assert!(handler.snapshot().is_none());

		handler.refresh().await.unwrap();
		assert_eq!(handler.snapshot().unwrap().balance, Decimal::new(500, 0));

		mock.seed_wallet(Decimal::new(750, 0)).await;
		handler.refresh().await.unwrap();
		assert_eq!(handler.snapshot().unwrap().balance, Decimal::new(750, 0));
	}

	#[tokio::test]
	async fn test_withdrawal_precheck_fires_no_request() {
		let (handler, mock) = setup(Decimal::new(100, 0)).await;
		handler.refresh().await.unwrap();

		let result = handler.request_withdrawal(Decimal::new(-5, 0)).await;
		assert!(matches!(result, Err(HandlerError::InvalidWithdrawal(_))));

		let result = handler.request_withdrawal(Decimal::new(200, 0)).await;
		assert!(matches!(result, Err(HandlerError::InvalidWithdrawal(_))));

		assert_eq!(mock.calls("request_withdrawal").await, 0);
	}

	#[tokio::test]
	async fn test_successful_withdrawal_is_pending_and_refetches_wallet() {
		let (handler, mock) = setup(Decimal::new(300, 0)).await;
		handler.refresh().await.unwrap();

		let request = handler
			.request_withdrawal(Decimal::new(120, 0))
			.await
			.unwrap();
		assert_eq!(request.status, WithdrawalStatus::Pending);
		assert_eq!(request.amount, Decimal::new(120, 0));

		// The wallet snapshot was refetched, not decremented locally.
		assert_eq!(mock.calls("fetch_wallet").await, 2);
	}

	#[tokio::test]
	async fn test_withdrawal_history_reflects_created_requests() {
		let (handler, _mock) = setup(Decimal::new(300, 0)).await;
		handler.refresh().await.unwrap();
		assert!(handler.withdrawals().await.unwrap().is_empty());

		let request = handler
			.request_withdrawal(Decimal::new(80, 0))
			.await
			.unwrap();

		let history = handler.withdrawals().await.unwrap();
		assert_eq!(history.len(), 1);
		assert_eq!(history[0].id, request.id);
	}

	#[tokio::test]
	async fn test_failed_refresh_keeps_last_snapshot() {
		let (handler, mock) = setup(Decimal::new(50, 0)).await;
		handler.refresh().await.unwrap();

		mock.set_failing(true).await;
		assert!(handler.refresh().await.is_err());
		assert_eq!(handler.snapshot().unwrap().balance, Decimal::new(50, 0));
	}
}
