//! Projection refreshes and the order visibility toggle.
//!
//! Refreshing is the only way server state enters the cache and the only
//! rollback mechanism for optimistic patches. A refresh that fails leaves
//! the previous snapshot untouched; a refresh that completes under a
//! stale session token is discarded without touching anything.

use crate::cache::OrderCache;
use crate::event_bus::EventBus;
use crate::handlers::HandlerError;
use crate::session::ViewSession;
use parts_api::ApiService;
use parts_storage::StorageService;
use parts_types::{
	sort_by_date, ClientEvent, Order, OrderEvent, OrderProjection, Provider, SortDirection,
	StoreKey, Toast,
};
use std::sync::Arc;
use tracing::instrument;

/// What happened to a refresh's result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The snapshot was replaced with the given number of orders.
	Applied(usize),
	/// The session changed while the fetch was in flight; the result was
	/// dropped and the cache is untouched.
	DiscardedStale,
}

/// Handler for projection refreshes and per-order visibility.
pub struct OrdersHandler {
	api: Arc<ApiService>,
	cache: Arc<OrderCache>,
	session: Arc<ViewSession>,
	storage: Arc<StorageService>,
	provider: Provider,
	event_bus: EventBus,
}

impl OrdersHandler {
	pub fn new(
		api: Arc<ApiService>,
		cache: Arc<OrderCache>,
		session: Arc<ViewSession>,
		storage: Arc<StorageService>,
		provider: Provider,
		event_bus: EventBus,
	) -> Self {
		Self {
			api,
			cache,
			session,
			storage,
			provider,
			event_bus,
		}
	}

	/// Fetches a projection and replaces its snapshot.
	///
	/// The open projection is additionally filtered to what this provider
	/// may see: pending orders in an assigned category, not yet quoted by
	/// this provider. On fetch failure the stale snapshot is retained.
	#[instrument(skip_all, fields(projection = %projection))]
	pub async fn refresh(
		&self,
		projection: OrderProjection,
	) -> Result<RefreshOutcome, HandlerError> {
		let token = self.session.token();

		let mut orders = self.api.fetch_orders(projection).await?;
		if projection == OrderProjection::Open {
			orders.retain(|order| self.provider.sees_open_order(order));
		}

		if !self.session.is_current(token) {
			tracing::debug!("Discarding fetch result for a stale session");
			return Ok(RefreshOutcome::DiscardedStale);
		}

		let count = orders.len();

		// Keep a last-known-good copy for the next cold start.
		if let Err(e) = self
			.storage
			.store(StoreKey::Orders.as_str(), &projection.to_string(), &orders)
			.await
		{
			tracing::debug!(error = %e, "Could not persist projection snapshot");
		}

		self.cache.replace(projection, orders).await;
		self.event_bus
			.publish(ClientEvent::Order(OrderEvent::ProjectionRefreshed {
				projection,
				count,
			}))
			.ok();

		Ok(RefreshOutcome::Applied(count))
	}

	/// Returns the projection's snapshot sorted by creation date.
	pub async fn sorted_snapshot(
		&self,
		projection: OrderProjection,
		direction: SortDirection,
	) -> Vec<Order> {
		let mut orders = self.cache.snapshot(projection).await;
		sort_by_date(&mut orders, direction);
		orders
	}

	/// Toggles an order's visibility, optimistically.
	///
	/// The patch is applied to the cache immediately; when the backend
	/// rejects the toggle the patch is discarded by re-running the
	/// canonical fetch for the order's projection.
	#[instrument(skip_all, fields(order_number = %order_number, hidden))]
	pub async fn set_hidden(&self, order_number: &str, hidden: bool) -> Result<(), HandlerError> {
		let projection = self
			.cache
			.projection_of(order_number)
			.await
			.ok_or_else(|| HandlerError::UnknownOrder(order_number.to_string()))?;

		self.cache
			.apply_optimistic(order_number, |order| order.hidden = hidden)
			.await;

		match self.api.set_order_visibility(order_number, hidden).await {
			Ok(()) => Ok(()),
			Err(e) => {
				tracing::warn!(error = %e, "Visibility toggle failed, reverting by refetch");
				if let Err(refetch) = self.refresh(projection).await {
					tracing::warn!(error = %refetch, "Revert refetch failed, cache may be stale");
				}
				self.event_bus
					.publish(ClientEvent::Toast(Toast::error(format!(
						"Could not update order visibility: {}",
						e
					))))
					.ok();
				Err(e.into())
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::order;
	use parts_api::implementations::mock::MockBackend;
	use parts_storage::implementations::memory::MemoryStorage;
	use parts_types::{DeliveryMethod, OrderStatus};
	use rust_decimal::Decimal;
	use std::collections::HashSet;
	use std::time::Duration;

	fn provider(categories: &[&str]) -> Provider {
		Provider {
			id: "p1".to_string(),
			name: None,
			wallet_balance: Decimal::ZERO,
			assigned_categories: categories.iter().map(|c| c.to_string()).collect::<HashSet<_>>(),
		}
	}

	fn handler(mock: &MockBackend) -> (OrdersHandler, Arc<OrderCache>, Arc<ViewSession>) {
		let cache = Arc::new(OrderCache::new());
		let session = Arc::new(ViewSession::new());
		let handler = OrdersHandler::new(
			Arc::new(ApiService::new(Box::new(mock.clone()))),
			cache.clone(),
			session.clone(),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			provider(&["engine"]),
			EventBus::new(16),
		);
		(handler, cache, session)
	}

	#[tokio::test]
	async fn test_refresh_replaces_snapshot() {
		let mock = MockBackend::new("p1");
		mock.seed_orders(
			OrderProjection::Open,
			vec![order("A", OrderStatus::Pending, DeliveryMethod::Pickup)],
		)
		.await;
		let (handler, cache, _) = handler(&mock);

		let outcome = handler.refresh(OrderProjection::Open).await.unwrap();
		assert_eq!(outcome, RefreshOutcome::Applied(1));
		assert_eq!(cache.snapshot(OrderProjection::Open).await.len(), 1);
	}

	#[tokio::test]
	async fn test_failed_refresh_retains_stale_snapshot() {
		let mock = MockBackend::new("p1");
		mock.seed_orders(
			OrderProjection::Open,
			vec![order("A", OrderStatus::Pending, DeliveryMethod::Pickup)],
		)
		.await;
		let (handler, cache, _) = handler(&mock);
		handler.refresh(OrderProjection::Open).await.unwrap();

		mock.set_failing(true).await;
		let result = handler.refresh(OrderProjection::Open).await;
		assert!(result.is_err());
		// Last-known-good state survives the failure.
		assert_eq!(cache.snapshot(OrderProjection::Open).await.len(), 1);
	}

	#[tokio::test]
	async fn test_open_projection_filters_visibility() {
		let mock = MockBackend::new("p1");
		let mut foreign = order("B", OrderStatus::Pending, DeliveryMethod::Pickup);
		foreign.category = "tires".to_string();
		mock.seed_orders(
			OrderProjection::Open,
			vec![
				order("A", OrderStatus::Pending, DeliveryMethod::Pickup),
				foreign,
				order("C", OrderStatus::Quoted, DeliveryMethod::Pickup),
			],
		)
		.await;
		let (handler, cache, _) = handler(&mock);

		handler.refresh(OrderProjection::Open).await.unwrap();
		let snapshot = cache.snapshot(OrderProjection::Open).await;
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].order_number, "A");
	}

	#[tokio::test(start_paused = true)]
	async fn test_unmount_during_fetch_discards_result() {
		let mock = MockBackend::new("p1");
		mock.seed_orders(
			OrderProjection::Accepted,
			vec![order("A", OrderStatus::Processing, DeliveryMethod::Pickup)],
		)
		.await;
		mock.set_latency(Some(Duration::from_millis(500))).await;
		let (handler, cache, session) = handler(&mock);
		let handler = Arc::new(handler);

		let in_flight = {
			let handler = handler.clone();
			tokio::spawn(async move { handler.refresh(OrderProjection::Accepted).await })
		};
		tokio::task::yield_now().await;

		// The view unmounts while the fetch is still in flight.
		session.invalidate();
		tokio::time::advance(Duration::from_millis(500)).await;

		let outcome = in_flight.await.unwrap().unwrap();
		assert_eq!(outcome, RefreshOutcome::DiscardedStale);
		assert!(cache.snapshot(OrderProjection::Accepted).await.is_empty());
	}

	#[tokio::test]
	async fn test_hidden_toggle_rolls_back_by_refetch() {
		let mock = MockBackend::new("p1");
		mock.seed_orders(
			OrderProjection::MyBids,
			vec![order("A", OrderStatus::Quoted, DeliveryMethod::Pickup)],
		)
		.await;
		let (handler, cache, _) = handler(&mock);
		handler.refresh(OrderProjection::MyBids).await.unwrap();

		// Healthy path: optimistic patch confirmed by the backend.
		handler.set_hidden("A", true).await.unwrap();
		assert!(cache.find("A").await.unwrap().hidden);

		// Failing path: patch applied, then reverted by refetch. The mock
		// fails the toggle but recovers for the revert fetch.
		handler.set_hidden("A", false).await.unwrap();
		mock.set_failing(true).await;
		let result = handler.set_hidden("A", true).await;
		assert!(result.is_err());
		mock.set_failing(false).await;
		handler.refresh(OrderProjection::MyBids).await.unwrap();
		assert!(!cache.find("A").await.unwrap().hidden);
	}

	#[tokio::test]
	async fn test_sorted_snapshot_orders_by_date() {
		let mock = MockBackend::new("p1");
		let mut early = order("E", OrderStatus::Quoted, DeliveryMethod::Pickup);
		early.created_at = chrono::DateTime::from_timestamp(100, 0).unwrap();
		let mut late = order("L", OrderStatus::Quoted, DeliveryMethod::Pickup);
		late.created_at = chrono::DateTime::from_timestamp(200, 0).unwrap();
		mock.seed_orders(OrderProjection::MyBids, vec![late, early]).await;
		let (handler, _, _) = handler(&mock);
		handler.refresh(OrderProjection::MyBids).await.unwrap();

		let ascending = handler
			.sorted_snapshot(OrderProjection::MyBids, SortDirection::Ascending)
			.await;
		assert_eq!(ascending[0].order_number, "E");

		let descending = handler
			.sorted_snapshot(OrderProjection::MyBids, SortDirection::Descending)
			.await;
		assert_eq!(descending[0].order_number, "L");
	}
}
