//! Status transitions.
//!
//! Validates a transition against the flow table before any backend call:
//! a transition not permitted for the order's current status, delivery
//! method, and the signed-in role is rejected with zero requests fired
//! and no cache mutation. After a successful call the affected projection
//! is refetched instead of patched optimistically, because downstream
//! side effects (wallet credit on completion) are computed server-side.

use crate::cache::OrderCache;
use crate::event_bus::EventBus;
use crate::handlers::orders::OrdersHandler;
use crate::handlers::HandlerError;
use parts_api::ApiService;
use parts_order::{ensure_transition, next_fulfillment_step};
use parts_types::{ClientEvent, OrderEvent, OrderProjection, OrderStatus, Role, Toast};
use std::sync::Arc;
use tracing::instrument;

/// Handler for order status transitions.
pub struct StatusHandler {
	api: Arc<ApiService>,
	cache: Arc<OrderCache>,
	orders: Arc<OrdersHandler>,
	role: Role,
	event_bus: EventBus,
}

impl StatusHandler {
	pub fn new(
		api: Arc<ApiService>,
		cache: Arc<OrderCache>,
		orders: Arc<OrdersHandler>,
		role: Role,
		event_bus: EventBus,
	) -> Self {
		Self {
			api,
			cache,
			orders,
			role,
			event_bus,
		}
	}

	/// Moves an order to the given status.
	#[instrument(skip_all, fields(order_number = %order_number, next = %next))]
	pub async fn update_status(
		&self,
		order_number: &str,
		next: OrderStatus,
	) -> Result<OrderStatus, HandlerError> {
		let order = self
			.cache
			.find(order_number)
			.await
			.ok_or_else(|| HandlerError::UnknownOrder(order_number.to_string()))?;

		// Local validation first: an invalid transition fires no request
		// and mutates nothing.
		ensure_transition(&order.status, &next, order.delivery_method, self.role)?;

		let updated = match self.api.update_status(order_number, &next).await {
			Ok(updated) => updated,
			Err(e) => {
				self.event_bus
					.publish(ClientEvent::Toast(Toast::error(format!(
						"Status update failed: {}",
						e
					))))
					.ok();
				return Err(e.into());
			}
		};

		// The server may have computed side effects alongside the new
		// status; refetch the projection rather than trusting a patch.
		let projection = self
			.cache
			.projection_of(order_number)
			.await
			.unwrap_or(OrderProjection::Accepted);
		if let Err(e) = self.orders.refresh(projection).await {
			tracing::warn!(error = %e, "Post-transition refetch failed, cache may lag");
		}

		tracing::info!(status = %updated.status, "Status updated");
		self.event_bus
			.publish(ClientEvent::Order(OrderEvent::StatusChanged {
				order_number: order_number.to_string(),
				status: updated.status.clone(),
			}))
			.ok();

		Ok(updated.status)
	}

	/// Advances an order along its single forward fulfillment step for
	/// the order's delivery method.
	#[instrument(skip_all, fields(order_number = %order_number))]
	pub async fn advance(&self, order_number: &str) -> Result<OrderStatus, HandlerError> {
		let order = self
			.cache
			.find(order_number)
			.await
			.ok_or_else(|| HandlerError::UnknownOrder(order_number.to_string()))?;

		let next = next_fulfillment_step(&order.status, order.delivery_method)
			.ok_or_else(|| HandlerError::NothingToAdvance(order_number.to_string()))?;

		self.update_status(order_number, next).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::ViewSession;
	use crate::test_support::order;
	use parts_api::implementations::mock::MockBackend;
	use parts_storage::implementations::memory::MemoryStorage;
	use parts_storage::StorageService;
	use parts_types::{DeliveryMethod, Provider};
	use rust_decimal::Decimal;

	async fn setup(
		status: OrderStatus,
		method: DeliveryMethod,
		role: Role,
	) -> (StatusHandler, Arc<OrderCache>, MockBackend) {
		let mock = MockBackend::new("p1");
		mock.seed_orders(
			OrderProjection::Accepted,
			vec![order("ORD-1", status.clone(), method)],
		)
		.await;

		let cache = Arc::new(OrderCache::new());
		cache
			.replace(OrderProjection::Accepted, vec![order("ORD-1", status, method)])
			.await;

		let api = Arc::new(ApiService::new(Box::new(mock.clone())));
		let bus = EventBus::new(16);
		let orders = Arc::new(OrdersHandler::new(
			api.clone(),
			cache.clone(),
			Arc::new(ViewSession::new()),
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			Provider {
				id: "p1".to_string(),
				name: None,
				wallet_balance: Decimal::ZERO,
				assigned_categories: ["engine".to_string()].into_iter().collect(),
			},
			bus.clone(),
		));
		let handler = StatusHandler::new(api, cache.clone(), orders, role, bus);
		(handler, cache, mock)
	}

	#[tokio::test]
	async fn test_pickup_advances_to_ready_for_pickup() {
		let (handler, cache, _) = setup(
			OrderStatus::Processing,
			DeliveryMethod::Pickup,
			Role::Provider,
		)
		.await;

		let next = handler.advance("ORD-1").await.unwrap();
		assert_eq!(next, OrderStatus::ReadyForPickup);
		// Confirmed by the refetch, not just the optimistic path.
		assert_eq!(
			cache.find("ORD-1").await.unwrap().status,
			OrderStatus::ReadyForPickup
		);
	}

	#[tokio::test]
	async fn test_shipping_advances_to_provider_received() {
		let (handler, _, _) = setup(
			OrderStatus::Processing,
			DeliveryMethod::Shipping,
			Role::Provider,
		)
		.await;

		let next = handler.advance("ORD-1").await.unwrap();
		assert_eq!(next, OrderStatus::ProviderReceived);
	}

	#[tokio::test]
	async fn test_invalid_transition_fires_no_request() {
		let (handler, cache, mock) = setup(
			OrderStatus::Pending,
			DeliveryMethod::Shipping,
			Role::Provider,
		)
		.await;

		let result = handler
			.update_status("ORD-1", OrderStatus::Shipped)
			.await;
		assert!(matches!(result, Err(HandlerError::Flow(_))));
		assert_eq!(mock.calls("update_status").await, 0);
		assert_eq!(
			cache.find("ORD-1").await.unwrap().status,
			OrderStatus::Pending
		);
	}

	#[tokio::test]
	async fn test_terminal_states_cannot_move() {
		for terminal in [
			OrderStatus::Delivered,
			OrderStatus::Completed,
			OrderStatus::Cancelled,
		] {
			let (handler, _, mock) = setup(
				terminal,
				DeliveryMethod::Shipping,
				Role::Provider,
			)
			.await;
			let result = handler.update_status("ORD-1", OrderStatus::Shipped).await;
			assert!(matches!(result, Err(HandlerError::Flow(_))));
			assert_eq!(mock.calls("update_status").await, 0);
		}
	}

	#[tokio::test]
	async fn test_backend_rejection_surfaces_and_cache_recovers_by_refetch() {
		let (handler, cache, mock) = setup(
			OrderStatus::Processing,
			DeliveryMethod::Pickup,
			Role::Provider,
		)
		.await;
		mock.set_failing(true).await;

		let result = handler.advance("ORD-1").await;
		assert!(matches!(result, Err(HandlerError::Backend(_))));
		assert_eq!(
			cache.find("ORD-1").await.unwrap().status,
			OrderStatus::Processing
		);
	}

	#[tokio::test]
	async fn test_nothing_to_advance_from_pending() {
		let (handler, _, mock) = setup(
			OrderStatus::Pending,
			DeliveryMethod::Pickup,
			Role::Provider,
		)
		.await;
		let result = handler.advance("ORD-1").await;
		assert!(matches!(result, Err(HandlerError::NothingToAdvance(_))));
		assert_eq!(mock.calls("update_status").await, 0);
	}
}
