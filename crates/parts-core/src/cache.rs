//! In-memory order cache.
//!
//! Holds one snapshot per read projection. Snapshots are replaced
//! wholesale by authoritative fetches and patched in place by optimistic
//! updates; the cache itself never talks to the backend and never rolls a
//! patch back arithmetically, rollback is always a refetch replacing the
//! snapshot. The cache is not transactional: concurrent optimistic
//! patches to the same order are last-write-wins at the field level,
//! which is acceptable because every mutating flow ends in a
//! server-trusted refetch.
//!
//! No ordering is guaranteed for the stored lists; consumers sort
//! explicitly via [`parts_types::sort_by_date`].

use parts_types::{Order, OrderProjection};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Projections in their fixed lookup order, so searches across
/// projections are deterministic.
const PROJECTIONS: [OrderProjection; 3] = [
	OrderProjection::Open,
	OrderProjection::MyBids,
	OrderProjection::Accepted,
];

/// Client-side cache of order projections.
#[derive(Default)]
pub struct OrderCache {
	projections: RwLock<HashMap<OrderProjection, Vec<Order>>>,
}

impl OrderCache {
	/// Creates an empty cache.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns a clone of the projection's current snapshot.
	pub async fn snapshot(&self, projection: OrderProjection) -> Vec<Order> {
		let projections = self.projections.read().await;
		projections.get(&projection).cloned().unwrap_or_default()
	}

	/// Replaces the projection's snapshot with fresh authoritative state.
	pub async fn replace(&self, projection: OrderProjection, orders: Vec<Order>) {
		let mut projections = self.projections.write().await;
		projections.insert(projection, orders);
	}

	/// Finds an order by number, searching projections in fixed order.
	pub async fn find(&self, order_number: &str) -> Option<Order> {
		let projections = self.projections.read().await;
		for projection in PROJECTIONS {
			if let Some(order) = projections
				.get(&projection)
				.and_then(|orders| orders.iter().find(|o| o.order_number == order_number))
			{
				return Some(order.clone());
			}
		}
		None
	}

	/// Returns the first projection containing the order, in fixed order.
	pub async fn projection_of(&self, order_number: &str) -> Option<OrderProjection> {
		let projections = self.projections.read().await;
		PROJECTIONS.into_iter().find(|projection| {
			projections
				.get(projection)
				.is_some_and(|orders| orders.iter().any(|o| o.order_number == order_number))
		})
	}

	/// Applies a patch to every cached copy of the order, across all
	/// projections, before server confirmation.
	///
	/// Returns the number of copies patched. A failed confirmation is
	/// rolled back by refetching the projection, not by inverting the
	/// patch.
	pub async fn apply_optimistic<F>(&self, order_number: &str, mut patch: F) -> usize
	where
		F: FnMut(&mut Order),
	{
		let mut projections = self.projections.write().await;
		let mut patched = 0;
		for orders in projections.values_mut() {
			for order in orders.iter_mut() {
				if order.order_number == order_number {
					patch(order);
					patched += 1;
				}
			}
		}
		patched
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::order;
	use parts_types::{DeliveryMethod, OrderStatus};

	#[tokio::test]
	async fn test_replace_and_snapshot() {
		let cache = OrderCache::new();
		assert!(cache.snapshot(OrderProjection::Open).await.is_empty());

		cache
			.replace(
				OrderProjection::Open,
				vec![order("A", OrderStatus::Pending, DeliveryMethod::Pickup)],
			)
			.await;

		let snapshot = cache.snapshot(OrderProjection::Open).await;
		assert_eq!(snapshot.len(), 1);
		assert_eq!(snapshot[0].order_number, "A");
	}

	#[tokio::test]
	async fn test_optimistic_patch_hits_every_copy() {
		let cache = OrderCache::new();
		cache
			.replace(
				OrderProjection::MyBids,
				vec![order("A", OrderStatus::Quoted, DeliveryMethod::Pickup)],
			)
			.await;
		cache
			.replace(
				OrderProjection::Accepted,
				vec![order("A", OrderStatus::Quoted, DeliveryMethod::Pickup)],
			)
			.await;

		let patched = cache
			.apply_optimistic("A", |o| o.status = OrderStatus::PaymentPending)
			.await;
		assert_eq!(patched, 2);

		for projection in [OrderProjection::MyBids, OrderProjection::Accepted] {
			let snapshot = cache.snapshot(projection).await;
			assert_eq!(snapshot[0].status, OrderStatus::PaymentPending);
		}
	}

	#[tokio::test]
	async fn test_patch_of_unknown_order_is_a_noop() {
		let cache = OrderCache::new();
		cache
			.replace(
				OrderProjection::Open,
				vec![order("A", OrderStatus::Pending, DeliveryMethod::Pickup)],
			)
			.await;

		let patched = cache.apply_optimistic("B", |o| o.hidden = true).await;
		assert_eq!(patched, 0);
		assert!(!cache.snapshot(OrderProjection::Open).await[0].hidden);
	}

	#[tokio::test]
	async fn test_projection_lookup_is_deterministic() {
		let cache = OrderCache::new();
		cache
			.replace(
				OrderProjection::Accepted,
				vec![order("A", OrderStatus::Processing, DeliveryMethod::Pickup)],
			)
			.await;
		cache
			.replace(
				OrderProjection::Open,
				vec![order("A", OrderStatus::Pending, DeliveryMethod::Pickup)],
			)
			.await;

		// Open wins: projections are searched in fixed order.
		assert_eq!(
			cache.projection_of("A").await,
			Some(OrderProjection::Open)
		);
		assert_eq!(cache.find("A").await.unwrap().status, OrderStatus::Pending);
	}
}
