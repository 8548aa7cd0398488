//! Quote submission.
//!
//! Drafts are validated before any network call; an invalid price or a
//! closed order is rejected without touching the backend or the cache.
//! On success the server-returned quote is appended to every cached copy
//! of the order and a pending order advances to quoted optimistically,
//! trusting the next refetch to confirm. On failure the cache is left
//! byte-identical to before the call.

use crate::cache::OrderCache;
use crate::event_bus::EventBus;
use crate::handlers::HandlerError;
use parts_api::{ApiService, QuoteSubmission};
use parts_order::validate_draft;
use parts_storage::StorageService;
use parts_types::{
	ClientEvent, MediaBundle, OrderEvent, OrderStatus, Quote, QuoteDraft, StoreKey, Toast,
};
use std::sync::Arc;
use tracing::instrument;

/// Handler for submitting provider quotes.
pub struct QuotesHandler {
	api: Arc<ApiService>,
	cache: Arc<OrderCache>,
	storage: Arc<StorageService>,
	provider_id: String,
	event_bus: EventBus,
}

impl QuotesHandler {
	pub fn new(
		api: Arc<ApiService>,
		cache: Arc<OrderCache>,
		storage: Arc<StorageService>,
		provider_id: String,
		event_bus: EventBus,
	) -> Self {
		Self {
			api,
			cache,
			storage,
			provider_id,
			event_bus,
		}
	}

	/// Submits a quote against an open order.
	///
	/// Re-quoting is allowed while the order stays open; every call
	/// creates a new quote rather than mutating an earlier one.
	#[instrument(skip_all, fields(order_number = %order_number))]
	pub async fn submit(
		&self,
		order_number: &str,
		draft: &QuoteDraft,
		media: Option<MediaBundle>,
	) -> Result<Quote, HandlerError> {
		let order = self
			.cache
			.find(order_number)
			.await
			.ok_or_else(|| HandlerError::UnknownOrder(order_number.to_string()))?;

		// Client-side validation: nothing below this line runs for an
		// invalid draft.
		let validated = validate_draft(draft, &order.status)?;

		let submission = QuoteSubmission {
			provider_id: self.provider_id.clone(),
			price: validated.price,
			part_condition: draft.part_condition,
			part_size: draft.part_size,
			notes: draft.notes.clone(),
			media,
		};

		let quote = match self.api.submit_quote(order_number, &submission).await {
			Ok(quote) => quote,
			Err(e) => {
				self.event_bus
					.publish(ClientEvent::Toast(Toast::error(format!(
						"Quote submission failed: {}",
						e
					))))
					.ok();
				return Err(e.into());
			}
		};

		self.cache
			.apply_optimistic(order_number, |order| {
				order.quotes.push(quote.clone());
				if order.status == OrderStatus::Pending {
					order.status = OrderStatus::Quoted;
				}
			})
			.await;

		// Cache the uploaded media references so a resubmission or a
		// reopened form can reuse them without another upload.
		if let Some(media) = &submission.media {
			if !media.is_empty() {
				if let Err(e) = self
					.storage
					.store(StoreKey::Media.as_str(), &quote.id, media)
					.await
				{
					tracing::debug!(error = %e, "Could not cache media bundle");
				}
			}
		}

		tracing::info!(quote_id = %quote.id, "Quote submitted");
		self.event_bus
			.publish(ClientEvent::Order(OrderEvent::QuoteSubmitted {
				order_number: order_number.to_string(),
				quote_id: quote.id.clone(),
			}))
			.ok();

		Ok(quote)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::test_support::order;
	use parts_api::implementations::mock::MockBackend;
	use parts_api::BackendInterface;
	use parts_storage::implementations::memory::MemoryStorage;
	use parts_types::{DeliveryMethod, OrderProjection, PartCondition, PartSizeCategory};
	use rust_decimal::Decimal;

	fn draft(price: f64) -> QuoteDraft {
		QuoteDraft {
			price,
			part_condition: PartCondition::New,
			part_size: PartSizeCategory::Small,
			notes: None,
		}
	}

	async fn setup(
		status: OrderStatus,
	) -> (QuotesHandler, Arc<OrderCache>, MockBackend, Arc<StorageService>) {
		let mock = MockBackend::new("p1");
		mock.seed_orders(
			OrderProjection::Open,
			vec![order("ORD-1", status.clone(), DeliveryMethod::Pickup)],
		)
		.await;

		let cache = Arc::new(OrderCache::new());
		cache
			.replace(
				OrderProjection::Open,
				vec![order("ORD-1", status, DeliveryMethod::Pickup)],
			)
			.await;

		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let handler = QuotesHandler::new(
			Arc::new(ApiService::new(Box::new(mock.clone()))),
			cache.clone(),
			storage.clone(),
			"p1".to_string(),
			EventBus::new(16),
		);
		(handler, cache, mock, storage)
	}

	#[tokio::test]
	async fn test_round_trip_appends_exact_values() {
		let (handler, cache, _, _) = setup(OrderStatus::Pending).await;

		let quote = handler
			.submit(
				"ORD-1",
				&QuoteDraft {
					price: 150.5,
					part_condition: PartCondition::New,
					part_size: PartSizeCategory::Small,
					notes: None,
				},
				None,
			)
			.await
			.unwrap();

		let cached = cache.find("ORD-1").await.unwrap();
		assert_eq!(cached.quotes.len(), 1);
		assert_eq!(cached.quotes[0].price, Decimal::new(1505, 1));
		assert_eq!(cached.quotes[0].part_condition, PartCondition::New);
		assert_eq!(cached.quotes[0].part_size, PartSizeCategory::Small);
		assert!(!quote.id.is_empty());
	}

	#[tokio::test]
	async fn test_pending_order_optimistically_becomes_quoted() {
		let (handler, cache, mock, _) = setup(OrderStatus::Pending).await;

		handler.submit("ORD-1", &draft(99.0), None).await.unwrap();
		assert_eq!(
			cache.find("ORD-1").await.unwrap().status,
			OrderStatus::Quoted
		);

		// A subsequent authoritative fetch confirms the same status.
		let server_side = mock.fetch_orders(OrderProjection::Open).await.unwrap();
		assert_eq!(server_side[0].status, OrderStatus::Quoted);
	}

	#[tokio::test]
	async fn test_invalid_prices_never_reach_the_network() {
		let (handler, cache, mock, _) = setup(OrderStatus::Pending).await;

		for bad in [-1.0, f64::NAN] {
			let result = handler.submit("ORD-1", &draft(bad), None).await;
			assert!(matches!(result, Err(HandlerError::Quote(_))));
		}

		// No request of any kind left the process.
		assert_eq!(mock.total_calls().await, 0);
		assert!(cache.find("ORD-1").await.unwrap().quotes.is_empty());
	}

	#[tokio::test]
	async fn test_network_failure_leaves_cache_unchanged() {
		let (handler, cache, mock, _) = setup(OrderStatus::Pending).await;
		mock.set_failing(true).await;

		let before = cache.find("ORD-1").await.unwrap();
		let result = handler.submit("ORD-1", &draft(42.0), None).await;
		assert!(matches!(result, Err(HandlerError::Backend(_))));

		let after = cache.find("ORD-1").await.unwrap();
		assert_eq!(before, after);
	}

	#[tokio::test]
	async fn test_requoting_creates_additional_quotes() {
		let (handler, cache, _, _) = setup(OrderStatus::Pending).await;

		handler.submit("ORD-1", &draft(10.0), None).await.unwrap();
		handler.submit("ORD-1", &draft(12.0), None).await.unwrap();

		let cached = cache.find("ORD-1").await.unwrap();
		assert_eq!(cached.quotes.len(), 2);
		assert_ne!(cached.quotes[0].id, cached.quotes[1].id);
	}

	#[tokio::test]
	async fn test_submitted_media_lands_in_fallback_cache() {
		let (handler, _, _, storage) = setup(OrderStatus::Pending).await;

		let media = MediaBundle {
			images: vec!["uploads/bumper-front.jpg".to_string()],
			video: None,
			voice_note: None,
		};
		let quote = handler
			.submit("ORD-1", &draft(75.0), Some(media.clone()))
			.await
			.unwrap();

		let cached: MediaBundle = storage.retrieve("media", &quote.id).await.unwrap();
		assert_eq!(cached, media);
	}
}
