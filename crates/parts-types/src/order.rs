//! Order and quote types for the client order lifecycle.
//!
//! An order is created server-side from a customer's part request and
//! enters the client through fetches; the client mutates it only via quote
//! submission, status-update calls, and real-time reconciliation. The car
//! and part description submitted by the customer is an opaque payload the
//! client never interprets beyond the category used for visibility gating.

use crate::status::OrderStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// How the customer receives the part, which gates the fulfillment path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
	/// Customer collects the part from the provider.
	Pickup,
	/// Part is courier-delivered to the customer.
	Shipping,
}

impl fmt::Display for DeliveryMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DeliveryMethod::Pickup => write!(f, "pickup"),
			DeliveryMethod::Shipping => write!(f, "shipping"),
		}
	}
}

/// Condition of the quoted part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartCondition {
	New,
	Used,
}

/// Size class of the quoted part, used for shipping cost estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartSizeCategory {
	Small,
	Medium,
	Large,
	Bulky,
}

/// References to media attached to a quote.
///
/// Entries are upload references (URLs or storage keys), never raw bytes;
/// previously uploaded blobs may be served from the local fallback cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaBundle {
	/// Image references, in upload order.
	#[serde(default)]
	pub images: Vec<String>,
	/// Optional video reference.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub video: Option<String>,
	/// Optional voice note reference.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub voice_note: Option<String>,
}

impl MediaBundle {
	/// Returns true if the bundle carries no references at all.
	pub fn is_empty(&self) -> bool {
		self.images.is_empty() && self.video.is_none() && self.voice_note.is_none()
	}
}

/// A provider's price offer against an open order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
	/// Unique identifier, generated server-side (or client-side by mocks).
	pub id: String,
	/// Order this quote was submitted against.
	pub order_number: String,
	/// Provider that submitted the quote.
	pub provider_id: String,
	/// Offered price. Non-negative by construction of the draft validation.
	pub price: Decimal,
	/// Condition of the offered part.
	pub part_condition: PartCondition,
	/// Size class of the offered part.
	pub part_size: PartSizeCategory,
	/// Free-form provider notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Attached media references, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub media: Option<MediaBundle>,
	/// Timestamp when this quote was created.
	pub created_at: DateTime<Utc>,
}

/// Provider-entered quote input before validation.
///
/// The price is carried as a raw float exactly as entered; validation
/// converts it to a [`Decimal`] and rejects NaN, infinities, and negative
/// values before any network call is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDraft {
	/// Offered price as entered.
	pub price: f64,
	/// Condition of the offered part.
	pub part_condition: PartCondition,
	/// Size class of the offered part.
	pub part_size: PartSizeCategory,
	/// Free-form provider notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// A customer request for a car part, tracked through fulfillment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique, immutable order identifier.
	pub order_number: String,
	/// Current lifecycle status, normalized on ingest.
	pub status: OrderStatus,
	/// Part category used for provider visibility gating.
	pub category: String,
	/// Opaque car/part description as submitted by the customer.
	#[serde(default)]
	pub form_data: serde_json::Value,
	/// Quotes submitted against this order, in submission order.
	#[serde(default)]
	pub quotes: Vec<Quote>,
	/// Identifier of the accepted quote, if one has been accepted.
	///
	/// Must reference an entry of `quotes`; at most one quote per order is
	/// accepted at any time.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub accepted_quote_id: Option<String>,
	/// How the customer receives the part.
	pub delivery_method: DeliveryMethod,
	/// Whether the provider hid this order from their board.
	///
	/// Toggled optimistically in the cache before the backend confirms;
	/// a failed confirmation is rolled back by refetch.
	#[serde(default)]
	pub hidden: bool,
	/// Customer display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_name: Option<String>,
	/// Customer phone number.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_phone: Option<String>,
	/// Customer city.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_city: Option<String>,
	/// Timestamp when the order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when the order was last updated.
	pub updated_at: DateTime<Utc>,
}

/// Violations of the order data invariants, detected on ingest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderIntegrityError {
	/// The accepted quote id does not reference any quote on the order.
	#[error("accepted quote {quote_id} not found on order {order_number}")]
	AcceptedQuoteMissing {
		order_number: String,
		quote_id: String,
	},
	/// A quote's back-reference points at a different order.
	#[error("quote {quote_id} references order {referenced}, expected {order_number}")]
	QuoteBackReferenceMismatch {
		order_number: String,
		quote_id: String,
		referenced: String,
	},
}

impl Order {
	/// Resolves the accepted quote, if one is set and present.
	pub fn accepted_quote(&self) -> Option<&Quote> {
		let id = self.accepted_quote_id.as_deref()?;
		self.quotes.iter().find(|q| q.id == id)
	}

	/// Returns true if the given provider has already quoted this order.
	pub fn has_quote_from(&self, provider_id: &str) -> bool {
		self.quotes.iter().any(|q| q.provider_id == provider_id)
	}

	/// Verifies the order's internal invariants.
	///
	/// Checked once when an order crosses the ingestion boundary so the
	/// rest of the client can rely on `accepted_quote()` resolving.
	pub fn check_consistency(&self) -> Result<(), OrderIntegrityError> {
		for quote in &self.quotes {
			if quote.order_number != self.order_number {
				return Err(OrderIntegrityError::QuoteBackReferenceMismatch {
					order_number: self.order_number.clone(),
					quote_id: quote.id.clone(),
					referenced: quote.order_number.clone(),
				});
			}
		}
		if let Some(id) = &self.accepted_quote_id {
			if !self.quotes.iter().any(|q| &q.id == id) {
				return Err(OrderIntegrityError::AcceptedQuoteMissing {
					order_number: self.order_number.clone(),
					quote_id: id.clone(),
				});
			}
		}
		Ok(())
	}
}

/// Read projections over the order cache.
///
/// Each projection is fetched from its own backend endpoint and cached as
/// an independent snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderProjection {
	/// Open orders visible to the current provider.
	Open,
	/// Orders the current provider has quoted.
	MyBids,
	/// Orders where the current provider's quote was accepted.
	Accepted,
}

impl fmt::Display for OrderProjection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderProjection::Open => write!(f, "open"),
			OrderProjection::MyBids => write!(f, "my_bids"),
			OrderProjection::Accepted => write!(f, "accepted"),
		}
	}
}

/// Sort direction for order list consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
	Ascending,
	Descending,
}

/// Sorts orders by creation date.
///
/// The repository itself guarantees no ordering; consumers sort explicitly.
/// The sort is stable and ties on identical timestamps are broken by order
/// number, so a given key always yields the same sequence.
pub fn sort_by_date(orders: &mut [Order], direction: SortDirection) {
	orders.sort_by(|a, b| {
		let ord = a
			.created_at
			.cmp(&b.created_at)
			.then_with(|| a.order_number.cmp(&b.order_number));
		match direction {
			SortDirection::Ascending => ord,
			SortDirection::Descending => ord.reverse(),
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;

	fn quote(id: &str, order_number: &str, provider_id: &str) -> Quote {
		Quote {
			id: id.to_string(),
			order_number: order_number.to_string(),
			provider_id: provider_id.to_string(),
			price: Decimal::new(1000, 1),
			part_condition: PartCondition::New,
			part_size: PartSizeCategory::Small,
			notes: None,
			media: None,
			created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
		}
	}

	fn order(order_number: &str, created_secs: i64) -> Order {
		Order {
			order_number: order_number.to_string(),
			status: OrderStatus::Pending,
			category: "engine".to_string(),
			form_data: serde_json::Value::Null,
			quotes: vec![],
			accepted_quote_id: None,
			delivery_method: DeliveryMethod::Shipping,
			hidden: false,
			customer_name: None,
			customer_phone: None,
			customer_city: None,
			created_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
			updated_at: Utc.timestamp_opt(created_secs, 0).unwrap(),
		}
	}

	#[test]
	fn test_accepted_quote_resolves_by_id() {
		let mut o = order("ORD-1", 1_700_000_000);
		o.quotes = vec![quote("q1", "ORD-1", "p1"), quote("q2", "ORD-1", "p2")];
		o.accepted_quote_id = Some("q2".to_string());
		assert!(o.check_consistency().is_ok());
		assert_eq!(o.accepted_quote().unwrap().provider_id, "p2");
	}

	#[test]
	fn test_dangling_accepted_quote_is_rejected() {
		let mut o = order("ORD-1", 1_700_000_000);
		o.quotes = vec![quote("q1", "ORD-1", "p1")];
		o.accepted_quote_id = Some("missing".to_string());
		assert!(matches!(
			o.check_consistency(),
			Err(OrderIntegrityError::AcceptedQuoteMissing { .. })
		));
	}

	#[test]
	fn test_quote_back_reference_must_match() {
		let mut o = order("ORD-1", 1_700_000_000);
		o.quotes = vec![quote("q1", "ORD-2", "p1")];
		assert!(matches!(
			o.check_consistency(),
			Err(OrderIntegrityError::QuoteBackReferenceMismatch { .. })
		));
	}

	#[test]
	fn test_sort_is_deterministic_on_equal_dates() {
		let mut orders = vec![order("B", 100), order("A", 100), order("C", 50)];
		sort_by_date(&mut orders, SortDirection::Ascending);
		let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_str()).collect();
		assert_eq!(numbers, ["C", "A", "B"]);

		sort_by_date(&mut orders, SortDirection::Descending);
		let numbers: Vec<_> = orders.iter().map(|o| o.order_number.as_str()).collect();
		assert_eq!(numbers, ["B", "A", "C"]);
	}

	#[test]
	fn test_order_wire_shape_is_camel_case() {
		let o = order("ORD-9", 1_700_000_000);
		let json = serde_json::to_value(&o).unwrap();
		assert!(json.get("orderNumber").is_some());
		assert!(json.get("deliveryMethod").is_some());
		assert_eq!(json["status"], "pending");
	}
}
