//! Canonical order status enum and wire-alias normalization.
//!
//! The backend historically emitted several parallel representations of the
//! same lifecycle state: English snake_case, mixed-case English, and legacy
//! Arabic strings. This module folds all of them into one canonical enum
//! through a single alias table applied at every ingestion boundary, so no
//! other part of the client ever matches on a raw wire string. Values not
//! present in the table are carried as [`OrderStatus::Unknown`] and render
//! with a default label instead of erroring.

use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Canonical lifecycle status of an order.
///
/// Statuses progress `Pending -> Quoted -> PaymentPending -> Processing`,
/// then branch by delivery method into the pickup path (`ReadyForPickup`)
/// or the shipping path (`ProviderReceived -> Shipped -> OutForDelivery`),
/// and converge on the terminal states `Delivered`, `Completed`, or
/// `Cancelled`. The transition table itself lives in the order-flow crate;
/// this type only names the states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderStatus {
	/// Order is open and waiting for provider quotes.
	Pending,
	/// At least one provider has quoted the order.
	Quoted,
	/// Customer accepted a quote and payment is outstanding.
	PaymentPending,
	/// Payment confirmed; the winning provider is preparing the part.
	Processing,
	/// Part handed to the courier by the provider (shipping path).
	ProviderReceived,
	/// Part ready for customer pickup at the provider (pickup path).
	ReadyForPickup,
	/// Part in transit with the courier.
	Shipped,
	/// Courier is on the final delivery leg.
	OutForDelivery,
	/// Part delivered to the customer. Terminal.
	Delivered,
	/// Order fully settled, including wallet credit. Terminal.
	Completed,
	/// Order cancelled. Terminal.
	Cancelled,
	/// Wire value not present in the alias table.
	///
	/// Carries the raw string so it round-trips unchanged. Permits no
	/// transitions and renders with the default label.
	Unknown(String),
}

/// Alias table mapping every known wire representation to its canonical
/// status. Keys are matched exactly first, then against the ASCII
/// lowercase of the input, which folds the mixed-case English variants.
static ALIASES: Lazy<HashMap<&'static str, OrderStatus>> = Lazy::new(|| {
	use OrderStatus::*;
	HashMap::from([
		("pending", Pending),
		("open", Pending),
		("قيد الانتظار", Pending),
		("quoted", Quoted),
		("priced", Quoted),
		("تم التسعير", Quoted),
		("payment_pending", PaymentPending),
		("awaiting_payment", PaymentPending),
		("بانتظار الدفع", PaymentPending),
		("processing", Processing),
		("in_progress", Processing),
		("قيد المعالجة", Processing),
		("provider_received", ProviderReceived),
		("تم الاستلام من المزود", ProviderReceived),
		("ready_for_pickup", ReadyForPickup),
		("جاهز للاستلام", ReadyForPickup),
		("shipped", Shipped),
		("تم الشحن", Shipped),
		("out_for_delivery", OutForDelivery),
		("خرج للتوصيل", OutForDelivery),
		("delivered", Delivered),
		("تم التوصيل", Delivered),
		("completed", Completed),
		("مكتمل", Completed),
		("cancelled", Cancelled),
		("canceled", Cancelled),
		("ملغي", Cancelled),
	])
});

impl OrderStatus {
	/// Returns the canonical string representation of the status.
	///
	/// This is what the client writes back to the wire and to storage.
	/// Unknown statuses return their raw wire string.
	pub fn as_str(&self) -> &str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Quoted => "quoted",
			OrderStatus::PaymentPending => "payment_pending",
			OrderStatus::Processing => "processing",
			OrderStatus::ProviderReceived => "provider_received",
			OrderStatus::ReadyForPickup => "ready_for_pickup",
			OrderStatus::Shipped => "shipped",
			OrderStatus::OutForDelivery => "out_for_delivery",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::Unknown(raw) => raw,
		}
	}

	/// Normalizes a wire value to its canonical status.
	///
	/// Never fails: values outside the alias table come back as
	/// [`OrderStatus::Unknown`] carrying the trimmed raw string.
	pub fn from_wire(raw: &str) -> Self {
		let trimmed = raw.trim();
		if let Some(status) = ALIASES.get(trimmed) {
			return status.clone();
		}
		let lower = trimmed.to_ascii_lowercase();
		if let Some(status) = ALIASES.get(lower.as_str()) {
			return status.clone();
		}
		OrderStatus::Unknown(trimmed.to_string())
	}

	/// Returns true if no transition out of this status is permitted.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			OrderStatus::Delivered | OrderStatus::Completed | OrderStatus::Cancelled
		)
	}

	/// Returns the presentation label for this status.
	///
	/// Unknown statuses get the default style rather than an error, so a
	/// backend rollout of a new status never breaks rendering.
	pub fn label(&self) -> StatusLabel {
		match self {
			OrderStatus::Pending => StatusLabel::new("Pending", "#f59e0b"),
			OrderStatus::Quoted => StatusLabel::new("Quoted", "#3b82f6"),
			OrderStatus::PaymentPending => StatusLabel::new("Payment pending", "#f97316"),
			OrderStatus::Processing => StatusLabel::new("Processing", "#8b5cf6"),
			OrderStatus::ProviderReceived => StatusLabel::new("Handed to courier", "#06b6d4"),
			OrderStatus::ReadyForPickup => StatusLabel::new("Ready for pickup", "#06b6d4"),
			OrderStatus::Shipped => StatusLabel::new("Shipped", "#0ea5e9"),
			OrderStatus::OutForDelivery => StatusLabel::new("Out for delivery", "#0284c7"),
			OrderStatus::Delivered => StatusLabel::new("Delivered", "#22c55e"),
			OrderStatus::Completed => StatusLabel::new("Completed", "#16a34a"),
			OrderStatus::Cancelled => StatusLabel::new("Cancelled", "#ef4444"),
			OrderStatus::Unknown(raw) => StatusLabel {
				text: raw.clone(),
				color: StatusLabel::DEFAULT_COLOR,
			},
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for OrderStatus {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for OrderStatus {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Ok(OrderStatus::from_wire(&raw))
	}
}

/// Display text and color for rendering a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLabel {
	/// Human-readable status text.
	pub text: String,
	/// Hex color associated with the status.
	pub color: &'static str,
}

impl StatusLabel {
	/// Neutral gray used for statuses outside the alias table.
	pub const DEFAULT_COLOR: &'static str = "#6b7280";

	fn new(text: &str, color: &'static str) -> Self {
		Self {
			text: text.to_string(),
			color,
		}
	}
}
