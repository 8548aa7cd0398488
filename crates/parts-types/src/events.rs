//! Event types for engine/consumer communication and real-time payloads.
//!
//! Two event families live here: [`NotificationEvent`], the wire payload
//! delivered over the per-user pub/sub channel, and [`ClientEvent`], the
//! in-process events the engine publishes on its event bus for view-layer
//! consumers. Notification types are classified through a discriminator
//! table; unrecognized types are ignored rather than erroring so backend
//! rollouts never break deployed clients.

use crate::order::OrderProjection;
use crate::status::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Push notification payload delivered over a private channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
	/// Discriminator naming the notification type.
	#[serde(rename = "type")]
	pub kind: String,
	/// Optional display title.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	/// Optional display body.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub body: Option<String>,
	/// Order the notification refers to, when applicable.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_number: Option<String>,
	/// Additional type-specific payload, left opaque.
	#[serde(default)]
	pub data: serde_json::Value,
}

/// Which cached read projection a notification invalidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefetchKind {
	/// Refetch the open-orders projection.
	OpenOrders,
	/// Refetch the provider's bid projection.
	MyBids,
	/// Refetch the accepted-orders projection.
	AcceptedOrders,
	/// Refetch the wallet snapshot.
	Wallet,
}

impl RefetchKind {
	/// Maps refetch kinds that target an order projection to it.
	/// Wallet refetches have no projection.
	pub fn projection(&self) -> Option<OrderProjection> {
		match self {
			RefetchKind::OpenOrders => Some(OrderProjection::Open),
			RefetchKind::MyBids => Some(OrderProjection::MyBids),
			RefetchKind::AcceptedOrders => Some(OrderProjection::Accepted),
			RefetchKind::Wallet => None,
		}
	}
}

impl fmt::Display for RefetchKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RefetchKind::OpenOrders => write!(f, "open_orders"),
			RefetchKind::MyBids => write!(f, "my_bids"),
			RefetchKind::AcceptedOrders => write!(f, "accepted_orders"),
			RefetchKind::Wallet => write!(f, "wallet"),
		}
	}
}

/// What the client should do with a received notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
	/// Schedule a coalesced refetch of the given projection.
	Refetch(RefetchKind),
	/// Surface the notification text only; no data changed.
	ToastOnly,
	/// Unrecognized type; drop silently.
	Ignore,
}

impl NotificationEvent {
	/// Classifies the notification by its type discriminator.
	///
	/// The table below is the only place notification types are
	/// interpreted. Types not listed map to [`NotificationAction::Ignore`].
	pub fn action(&self) -> NotificationAction {
		match self.kind.as_str() {
			"NEW_ORDER" | "ORDER_UPDATED" | "ORDER_REOPENED" => {
				NotificationAction::Refetch(RefetchKind::OpenOrders)
			}
			"OFFER_ACCEPTED_PROVIDER_WIN" | "OFFER_ACCEPTED_PROVIDER_LOSS" | "OFFER_EXPIRED" => {
				NotificationAction::Refetch(RefetchKind::MyBids)
			}
			"ORDER_STATUS_UPDATED" | "ORDER_CANCELLED" => {
				NotificationAction::Refetch(RefetchKind::AcceptedOrders)
			}
			"WALLET_CREDITED" | "WITHDRAWAL_STATUS_UPDATED" => {
				NotificationAction::Refetch(RefetchKind::Wallet)
			}
			"ANNOUNCEMENT" => NotificationAction::ToastOnly,
			_ => NotificationAction::Ignore,
		}
	}
}

/// Severity of a toast surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
	Info,
	Error,
}

/// User-facing, non-blocking message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toast {
	/// Message severity.
	pub level: ToastLevel,
	/// Message text.
	pub message: String,
}

impl Toast {
	pub fn info(message: impl Into<String>) -> Self {
		Self {
			level: ToastLevel::Info,
			message: message.into(),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			level: ToastLevel::Error,
			message: message.into(),
		}
	}
}

/// Main event type published on the engine's event bus.
///
/// Events are categorized by the subsystem that produces them, allowing
/// view-layer consumers to filter and handle specific event types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientEvent {
	/// Events from order cache and lifecycle operations.
	Order(OrderEvent),
	/// Events from wallet operations.
	Wallet(WalletEvent),
	/// User-facing messages (errors, announcements).
	Toast(Toast),
}

/// Events related to order cache and lifecycle operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A projection snapshot was replaced with fresh server state.
	ProjectionRefreshed {
		projection: OrderProjection,
		count: usize,
	},
	/// A quote was accepted by the backend and appended to the cache.
	QuoteSubmitted {
		order_number: String,
		quote_id: String,
	},
	/// An order moved to a new status, confirmed by refetch.
	StatusChanged {
		order_number: String,
		status: OrderStatus,
	},
}

/// Events related to wallet operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalletEvent {
	/// The wallet snapshot was replaced with fresh server state.
	Refreshed { balance: Decimal },
	/// A withdrawal request was created by the backend.
	WithdrawalRequested { id: String, amount: Decimal },
}

#[cfg(test)]
mod tests {
	use super::*;

	fn event(kind: &str) -> NotificationEvent {
		NotificationEvent {
			kind: kind.to_string(),
			title: None,
			body: None,
			order_number: None,
			data: serde_json::Value::Null,
		}
	}

	#[test]
	fn test_known_types_classify_to_refetches() {
		assert_eq!(
			event("NEW_ORDER").action(),
			NotificationAction::Refetch(RefetchKind::OpenOrders)
		);
		assert_eq!(
			event("OFFER_ACCEPTED_PROVIDER_WIN").action(),
			NotificationAction::Refetch(RefetchKind::MyBids)
		);
		assert_eq!(
			event("ORDER_STATUS_UPDATED").action(),
			NotificationAction::Refetch(RefetchKind::AcceptedOrders)
		);
		assert_eq!(
			event("WALLET_CREDITED").action(),
			NotificationAction::Refetch(RefetchKind::Wallet)
		);
	}

	#[test]
	fn test_unknown_types_are_ignored_not_errors() {
		assert_eq!(event("SOMETHING_NEW").action(), NotificationAction::Ignore);
		assert_eq!(event("").action(), NotificationAction::Ignore);
	}

	#[test]
	fn test_announcements_are_toast_only() {
		assert_eq!(event("ANNOUNCEMENT").action(), NotificationAction::ToastOnly);
	}

	#[test]
	fn test_notification_parses_with_type_discriminator() {
		let json = r#"{"type": "NEW_ORDER", "orderNumber": "ORD-7"}"#;
		let n: NotificationEvent = serde_json::from_str(json).unwrap();
		assert_eq!(n.kind, "NEW_ORDER");
		assert_eq!(n.order_number.as_deref(), Some("ORD-7"));
		assert_eq!(n.data, serde_json::Value::Null);
	}
}
