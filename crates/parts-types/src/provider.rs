//! Provider account types and open-order visibility.

use crate::order::Order;
use crate::status::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Role of the signed-in account, gating which lifecycle transitions the
/// client offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Parts vendor advancing fulfillment on won orders.
	Provider,
	/// Marketplace operator with administrative transitions.
	Admin,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Provider => write!(f, "provider"),
			Role::Admin => write!(f, "admin"),
		}
	}
}

/// A parts vendor account that can bid on orders.
///
/// The wallet balance is server-authoritative; the client holds a cached
/// copy refreshed through explicit wallet fetches and never computes it
/// locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
	/// Unique provider identifier.
	pub id: String,
	/// Display name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Cached wallet balance as last reported by the backend.
	pub wallet_balance: Decimal,
	/// Part categories this provider is assigned to, gating which open
	/// orders are visible.
	#[serde(default)]
	pub assigned_categories: HashSet<String>,
}

impl Provider {
	/// Returns true if the order should appear in this provider's open
	/// list: still pending, in an assigned category, and not already
	/// quoted by this provider.
	pub fn sees_open_order(&self, order: &Order) -> bool {
		order.status == OrderStatus::Pending
			&& self.assigned_categories.contains(&order.category)
			&& !order.has_quote_from(&self.id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::order::{DeliveryMethod, PartCondition, PartSizeCategory, Quote};
	use chrono::{TimeZone, Utc};

	fn provider(categories: &[&str]) -> Provider {
		Provider {
			id: "p1".to_string(),
			name: None,
			wallet_balance: Decimal::ZERO,
			assigned_categories: categories.iter().map(|c| c.to_string()).collect(),
		}
	}

	fn order(category: &str, status: OrderStatus) -> Order {
		Order {
			order_number: "ORD-1".to_string(),
			status,
			category: category.to_string(),
			form_data: serde_json::Value::Null,
			quotes: vec![],
			accepted_quote_id: None,
			delivery_method: DeliveryMethod::Pickup,
			hidden: false,
			customer_name: None,
			customer_phone: None,
			customer_city: None,
			created_at: Utc.timestamp_opt(0, 0).unwrap(),
			updated_at: Utc.timestamp_opt(0, 0).unwrap(),
		}
	}

	#[test]
	fn test_visibility_requires_pending_and_assigned_category() {
		let p = provider(&["engine", "brakes"]);
		assert!(p.sees_open_order(&order("engine", OrderStatus::Pending)));
		assert!(!p.sees_open_order(&order("tires", OrderStatus::Pending)));
		assert!(!p.sees_open_order(&order("engine", OrderStatus::Quoted)));
	}

	#[test]
	fn test_already_quoted_orders_are_hidden() {
		let p = provider(&["engine"]);
		let mut o = order("engine", OrderStatus::Pending);
		o.quotes.push(Quote {
			id: "q1".to_string(),
			order_number: "ORD-1".to_string(),
			provider_id: "p1".to_string(),
			price: Decimal::ONE,
			part_condition: PartCondition::Used,
			part_size: PartSizeCategory::Medium,
			notes: None,
			media: None,
			created_at: Utc.timestamp_opt(0, 0).unwrap(),
		});
		assert!(!p.sees_open_order(&o));
	}
}
