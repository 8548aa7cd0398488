//! Order status transition rules.
//!
//! Validates status transitions before any backend call, parameterized by
//! delivery method and account role. The server remains authoritative and
//! may still reject a transition the table allows; the table exists so the
//! client never fires a request it already knows is invalid. Orders move
//! `Pending -> Quoted -> PaymentPending -> Processing`, branch by delivery
//! method into the pickup or shipping leg, and end in a terminal state.

use once_cell::sync::Lazy;
use parts_types::{DeliveryMethod, OrderStatus, Role};
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced by transition validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
	#[error("invalid transition from {from} to {to} ({method}, {role})")]
	InvalidTransition {
		from: OrderStatus,
		to: OrderStatus,
		method: DeliveryMethod,
		role: Role,
	},
}

/// Fulfillment steps a provider may take, keyed by current status.
///
/// The `Processing` successor is the only method-dependent entry; the
/// shipping leg continues through the courier states while the pickup leg
/// goes straight to handover.
static PROVIDER_FLOW: Lazy<HashMap<(OrderStatus, DeliveryMethod), Vec<OrderStatus>>> =
	Lazy::new(|| {
		use DeliveryMethod::*;
		use OrderStatus::*;
		let mut m = HashMap::new();
		m.insert((Processing, Pickup), vec![ReadyForPickup]);
		m.insert((Processing, Shipping), vec![ProviderReceived]);
		m.insert((ReadyForPickup, Pickup), vec![Delivered]);
		m.insert((ProviderReceived, Shipping), vec![Shipped]);
		// Some courier workflows skip the out-for-delivery hop entirely.
		m.insert((Shipped, Shipping), vec![OutForDelivery, Delivered]);
		m.insert((OutForDelivery, Shipping), vec![Delivered]);
		m
	});

/// Administrative transitions, on top of everything a provider may do.
static ADMIN_FLOW: Lazy<HashMap<OrderStatus, Vec<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;
	let mut m = HashMap::new();
	m.insert(Pending, vec![Cancelled]);
	m.insert(Quoted, vec![PaymentPending, Cancelled]);
	m.insert(PaymentPending, vec![Processing, Cancelled]);
	m.insert(Processing, vec![Cancelled]);
	m.insert(Delivered, vec![Completed]);
	m
});

/// Returns the statuses an account may move the order to next.
///
/// `Completed` and `Cancelled` return an empty list for every role, as do
/// statuses outside the alias table. `Delivered` permits only the admin
/// settlement step to `Completed`.
pub fn allowed_next(from: &OrderStatus, method: DeliveryMethod, role: Role) -> Vec<OrderStatus> {
	let mut next: Vec<OrderStatus> = PROVIDER_FLOW
		.get(&(from.clone(), method))
		.cloned()
		.unwrap_or_default();

	if role == Role::Admin {
		if let Some(admin) = ADMIN_FLOW.get(from) {
			for status in admin {
				if !next.contains(status) {
					next.push(status.clone());
				}
			}
		}
	}

	next
}

/// Returns true if the transition is permitted for the role and method.
pub fn is_valid_transition(
	from: &OrderStatus,
	to: &OrderStatus,
	method: DeliveryMethod,
	role: Role,
) -> bool {
	allowed_next(from, method, role).contains(to)
}

/// Validates a transition, producing a [`FlowError`] when it is not in
/// the table.
pub fn ensure_transition(
	from: &OrderStatus,
	to: &OrderStatus,
	method: DeliveryMethod,
	role: Role,
) -> Result<(), FlowError> {
	if is_valid_transition(from, to, method, role) {
		Ok(())
	} else {
		Err(FlowError::InvalidTransition {
			from: from.clone(),
			to: to.clone(),
			method,
			role,
		})
	}
}

/// Derives the single forward fulfillment step a provider dashboard
/// offers for the order's current status, or `None` when the provider has
/// nothing to advance.
pub fn next_fulfillment_step(from: &OrderStatus, method: DeliveryMethod) -> Option<OrderStatus> {
	PROVIDER_FLOW
		.get(&(from.clone(), method))
		.and_then(|next| next.first().cloned())
}
