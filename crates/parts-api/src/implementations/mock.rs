//! Stateful mock backend for tests and local development.
//!
//! Behaves like a tiny in-process marketplace: seeded orders are served
//! per projection, quote submissions append server-shaped quotes, and
//! status updates mutate the stored orders. Every call is recorded by
//! operation name so tests can assert that rejected actions never reached
//! the network, and the whole backend can be switched into a failing mode
//! to exercise error paths.

use crate::{BackendError, BackendInterface, QuoteSubmission};
use async_trait::async_trait;
use chrono::Utc;
use parts_types::{
	Order, OrderProjection, OrderStatus, Quote, WalletSnapshot, WithdrawalRequest,
	WithdrawalStatus,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Shared mutable state behind the mock.
struct MockState {
	orders: HashMap<OrderProjection, Vec<Order>>,
	wallet: WalletSnapshot,
	withdrawals: Vec<WithdrawalRequest>,
	calls: HashMap<&'static str, usize>,
	failing: bool,
	latency: Option<Duration>,
}

/// Mock implementation of the backend interface.
///
/// Clones share state, so a test can keep a handle for seeding and
/// assertions while the engine owns another.
#[derive(Clone)]
pub struct MockBackend {
	provider_id: String,
	state: Arc<Mutex<MockState>>,
}

impl MockBackend {
	/// Creates an empty mock backend acting for the given provider.
	pub fn new(provider_id: impl Into<String>) -> Self {
		Self {
			provider_id: provider_id.into(),
			state: Arc::new(Mutex::new(MockState {
				orders: HashMap::new(),
				wallet: WalletSnapshot {
					balance: Decimal::ZERO,
					updated_at: Utc::now(),
				},
				withdrawals: Vec::new(),
				calls: HashMap::new(),
				failing: false,
				latency: None,
			})),
		}
	}

	/// Replaces the stored orders for a projection.
	pub async fn seed_orders(&self, projection: OrderProjection, orders: Vec<Order>) {
		self.state.lock().await.orders.insert(projection, orders);
	}

	/// Replaces the stored wallet snapshot.
	pub async fn seed_wallet(&self, balance: Decimal) {
		let mut state = self.state.lock().await;
		state.wallet = WalletSnapshot {
			balance,
			updated_at: Utc::now(),
		};
	}

	/// Switches the backend into (or out of) a failing mode where every
	/// operation returns a network error without touching state.
	pub async fn set_failing(&self, failing: bool) {
		self.state.lock().await.failing = failing;
	}

	/// Adds artificial latency before every operation, for tests that
	/// need a request to still be in flight while something else happens.
	pub async fn set_latency(&self, latency: Option<Duration>) {
		self.state.lock().await.latency = latency;
	}

	/// Sleeps outside the state lock when latency is configured.
	async fn simulate_latency(&self) {
		let latency = self.state.lock().await.latency;
		if let Some(latency) = latency {
			tokio::time::sleep(latency).await;
		}
	}

	/// Returns how many times the named operation was invoked.
	pub async fn calls(&self, operation: &str) -> usize {
		self.state
			.lock()
			.await
			.calls
			.get(operation)
			.copied()
			.unwrap_or(0)
	}

	/// Returns the total number of operations invoked.
	pub async fn total_calls(&self) -> usize {
		self.state.lock().await.calls.values().sum()
	}

	fn record(state: &mut MockState, operation: &'static str) -> Result<(), BackendError> {
		*state.calls.entry(operation).or_insert(0) += 1;
		if state.failing {
			return Err(BackendError::Network("mock backend offline".into()));
		}
		Ok(())
	}

	fn find_order_mut<'a>(
		state: &'a mut MockState,
		order_number: &str,
	) -> Option<&'a mut Order> {
		state
			.orders
			.values_mut()
			.flat_map(|orders| orders.iter_mut())
			.find(|order| order.order_number == order_number)
	}
}

#[async_trait]
impl BackendInterface for MockBackend {
	async fn fetch_orders(&self, projection: OrderProjection) -> Result<Vec<Order>, BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "fetch_orders")?;
		Ok(state.orders.get(&projection).cloned().unwrap_or_default())
	}

	async fn submit_quote(
		&self,
		order_number: &str,
		submission: &QuoteSubmission,
	) -> Result<Quote, BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "submit_quote")?;

		let quote = Quote {
			id: Uuid::new_v4().to_string(),
			order_number: order_number.to_string(),
			provider_id: submission.provider_id.clone(),
			price: submission.price,
			part_condition: submission.part_condition,
			part_size: submission.part_size,
			notes: submission.notes.clone(),
			media: submission.media.clone(),
			created_at: Utc::now(),
		};

		// Mirror what the server does: record the quote on the order and
		// advance a pending order to quoted.
		if let Some(order) = Self::find_order_mut(&mut state, order_number) {
			order.quotes.push(quote.clone());
			if order.status == OrderStatus::Pending {
				order.status = OrderStatus::Quoted;
			}
			order.updated_at = Utc::now();
		}

		Ok(quote)
	}

	async fn update_status(
		&self,
		order_number: &str,
		next: &OrderStatus,
	) -> Result<Order, BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "update_status")?;

		let order = Self::find_order_mut(&mut state, order_number).ok_or(BackendError::Http {
			status: 404,
			message: format!("order {} not found", order_number),
		})?;

		order.status = next.clone();
		order.updated_at = Utc::now();
		Ok(order.clone())
	}

	async fn set_order_visibility(
		&self,
		order_number: &str,
		hidden: bool,
	) -> Result<(), BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "set_order_visibility")?;

		let order = Self::find_order_mut(&mut state, order_number).ok_or(BackendError::Http {
			status: 404,
			message: format!("order {} not found", order_number),
		})?;
		order.hidden = hidden;
		order.updated_at = Utc::now();
		Ok(())
	}

	async fn fetch_wallet(&self) -> Result<WalletSnapshot, BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "fetch_wallet")?;
		Ok(state.wallet.clone())
	}

	async fn fetch_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "fetch_withdrawals")?;
		Ok(state.withdrawals.clone())
	}

	async fn request_withdrawal(&self, amount: Decimal) -> Result<WithdrawalRequest, BackendError> {
		self.simulate_latency().await;
		let mut state = self.state.lock().await;
		Self::record(&mut state, "request_withdrawal")?;

		if amount > state.wallet.balance {
			return Err(BackendError::Http {
				status: 422,
				message: "amount exceeds balance".into(),
			});
		}

		let request = WithdrawalRequest {
			id: Uuid::new_v4().to_string(),
			provider_id: self.provider_id.clone(),
			amount,
			status: WithdrawalStatus::Pending,
			created_at: Utc::now(),
		};
		state.withdrawals.push(request.clone());
		Ok(request)
	}
}

/// Factory function to create a mock backend from configuration.
///
/// Configuration parameters:
/// - `provider_id`: acting provider id (default: "mock-provider")
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn BackendInterface>, BackendError> {
	let provider_id = config
		.get("provider_id")
		.and_then(|v| v.as_str())
		.unwrap_or("mock-provider");
	Ok(Box::new(MockBackend::new(provider_id)))
}
