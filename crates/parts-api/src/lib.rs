//! Backend API module for the parts-client system.
//!
//! This module is the single boundary to the marketplace backend. It
//! provides the [`BackendInterface`] trait that all transport
//! implementations satisfy, an HTTP implementation speaking the REST API,
//! and a stateful mock used by tests and local development. The backend is
//! always the authority; everything returned here is already normalized to
//! canonical enums and checked against the order data invariants, so the
//! rest of the client never sees a raw wire variant.

use async_trait::async_trait;
use parts_types::{
	Order, OrderProjection, OrderStatus, Quote, WalletSnapshot, WithdrawalRequest,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod mock;
}

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error reported by the backend with an HTTP status.
	#[error("Backend responded {status}: {message}")]
	Http { status: u16, message: String },
	/// Error that occurs when decoding a response body.
	#[error("Decode error: {0}")]
	Decode(String),
	/// Error that occurs during configuration handling.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl From<reqwest::Error> for BackendError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			BackendError::Decode(err.to_string())
		} else {
			BackendError::Network(err.to_string())
		}
	}
}

/// Wire request for submitting a quote against an order.
///
/// The price is already validated and normalized; this type never carries
/// a raw float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSubmission {
	/// Provider submitting the quote.
	pub provider_id: String,
	/// Validated, non-negative price.
	pub price: Decimal,
	/// Condition of the offered part.
	pub part_condition: parts_types::PartCondition,
	/// Size class of the offered part.
	pub part_size: parts_types::PartSizeCategory,
	/// Free-form provider notes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Media references to attach (uploaded as multipart parts).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub media: Option<parts_types::MediaBundle>,
}

/// Trait defining the interface to the marketplace backend.
///
/// Implementations handle transport only; normalization happens in the
/// shared types' deserialization and consistency checks happen in
/// [`ApiService`].
#[async_trait]
pub trait BackendInterface: Send + Sync {
	/// Fetches the given order projection for the current account.
	async fn fetch_orders(&self, projection: OrderProjection) -> Result<Vec<Order>, BackendError>;

	/// Submits a quote against an order. Returns the created quote with
	/// its server-generated identifier.
	async fn submit_quote(
		&self,
		order_number: &str,
		submission: &QuoteSubmission,
	) -> Result<Quote, BackendError>;

	/// Requests a status transition. Returns the updated order as the
	/// backend recorded it; the backend may reject transitions the client
	/// considered valid.
	async fn update_status(
		&self,
		order_number: &str,
		next: &OrderStatus,
	) -> Result<Order, BackendError>;

	/// Persists the provider's visibility toggle for an order.
	async fn set_order_visibility(
		&self,
		order_number: &str,
		hidden: bool,
	) -> Result<(), BackendError>;

	/// Fetches the current wallet snapshot.
	async fn fetch_wallet(&self) -> Result<WalletSnapshot, BackendError>;

	/// Fetches the account's withdrawal requests.
	async fn fetch_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, BackendError>;

	/// Creates a withdrawal request for the given amount.
	async fn request_withdrawal(&self, amount: Decimal) -> Result<WithdrawalRequest, BackendError>;
}

/// Type alias for backend factory functions.
pub type BackendFactory = fn(&toml::Value) -> Result<Box<dyn BackendInterface>, BackendError>;

/// Get all registered backend implementations.
///
/// Returns a vector of (name, factory) tuples for all available backend
/// implementations, used by the engine builder to wire the configured
/// transport by name.
pub fn get_all_implementations() -> Vec<(&'static str, BackendFactory)> {
	use implementations::{http, mock};

	vec![
		("http", http::create_backend as BackendFactory),
		("mock", mock::create_backend as BackendFactory),
	]
}

/// High-level API service wrapping a backend implementation.
///
/// Applies the order data invariants to everything fetched: an order whose
/// accepted quote cannot be resolved is dropped with a warning rather than
/// poisoning the cache, and the drop is visible in the logs instead of
/// surfacing as a hard error to the user.
pub struct ApiService {
	backend: Box<dyn BackendInterface>,
}

impl ApiService {
	/// Creates a new ApiService with the specified backend.
	pub fn new(backend: Box<dyn BackendInterface>) -> Self {
		Self { backend }
	}

	/// Fetches a projection and drops orders violating data invariants.
	pub async fn fetch_orders(
		&self,
		projection: OrderProjection,
	) -> Result<Vec<Order>, BackendError> {
		let orders = self.backend.fetch_orders(projection).await?;
		let fetched = orders.len();

		let orders: Vec<Order> = orders
			.into_iter()
			.filter(|order| match order.check_consistency() {
				Ok(()) => true,
				Err(e) => {
					tracing::warn!(
						order_number = %order.order_number,
						error = %e,
						"Dropping inconsistent order from response"
					);
					false
				}
			})
			.collect();

		tracing::debug!(
			projection = %projection,
			fetched,
			kept = orders.len(),
			"Fetched orders"
		);
		Ok(orders)
	}

	/// Submits a quote against an order.
	pub async fn submit_quote(
		&self,
		order_number: &str,
		submission: &QuoteSubmission,
	) -> Result<Quote, BackendError> {
		self.backend.submit_quote(order_number, submission).await
	}

	/// Requests a status transition for an order.
	pub async fn update_status(
		&self,
		order_number: &str,
		next: &OrderStatus,
	) -> Result<Order, BackendError> {
		self.backend.update_status(order_number, next).await
	}

	/// Persists the provider's visibility toggle for an order.
	pub async fn set_order_visibility(
		&self,
		order_number: &str,
		hidden: bool,
	) -> Result<(), BackendError> {
		self.backend.set_order_visibility(order_number, hidden).await
	}

	/// Fetches the current wallet snapshot.
	pub async fn fetch_wallet(&self) -> Result<WalletSnapshot, BackendError> {
		self.backend.fetch_wallet().await
	}

	/// Fetches the account's withdrawal requests.
	pub async fn fetch_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, BackendError> {
		self.backend.fetch_withdrawals().await
	}

	/// Creates a withdrawal request for the given amount.
	pub async fn request_withdrawal(
		&self,
		amount: Decimal,
	) -> Result<WithdrawalRequest, BackendError> {
		self.backend.request_withdrawal(amount).await
	}
}
