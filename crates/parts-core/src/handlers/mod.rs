//! Handlers driving the order lifecycle against the backend.
//!
//! Each handler owns one slice of the flow: projection refreshes and the
//! visibility toggle, quote submission, status transitions, and wallet
//! operations. Handlers validate locally first, call the backend second,
//! and reconcile the cache last; a request that the rules already reject
//! never leaves the process.

use parts_api::BackendError;
use parts_order::{FlowError, QuoteError};
use thiserror::Error;

pub mod orders;
pub mod quotes;
pub mod status;
pub mod wallet;

pub use orders::{OrdersHandler, RefreshOutcome};
pub use quotes::QuotesHandler;
pub use status::StatusHandler;
pub use wallet::WalletHandler;

/// Errors that can occur during handler operations.
#[derive(Debug, Error)]
pub enum HandlerError {
	/// The order is not present in any cached projection.
	#[error("order {0} is not in the local cache")]
	UnknownOrder(String),
	/// The requested status transition is not in the transition table.
	#[error(transparent)]
	Flow(#[from] FlowError),
	/// The quote draft failed client-side validation.
	#[error(transparent)]
	Quote(#[from] QuoteError),
	/// The backend call failed; the cache keeps its last-known-good state.
	#[error(transparent)]
	Backend(#[from] BackendError),
	/// The order has no forward fulfillment step in its current status.
	#[error("order {0} has no fulfillment step to advance")]
	NothingToAdvance(String),
	/// The withdrawal request failed the client-side precheck.
	#[error("invalid withdrawal: {0}")]
	InvalidWithdrawal(String),
}
