//! Order lifecycle rules for the parts-client system.
//!
//! This crate holds the pure domain rules of the order lifecycle: the
//! status-transition table parameterized by delivery method, and the
//! client-side validation of provider quote drafts. It deliberately has no
//! I/O; the engine consults these rules before any backend call so an
//! invalid action is rejected without touching the network.

pub mod flow;
pub mod quote;

pub use flow::{
	allowed_next, ensure_transition, is_valid_transition, next_fulfillment_step, FlowError,
};
pub use quote::{validate_draft, QuoteError, ValidatedQuote};
