//! Client-side validation of provider quote drafts.
//!
//! A draft is validated in full before any network call: an invalid price
//! never leaves the process. Prices are entered as floats and converted to
//! [`Decimal`] here, which rejects NaN and infinities outright; the
//! remaining rule is non-negativity. Providers may quote the same order
//! any number of times while it is still open; each submission is a new
//! quote, never a mutation of an earlier one.

use parts_types::{OrderStatus, QuoteDraft};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors produced by quote draft validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuoteError {
	/// Price is NaN, infinite, or not representable.
	#[error("price is not a finite number")]
	PriceNotFinite,
	/// Price is below zero.
	#[error("price must not be negative, got {0}")]
	NegativePrice(Decimal),
	/// Notes exceed the backend's column limit.
	#[error("notes exceed {max} characters")]
	NotesTooLong { max: usize },
	/// The order no longer accepts quotes in its current status.
	#[error("order in status {0} does not accept quotes")]
	OrderNotQuotable(OrderStatus),
}

/// Longest notes value the backend accepts.
const MAX_NOTES_LEN: usize = 2000;

/// A draft that passed validation, with the price normalized to a
/// [`Decimal`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuote {
	pub price: Decimal,
	pub draft: QuoteDraft,
}

/// Validates a quote draft against an order's current status.
///
/// Quotes are accepted while the order is `Pending` or already `Quoted`
/// (an additional offer); any other status rejects the draft before a
/// request is made.
pub fn validate_draft(draft: &QuoteDraft, status: &OrderStatus) -> Result<ValidatedQuote, QuoteError> {
	match status {
		OrderStatus::Pending | OrderStatus::Quoted => {}
		other => return Err(QuoteError::OrderNotQuotable(other.clone())),
	}

	let price = Decimal::from_f64_retain(draft.price).ok_or(QuoteError::PriceNotFinite)?;
	if price.is_sign_negative() && !price.is_zero() {
		return Err(QuoteError::NegativePrice(price));
	}

	if let Some(notes) = &draft.notes {
		if notes.chars().count() > MAX_NOTES_LEN {
			return Err(QuoteError::NotesTooLong { max: MAX_NOTES_LEN });
		}
	}

	Ok(ValidatedQuote {
		price,
		draft: draft.clone(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use parts_types::{PartCondition, PartSizeCategory};

	fn draft(price: f64) -> QuoteDraft {
		QuoteDraft {
			price,
			part_condition: PartCondition::New,
			part_size: PartSizeCategory::Small,
			notes: None,
		}
	}

	#[test]
	fn test_valid_price_normalizes_exactly() {
		let validated = validate_draft(&draft(150.5), &OrderStatus::Pending).unwrap();
		assert_eq!(validated.price, Decimal::new(1505, 1));
	}

	#[test]
	fn test_zero_price_is_allowed() {
		assert!(validate_draft(&draft(0.0), &OrderStatus::Pending).is_ok());
	}

	#[test]
	fn test_negative_price_rejected() {
		assert!(matches!(
			validate_draft(&draft(-1.0), &OrderStatus::Pending),
			Err(QuoteError::NegativePrice(_))
		));
	}

	#[test]
	fn test_nan_and_infinity_rejected() {
		assert_eq!(
			validate_draft(&draft(f64::NAN), &OrderStatus::Pending),
			Err(QuoteError::PriceNotFinite)
		);
		assert_eq!(
			validate_draft(&draft(f64::INFINITY), &OrderStatus::Pending),
			Err(QuoteError::PriceNotFinite)
		);
	}

	#[test]
	fn test_requoting_allowed_while_quoted() {
		assert!(validate_draft(&draft(99.0), &OrderStatus::Quoted).is_ok());
	}

	#[test]
	fn test_closed_orders_reject_quotes() {
		for status in [
			OrderStatus::Processing,
			OrderStatus::Delivered,
			OrderStatus::Cancelled,
			OrderStatus::Unknown("archived".to_string()),
		] {
			assert!(matches!(
				validate_draft(&draft(10.0), &status),
				Err(QuoteError::OrderNotQuotable(_))
			));
		}
	}

	#[test]
	fn test_overlong_notes_rejected() {
		let mut d = draft(10.0);
		d.notes = Some("x".repeat(2001));
		assert_eq!(
			validate_draft(&d, &OrderStatus::Pending),
			Err(QuoteError::NotesTooLong { max: 2000 })
		);
	}
}
