//! Wallet, withdrawal, and transaction record types.
//!
//! Financial records are append-only and server-authoritative: the client
//! only requests creation and reflects server-reported state. Withdrawal
//! statuses arrive in mixed casing and language variants and are folded
//! into one canonical enum on ingest, the same treatment order statuses
//! receive.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Server-reported state of a withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum WithdrawalStatus {
	/// Request created, awaiting admin review.
	Pending,
	/// Request approved and paid out.
	Approved,
	/// Request rejected.
	Rejected,
	/// Wire value not present in the alias table; default rendering.
	Unknown(String),
}

/// Alias table for withdrawal status wire variants. Matched exactly
/// first, then against the ASCII lowercase of the input.
static ALIASES: Lazy<HashMap<&'static str, WithdrawalStatus>> = Lazy::new(|| {
	use WithdrawalStatus::*;
	HashMap::from([
		("pending", Pending),
		("معلق", Pending),
		("قيد الانتظار", Pending),
		("approved", Approved),
		("تمت الموافقة", Approved),
		("موافق عليه", Approved),
		("rejected", Rejected),
		("مرفوض", Rejected),
	])
});

impl WithdrawalStatus {
	/// Returns the canonical string representation of the status.
	pub fn as_str(&self) -> &str {
		match self {
			WithdrawalStatus::Pending => "pending",
			WithdrawalStatus::Approved => "approved",
			WithdrawalStatus::Rejected => "rejected",
			WithdrawalStatus::Unknown(raw) => raw,
		}
	}

	/// Normalizes a wire value to its canonical status. Never fails.
	pub fn from_wire(raw: &str) -> Self {
		let trimmed = raw.trim();
		if let Some(status) = ALIASES.get(trimmed) {
			return status.clone();
		}
		let lower = trimmed.to_ascii_lowercase();
		if let Some(status) = ALIASES.get(lower.as_str()) {
			return status.clone();
		}
		WithdrawalStatus::Unknown(trimmed.to_string())
	}
}

impl fmt::Display for WithdrawalStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Serialize for WithdrawalStatus {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for WithdrawalStatus {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let raw = String::deserialize(deserializer)?;
		Ok(WithdrawalStatus::from_wire(&raw))
	}
}

/// Point-in-time view of the provider's wallet as reported by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
	/// Current balance.
	pub balance: Decimal,
	/// Timestamp when the backend produced this snapshot.
	pub updated_at: DateTime<Utc>,
}

/// A provider's request to withdraw funds from their wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
	/// Unique request identifier.
	pub id: String,
	/// Provider the request belongs to.
	pub provider_id: String,
	/// Requested amount.
	pub amount: Decimal,
	/// Server-reported request state, normalized on ingest.
	pub status: WithdrawalStatus,
	/// Timestamp when the request was created.
	pub created_at: DateTime<Utc>,
}

/// Direction of a wallet ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
	/// Funds added to the wallet (e.g. a completed order payout).
	Credit,
	/// Funds removed from the wallet (e.g. an approved withdrawal).
	Debit,
}

/// An append-only wallet ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
	/// Unique entry identifier.
	pub id: String,
	/// Entry direction.
	pub kind: TransactionKind,
	/// Entry amount, always positive; direction carries the sign.
	pub amount: Decimal,
	/// Optional description (order number, withdrawal id).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	/// Timestamp when the entry was recorded.
	pub created_at: DateTime<Utc>,
}
