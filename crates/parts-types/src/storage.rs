//! Storage namespace keys for the key/value storage service.
//!
//! Keys are composed as `namespace:id`; this enum is the single list of
//! namespaces so callers cannot drift on spelling.

/// Namespaces used by the storage service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
	/// Last-known-good projection snapshots, keyed by projection name.
	Orders,
	/// Previously uploaded media bundles, keyed by entity id.
	Media,
	/// Cached wallet snapshot, keyed by provider id.
	Wallet,
}

impl StoreKey {
	/// Returns the namespace string used to compose storage keys.
	pub fn as_str(&self) -> &'static str {
		match self {
			StoreKey::Orders => "orders",
			StoreKey::Media => "media",
			StoreKey::Wallet => "wallet",
		}
	}

	/// Returns every namespace, for per-namespace configuration lookups.
	pub fn all() -> [StoreKey; 3] {
		[StoreKey::Orders, StoreKey::Media, StoreKey::Wallet]
	}
}

impl std::str::FromStr for StoreKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(StoreKey::Orders),
			"media" => Ok(StoreKey::Media),
			"wallet" => Ok(StoreKey::Wallet),
			_ => Err(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_namespaces_are_distinct_and_parse_back() {
		for key in StoreKey::all() {
			assert_eq!(key.as_str().parse::<StoreKey>(), Ok(key));
		}
		assert!("nonsense".parse::<StoreKey>().is_err());
	}
}
