//! File-based storage backend implementation.
//!
//! Stores each value as a file under a base directory so the fallback
//! cache (media blob references, last-known-good snapshots) survives
//! restarts. Every file starts with a small fixed header carrying the
//! expiry timestamp; reads of expired files behave like a miss and the
//! periodic cleanup removes them from disk.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use parts_types::StoreKey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

/// Fixed-size file header for TTL support.
///
/// Binary layout (16 bytes total):
/// - bytes 0-3: magic `PCKV`
/// - bytes 4-5: version (u16, little-endian)
/// - bytes 6-7: reserved
/// - bytes 8-15: expiry timestamp (u64, little-endian, Unix seconds, 0 = never)
#[derive(Debug, Clone)]
struct FileHeader {
	version: u16,
	expires_at: u64,
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"PCKV";
	const VERSION: u16 = 1;
	const SIZE: usize = 16;

	/// Creates a new header with the given TTL. A zero TTL means the
	/// entry never expires.
	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0
		} else {
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap_or_default()
				.as_secs()
				.saturating_add(ttl.as_secs())
		};

		Self {
			version: Self::VERSION,
			expires_at,
		}
	}

	/// Serializes the header to bytes.
	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(Self::MAGIC);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[8..16].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes
	}

	/// Deserializes a header from bytes.
	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("file too small for header".into()));
		}
		if &bytes[0..4] != Self::MAGIC {
			return Err(StorageError::Backend("bad magic bytes".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"unsupported file version: {}",
				version
			)));
		}

		let mut expires_bytes = [0u8; 8];
		expires_bytes.copy_from_slice(&bytes[8..16]);

		Ok(Self {
			version,
			expires_at: u64::from_le_bytes(expires_bytes),
		})
	}

	/// Checks if the data has expired.
	fn is_expired(&self) -> bool {
		if self.expires_at == 0 {
			return false;
		}
		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_secs();
		now >= self.expires_at
	}
}

/// Default TTLs per storage namespace.
#[derive(Debug, Clone)]
pub struct TtlConfig {
	ttls: HashMap<StoreKey, Duration>,
}

impl TtlConfig {
	/// Reads `ttl_<namespace>` keys (seconds) from the backend's TOML
	/// table. Missing entries mean no expiry.
	fn from_config(config: &toml::Value) -> Self {
		let mut ttls = HashMap::new();

		if let Some(table) = config.as_table() {
			for store_key in StoreKey::all() {
				let config_key = format!("ttl_{}", store_key.as_str());
				if let Some(secs) = table
					.get(&config_key)
					.and_then(|v| v.as_integer())
					.map(|v| v as u64)
				{
					ttls.insert(store_key, Duration::from_secs(secs));
				}
			}
		}

		Self { ttls }
	}

	fn ttl_for(&self, store_key: StoreKey) -> Duration {
		self.ttls.get(&store_key).copied().unwrap_or(Duration::ZERO)
	}
}

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Default TTLs per namespace.
	ttl_config: TtlConfig,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path
	/// and TTL config.
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':', '\\'], "_");
		self.base_path.join(format!("{}.kv", safe_key))
	}

	/// Resolves the default TTL for a key from its namespace prefix.
	fn ttl_for_key(&self, key: &str) -> Duration {
		let namespace = key.split(':').next().unwrap_or("");
		namespace
			.parse::<StoreKey>()
			.map(|sk| self.ttl_config.ttl_for(sk))
			.unwrap_or(Duration::ZERO)
	}

	async fn cleanup_expired_files(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		let mut entries = fs::read_dir(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("kv")) {
				continue;
			}
			match fs::read(&path).await {
				Ok(data) => {
					let expired = FileHeader::deserialize(&data)
						.map(|header| header.is_expired())
						.unwrap_or(false);
					if expired {
						match fs::remove_file(&path).await {
							Ok(_) => removed += 1,
							Err(e) => {
								tracing::warn!(path = %path.display(), error = %e, "Failed to remove expired file");
							}
						}
					}
				}
				Err(e) => {
					tracing::debug!(path = %path.display(), error = %e, "Skipping unreadable file");
				}
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key);

		let data = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let header = FileHeader::deserialize(&data)?;
		if header.is_expired() {
			return Err(StorageError::NotFound);
		}

		Ok(data[FileHeader::SIZE..].to_vec())
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let ttl = ttl.unwrap_or_else(|| self.ttl_for_key(key));
		let header = FileHeader::new(ttl);

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&header.serialize());
		file_data.extend_from_slice(&value);

		// Write to a temp file then rename so readers never observe a
		// partial value.
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.file_path(key);
		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		match self.get_bytes(key).await {
			Ok(_) => Ok(true),
			Err(StorageError::NotFound) => Ok(false),
			Err(e) => Err(e),
		}
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.cleanup_expired_files().await
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for files (default: "./data/storage")
/// - `ttl_<namespace>`: default TTL in seconds per namespace (0 = never)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage")
		.to_string();

	let ttl_config = TtlConfig::from_config(config);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		ttl_config,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn storage(dir: &tempfile::TempDir) -> FileStorage {
		FileStorage::new(
			dir.path().to_path_buf(),
			TtlConfig {
				ttls: HashMap::new(),
			},
		)
	}

	#[tokio::test]
	async fn test_round_trip_survives_reopen() {
		let dir = tempfile::tempdir().unwrap();

		{
			let s = storage(&dir);
			s.set_bytes("media:ORD-1", b"blob-ref".to_vec(), None)
				.await
				.unwrap();
		}

		let s = storage(&dir);
		assert_eq!(
			s.get_bytes("media:ORD-1").await.unwrap(),
			b"blob-ref".to_vec()
		);
	}

	#[tokio::test]
	async fn test_key_sanitization_keeps_entries_apart() {
		let dir = tempfile::tempdir().unwrap();
		let s = storage(&dir);

		s.set_bytes("orders:a", b"1".to_vec(), None).await.unwrap();
		s.set_bytes("orders:b", b"2".to_vec(), None).await.unwrap();

		assert_eq!(s.get_bytes("orders:a").await.unwrap(), b"1".to_vec());
		assert_eq!(s.get_bytes("orders:b").await.unwrap(), b"2".to_vec());
	}

	#[tokio::test]
	async fn test_expired_file_reads_as_missing_and_is_cleaned() {
		let dir = tempfile::tempdir().unwrap();
		let s = storage(&dir);

		s.set_bytes("media:old", b"x".to_vec(), Some(Duration::from_secs(1)))
			.await
			.unwrap();

		// Rewrite the header with an expiry in the past instead of
		// sleeping through a real TTL.
		let path = s.file_path("media:old");
		let mut data = std::fs::read(&path).unwrap();
		data[8..16].copy_from_slice(&1u64.to_le_bytes());
		std::fs::write(&path, data).unwrap();

		assert!(matches!(
			s.get_bytes("media:old").await,
			Err(StorageError::NotFound)
		));
		assert!(!s.exists("media:old").await.unwrap());

		let removed = s.cleanup_expired().await.unwrap();
		assert_eq!(removed, 1);
		assert!(!path.exists());
	}

	#[tokio::test]
	async fn test_delete_is_idempotent() {
		let dir = tempfile::tempdir().unwrap();
		let s = storage(&dir);
		s.delete("orders:never-written").await.unwrap();
	}
}
