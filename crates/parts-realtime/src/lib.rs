//! Real-time notification module for the parts-client system.
//!
//! This module handles the subscription side of the backend's pub/sub
//! surface: each signed-in account listens on a private channel keyed by
//! its identity, receives JSON notification payloads, and forwards them to
//! the engine for classification. Listeners are explicitly started and
//! stopped so a view unmount or identity change never leaves a task
//! acting on a stale channel. The [`debounce`] module provides the
//! coalescing primitive that keeps bursts of identical notifications from
//! turning into request storms.

use async_trait::async_trait;
use parts_types::NotificationEvent;
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod debounce;

/// Re-export implementations
pub mod implementations {
	pub mod channel;
	pub mod polling;
}

/// Event name carried by notification payloads on private channels.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Errors that can occur during real-time operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
	/// Error that occurs when connecting to the notification source fails.
	#[error("Connection error: {0}")]
	Connection(String),
	/// Error that occurs when trying to start an already active listener.
	#[error("Already listening")]
	AlreadyListening,
	/// Error that occurs when parsing a notification payload.
	#[error("Parse error: {0}")]
	Parse(String),
}

/// A private notification channel bound to one identity.
///
/// Channel names follow the backend convention `provider.{id}` /
/// `user.{id}`; nothing else may construct a name by hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel(String);

impl Channel {
	/// Channel for a provider account.
	pub fn provider(id: &str) -> Self {
		Self(format!("provider.{}", id))
	}

	/// Channel for a customer/admin user account.
	pub fn user(id: &str) -> Self {
		Self(format!("user.{}", id))
	}

	/// Returns the wire name of the channel.
	pub fn name(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for Channel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Trait defining the interface for notification sources.
///
/// Implementations deliver [`NotificationEvent`]s for one channel through
/// the provided sender until stopped. Stopping must tear down any
/// background task so no event is delivered afterwards.
#[async_trait]
pub trait RealtimeInterface: Send + Sync {
	/// Starts listening on the given channel.
	///
	/// Received notifications are sent through the provided channel. The
	/// implementation keeps listening until `stop_listening` is called or
	/// an unrecoverable error occurs.
	async fn start_listening(
		&self,
		channel: &Channel,
		sender: mpsc::UnboundedSender<NotificationEvent>,
	) -> Result<(), RealtimeError>;

	/// Stops listening and tears down background tasks.
	async fn stop_listening(&self) -> Result<(), RealtimeError>;
}

/// Type alias for realtime source factory functions.
pub type RealtimeFactory = fn(&toml::Value) -> Result<Box<dyn RealtimeInterface>, RealtimeError>;

/// Get all registered realtime implementations.
pub fn get_all_implementations() -> Vec<(&'static str, RealtimeFactory)> {
	use implementations::{channel, polling};

	vec![
		("polling", polling::create_source as RealtimeFactory),
		("channel", channel::create_source as RealtimeFactory),
	]
}

/// Service that manages multiple notification sources.
///
/// All sources feed the same sender, so the engine consumes one stream
/// regardless of how many transports are configured.
pub struct RealtimeService {
	/// Collection of notification sources to listen with.
	sources: Vec<Box<dyn RealtimeInterface>>,
}

impl RealtimeService {
	/// Creates a new RealtimeService with the specified sources.
	pub fn new(sources: Vec<Box<dyn RealtimeInterface>>) -> Self {
		Self { sources }
	}

	/// Starts listening on all configured sources.
	///
	/// If any source fails to start, the already started ones are stopped
	/// again so no partial subscription survives.
	pub async fn start_all(
		&self,
		channel: &Channel,
		sender: mpsc::UnboundedSender<NotificationEvent>,
	) -> Result<(), RealtimeError> {
		for (index, source) in self.sources.iter().enumerate() {
			if let Err(e) = source.start_listening(channel, sender.clone()).await {
				for started in &self.sources[..index] {
					let _ = started.stop_listening().await;
				}
				return Err(e);
			}
		}
		Ok(())
	}

	/// Stops listening on all sources.
	///
	/// All sources are attempted even if some fail; the first error is
	/// returned.
	pub async fn stop_all(&self) -> Result<(), RealtimeError> {
		let mut first_error = None;
		for source in &self.sources {
			if let Err(e) = source.stop_listening().await {
				if first_error.is_none() {
					first_error = Some(e);
				}
			}
		}
		match first_error {
			Some(e) => Err(e),
			None => Ok(()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_channel_naming_convention() {
		assert_eq!(Channel::provider("42").name(), "provider.42");
		assert_eq!(Channel::user("7").name(), "user.7");
	}
}
