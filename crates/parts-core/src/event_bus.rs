//! Event bus for engine-to-view communication.
//!
//! A broadcast channel carrying [`ClientEvent`]s. Every subscriber gets
//! every event published after it subscribed; slow subscribers lag and
//! lose the oldest events rather than blocking the engine.

use parts_types::ClientEvent;
use tokio::sync::broadcast;

/// Broadcast bus for client events.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<ClientEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given channel capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Returns the number of subscribers the event reached. Publishing
	/// with no subscribers is an error at the channel level but not for
	/// the engine; callers discard the result with `.ok()`.
	pub fn publish(
		&self,
		event: ClientEvent,
	) -> Result<usize, broadcast::error::SendError<ClientEvent>> {
		self.sender.send(event)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use parts_types::Toast;

	#[tokio::test]
	async fn test_subscribers_receive_published_events() {
		let bus = EventBus::new(16);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();

		bus.publish(ClientEvent::Toast(Toast::info("hello"))).ok();

		let expected = ClientEvent::Toast(Toast::info("hello"));
		assert_eq!(first.recv().await.unwrap(), expected);
		assert_eq!(second.recv().await.unwrap(), expected);
	}

	#[tokio::test]
	async fn test_publish_without_subscribers_is_harmless() {
		let bus = EventBus::new(16);
		assert!(bus.publish(ClientEvent::Toast(Toast::info("nobody"))).is_err());
	}
}
