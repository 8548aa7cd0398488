//! In-process notification source.
//!
//! Delivers notifications injected from the same process, used by tests
//! and local development where no backend pub/sub is available. The
//! injector half can be cloned and handed to whatever drives the
//! scenario; the source half behaves exactly like a transport-backed
//! listener, including teardown on stop.

use crate::{Channel, RealtimeError, RealtimeInterface};
use async_trait::async_trait;
use parts_types::NotificationEvent;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Injects notifications into a paired [`InProcessSource`].
#[derive(Clone)]
pub struct Injector {
	tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl Injector {
	/// Injects one notification. Returns false when the paired source was
	/// dropped or stopped.
	pub fn inject(&self, event: NotificationEvent) -> bool {
		self.tx.send(event).is_ok()
	}
}

/// In-process implementation of the realtime interface.
pub struct InProcessSource {
	inbox: Mutex<Option<mpsc::UnboundedReceiver<NotificationEvent>>>,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl InProcessSource {
	/// Creates a source together with its injector.
	pub fn pair() -> (Self, Injector) {
		let (tx, rx) = mpsc::unbounded_channel();
		(
			Self {
				inbox: Mutex::new(Some(rx)),
				task: Mutex::new(None),
			},
			Injector { tx },
		)
	}

	/// Creates a source that never emits, for configurations that want
	/// the realtime machinery wired but have nothing to inject.
	pub fn idle() -> Self {
		let (source, _injector) = Self::pair();
		source
	}
}

#[async_trait]
impl RealtimeInterface for InProcessSource {
	async fn start_listening(
		&self,
		channel: &Channel,
		sender: mpsc::UnboundedSender<NotificationEvent>,
	) -> Result<(), RealtimeError> {
		let mut task = self.task.lock().await;
		if task.is_some() {
			return Err(RealtimeError::AlreadyListening);
		}

		let mut inbox = self
			.inbox
			.lock()
			.await
			.take()
			.ok_or_else(|| RealtimeError::Connection("source already consumed".into()))?;

		let channel_name = channel.name().to_string();
		let handle = tokio::spawn(async move {
			while let Some(event) = inbox.recv().await {
				if sender.send(event).is_err() {
					break;
				}
			}
			tracing::debug!(channel = %channel_name, "In-process source drained");
		});

		*task = Some(handle);
		Ok(())
	}

	async fn stop_listening(&self) -> Result<(), RealtimeError> {
		let mut task = self.task.lock().await;
		if let Some(handle) = task.take() {
			handle.abort();
		}
		Ok(())
	}
}

/// Factory function to create an idle in-process source.
///
/// Configuration parameters:
/// - None. Injector-driven sources are constructed in code via
///   [`InProcessSource::pair`].
pub fn create_source(_config: &toml::Value) -> Result<Box<dyn RealtimeInterface>, RealtimeError> {
	Ok(Box::new(InProcessSource::idle()))
}
