//! Long-polling notification source.
//!
//! Polls the backend's notification feed for one channel and forwards
//! every payload that parses. The backend holds the request open until
//! events arrive or its own timeout passes, so an idle channel costs one
//! open request rather than a busy loop. Poll failures back off and retry;
//! the listener only dies when explicitly stopped.

use crate::{Channel, RealtimeError, RealtimeInterface, NOTIFICATION_EVENT};
use async_trait::async_trait;
use parts_types::NotificationEvent;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Delay before retrying after a failed poll.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Long-polling implementation of the realtime interface.
pub struct LongPollSource {
	client: Client,
	base_url: String,
	auth_token: Option<String>,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl LongPollSource {
	/// Creates a new LongPollSource against the given backend root URL.
	pub fn new(base_url: String, auth_token: Option<String>) -> Self {
		Self {
			client: Client::new(),
			base_url: base_url.trim_end_matches('/').to_string(),
			auth_token,
			task: Mutex::new(None),
		}
	}

	/// One poll cycle: fetch pending events after the cursor, forward the
	/// ones that parse, and return the advanced cursor.
	async fn poll_once(
		client: &Client,
		url: &str,
		auth_token: &Option<String>,
		cursor: u64,
		sender: &mpsc::UnboundedSender<NotificationEvent>,
	) -> Result<u64, RealtimeError> {
		let mut request = client.get(url).query(&[
			("event", NOTIFICATION_EVENT.to_string()),
			("cursor", cursor.to_string()),
		]);
		if let Some(token) = auth_token {
			request = request.bearer_auth(token);
		}

		let response = request
			.send()
			.await
			.map_err(|e| RealtimeError::Connection(e.to_string()))?;
		if !response.status().is_success() {
			return Err(RealtimeError::Connection(format!(
				"poll returned {}",
				response.status()
			)));
		}

		let batch: PollBatch = response
			.json()
			.await
			.map_err(|e| RealtimeError::Parse(e.to_string()))?;

		for raw in batch.events {
			match serde_json::from_value::<NotificationEvent>(raw) {
				Ok(event) => {
					if sender.send(event).is_err() {
						// Receiver gone; the listener is being torn down.
						return Ok(batch.cursor);
					}
				}
				Err(e) => {
					tracing::debug!(error = %e, "Skipping unparseable notification payload");
				}
			}
		}

		Ok(batch.cursor)
	}
}

/// Wire shape of one long-poll response.
#[derive(Debug, serde::Deserialize)]
struct PollBatch {
	/// Cursor to resume from on the next poll.
	cursor: u64,
	/// Raw event payloads; parsed individually so one bad payload does
	/// not drop the batch.
	#[serde(default)]
	events: Vec<serde_json::Value>,
}

#[async_trait]
impl RealtimeInterface for LongPollSource {
	async fn start_listening(
		&self,
		channel: &Channel,
		sender: mpsc::UnboundedSender<NotificationEvent>,
	) -> Result<(), RealtimeError> {
		let mut task = self.task.lock().await;
		if task.is_some() {
			return Err(RealtimeError::AlreadyListening);
		}

		let client = self.client.clone();
		let url = format!("{}/realtime/{}", self.base_url, channel.name());
		let auth_token = self.auth_token.clone();
		let channel_name = channel.name().to_string();

		let handle = tokio::spawn(async move {
			let mut cursor = 0u64;
			loop {
				match Self::poll_once(&client, &url, &auth_token, cursor, &sender).await {
					Ok(next_cursor) => {
						cursor = next_cursor;
						if sender.is_closed() {
							break;
						}
					}
					Err(e) => {
						tracing::debug!(
							channel = %channel_name,
							error = %e,
							"Poll failed, retrying"
						);
						tokio::time::sleep(RETRY_DELAY).await;
					}
				}
			}
		});

		*task = Some(handle);
		tracing::info!(channel = %channel, "Started long-poll listener");
		Ok(())
	}

	async fn stop_listening(&self) -> Result<(), RealtimeError> {
		let mut task = self.task.lock().await;
		if let Some(handle) = task.take() {
			handle.abort();
			tracing::info!("Stopped long-poll listener");
		}
		Ok(())
	}
}

/// Factory function to create a long-polling source from configuration.
///
/// Configuration parameters:
/// - `base_url`: backend root URL (required)
/// - `auth_token`: bearer token (optional)
pub fn create_source(config: &toml::Value) -> Result<Box<dyn RealtimeInterface>, RealtimeError> {
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| RealtimeError::Connection("base_url is required".into()))?
		.to_string();

	let auth_token = config
		.get("auth_token")
		.and_then(|v| v.as_str())
		.map(|s| s.to_string());

	Ok(Box::new(LongPollSource::new(base_url, auth_token)))
}
