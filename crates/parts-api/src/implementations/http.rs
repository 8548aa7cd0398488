//! HTTP backend implementation speaking the marketplace REST API.
//!
//! All JSON responses pass through the shared types' deserialization, so
//! legacy status spellings are folded to canonical enums here and nowhere
//! else. Quote media travels as multipart parts alongside the JSON
//! payload, read from local file references at submission time.

use crate::{BackendError, BackendInterface, QuoteSubmission};
use async_trait::async_trait;
use parts_types::{
	Order, OrderProjection, OrderStatus, Quote, WalletSnapshot, WithdrawalRequest,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;

/// Default request timeout when none is configured.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP implementation of the backend interface.
pub struct HttpBackend {
	client: Client,
	base_url: String,
	auth_token: Option<String>,
}

impl HttpBackend {
	/// Creates a new HttpBackend for the given base URL.
	pub fn new(
		base_url: String,
		auth_token: Option<String>,
		timeout: Duration,
	) -> Result<Self, BackendError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| BackendError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			base_url: base_url.trim_end_matches('/').to_string(),
			auth_token,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}

	fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
		match &self.auth_token {
			Some(token) => request.bearer_auth(token),
			None => request,
		}
	}

	/// Decodes a response, mapping non-2xx statuses to [`BackendError::Http`]
	/// with whatever body text the backend attached.
	async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(BackendError::Http {
				status: status.as_u16(),
				message,
			});
		}
		response
			.json::<T>()
			.await
			.map_err(|e| BackendError::Decode(e.to_string()))
	}

	/// Builds the multipart form for a quote submission: one JSON payload
	/// part plus one part per attached media reference.
	async fn quote_form(submission: &QuoteSubmission) -> Result<Form, BackendError> {
		let payload =
			serde_json::to_string(submission).map_err(|e| BackendError::Decode(e.to_string()))?;
		let mut form = Form::new().part(
			"payload",
			Part::text(payload)
				.mime_str("application/json")
				.map_err(|e| BackendError::Configuration(e.to_string()))?,
		);

		if let Some(media) = &submission.media {
			for (index, image) in media.images.iter().enumerate() {
				form = form.part(format!("image_{}", index), Self::file_part(image).await?);
			}
			if let Some(video) = &media.video {
				form = form.part("video", Self::file_part(video).await?);
			}
			if let Some(voice) = &media.voice_note {
				form = form.part("voice_note", Self::file_part(voice).await?);
			}
		}

		Ok(form)
	}

	async fn file_part(reference: &str) -> Result<Part, BackendError> {
		let bytes = tokio::fs::read(reference)
			.await
			.map_err(|e| BackendError::Network(format!("reading media {}: {}", reference, e)))?;
		let file_name = Path::new(reference)
			.file_name()
			.and_then(|n| n.to_str())
			.unwrap_or("attachment")
			.to_string();
		Ok(Part::bytes(bytes).file_name(file_name))
	}
}

#[async_trait]
impl BackendInterface for HttpBackend {
	async fn fetch_orders(&self, projection: OrderProjection) -> Result<Vec<Order>, BackendError> {
		let request = self
			.authorize(self.client.get(self.url("/provider/orders")))
			.query(&[("view", projection.to_string())]);
		let response = request.send().await?;
		Self::decode(response).await
	}

	async fn submit_quote(
		&self,
		order_number: &str,
		submission: &QuoteSubmission,
	) -> Result<Quote, BackendError> {
		let form = Self::quote_form(submission).await?;
		let request = self
			.authorize(
				self.client
					.post(self.url(&format!("/orders/{}/quotes", order_number))),
			)
			.multipart(form);
		let response = request.send().await?;
		Self::decode(response).await
	}

	async fn update_status(
		&self,
		order_number: &str,
		next: &OrderStatus,
	) -> Result<Order, BackendError> {
		let request = self
			.authorize(
				self.client
					.patch(self.url(&format!("/orders/{}/status", order_number))),
			)
			.json(&serde_json::json!({ "status": next }));
		let response = request.send().await?;
		Self::decode(response).await
	}

	async fn set_order_visibility(
		&self,
		order_number: &str,
		hidden: bool,
	) -> Result<(), BackendError> {
		let request = self
			.authorize(
				self.client
					.patch(self.url(&format!("/orders/{}/visibility", order_number))),
			)
			.json(&serde_json::json!({ "hidden": hidden }));
		let response = request.send().await?;
		let status = response.status();
		if !status.is_success() {
			let message = response.text().await.unwrap_or_default();
			return Err(BackendError::Http {
				status: status.as_u16(),
				message,
			});
		}
		Ok(())
	}

	async fn fetch_wallet(&self) -> Result<WalletSnapshot, BackendError> {
		let request = self.authorize(self.client.get(self.url("/provider/wallet")));
		let response = request.send().await?;
		Self::decode(response).await
	}

	async fn fetch_withdrawals(&self) -> Result<Vec<WithdrawalRequest>, BackendError> {
		let request = self.authorize(
			self.client
				.get(self.url("/provider/wallet/withdrawals")),
		);
		let response = request.send().await?;
		Self::decode(response).await
	}

	async fn request_withdrawal(&self, amount: Decimal) -> Result<WithdrawalRequest, BackendError> {
		let request = self
			.authorize(
				self.client
					.post(self.url("/provider/wallet/withdrawals")),
			)
			.json(&serde_json::json!({ "amount": amount }));
		let response = request.send().await?;
		Self::decode(response).await
	}
}

/// Factory function to create an HTTP backend from configuration.
///
/// Configuration parameters:
/// - `base_url`: backend root URL (required)
/// - `auth_token`: bearer token (optional, usually injected via env)
/// - `timeout_seconds`: request timeout (default: 30)
pub fn create_backend(config: &toml::Value) -> Result<Box<dyn BackendInterface>, BackendError> {
	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| BackendError::Configuration("base_url is required".into()))?
		.to_string();

	let auth_token = config
		.get("auth_token")
		.and_then(|v| v.as_str())
		.map(|s| s.to_string());

	let timeout_seconds = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECS);

	let backend = HttpBackend::new(
		base_url,
		auth_token,
		Duration::from_secs(timeout_seconds),
	)?;
	Ok(Box::new(backend))
}
