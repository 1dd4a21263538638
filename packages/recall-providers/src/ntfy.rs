use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::{Error, Result};

const MAX_ERROR_BODY_CHARS: usize = 256;

/// One push message, serialized as the JSON body ntfy accepts on its root endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Notification {
	pub topic: String,
	pub title: String,
	pub message: String,
	pub priority: u8,
	pub tags: Vec<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub click: Option<String>,
}

/// Publishes notifications to an ntfy-compatible server with shared basic-auth credentials.
///
/// The client never retries; callers decide what a failure means.
#[derive(Clone, Debug)]
pub struct NtfyClient {
	client: Client,
	base_url: String,
	username: String,
	password: String,
	timeout_ms: u64,
}
impl NtfyClient {
	pub fn new(cfg: &recall_config::Notifier) -> Result<Self> {
		if cfg.username.trim().is_empty() || cfg.password.trim().is_empty() {
			return Err(Error::InvalidConfig {
				message: "Notifier credentials are not configured.".to_string(),
			});
		}

		let base_url = cfg.base_url.trim().trim_end_matches('/').to_string();

		if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
			return Err(Error::InvalidConfig {
				message: "Notifier base_url must be an http or https URL.".to_string(),
			});
		}
		if cfg.timeout_ms == 0 {
			return Err(Error::InvalidConfig {
				message: "Notifier timeout_ms must be greater than zero.".to_string(),
			});
		}

		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::default_headers()?)
			.build()?;

		Ok(Self {
			client,
			base_url,
			username: cfg.username.clone(),
			password: cfg.password.clone(),
			timeout_ms: cfg.timeout_ms,
		})
	}

	pub fn base_url(&self) -> &str {
		&self.base_url
	}

	pub async fn send(&self, notification: &Notification) -> Result<()> {
		let res = self
			.client
			.post(self.base_url.as_str())
			.basic_auth(&self.username, Some(&self.password))
			.json(notification)
			.send()
			.await
			.map_err(|err| self.map_send_error(err))?;
		let status = res.status();

		if status.is_success() {
			return Ok(());
		}

		let body = res.text().await.unwrap_or_default();

		Err(Error::Status { status: status.as_u16(), body: truncate(body.trim()) })
	}

	fn map_send_error(&self, err: reqwest::Error) -> Error {
		if err.is_timeout() { Error::Timeout { timeout_ms: self.timeout_ms } } else { err.into() }
	}
}

fn truncate(body: &str) -> String {
	body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
