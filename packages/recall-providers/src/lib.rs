pub mod ntfy;

mod error;

pub use error::{Error, Result};
pub use ntfy::{Notification, NtfyClient};

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

pub fn default_headers() -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(
		USER_AGENT,
		HeaderValue::from_str(&format!("recall/{}", env!("CARGO_PKG_VERSION")))?,
	);

	Ok(headers)
}
