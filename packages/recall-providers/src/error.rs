pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("Notification server responded with status {status}: {body}")]
	Status { status: u16, body: String },
	#[error("Notification request timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
}
