pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Queue unavailable: {message}")]
	QueueUnavailable { message: String },
	#[error("Repository error: {message}")]
	Repository { message: String },
	#[error("Delivery failed: {message}")]
	Delivery { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Invalid job payload: {message}")]
	Payload { message: String },
}
impl Error {
	pub(crate) fn queue(err: recall_storage::Error) -> Self {
		Self::QueueUnavailable { message: err.to_string() }
	}
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Repository { message: err.to_string() }
	}
}

impl From<recall_storage::Error> for Error {
	fn from(err: recall_storage::Error) -> Self {
		match err {
			recall_storage::Error::Sqlx(inner) => Self::Repository { message: inner.to_string() },
			recall_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			recall_storage::Error::NotFound(message) => Self::NotFound { message },
			recall_storage::Error::Conflict(message) => Self::Repository { message },
		}
	}
}

impl From<recall_providers::Error> for Error {
	fn from(err: recall_providers::Error) -> Self {
		match err {
			recall_providers::Error::InvalidConfig { message } => Self::Configuration { message },
			other => Self::Delivery { message: other.to_string() },
		}
	}
}
