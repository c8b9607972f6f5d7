pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Malformed filter: {message}")]
	MalformedFilter { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
}
impl Error {
	/// Opaque label safe to return to callers.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::InvalidRequest { .. } => "invalid_request",
			Self::MalformedFilter { .. } => "malformed_filter",
			Self::Provider { .. } => "upstream_unavailable",
			Self::Storage { .. } | Self::Qdrant { .. } => "storage_unavailable",
		}
	}
}

impl From<hunian_providers::Error> for Error {
	fn from(err: hunian_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<hunian_storage::Error> for Error {
	fn from(err: hunian_storage::Error) -> Self {
		match err {
			hunian_storage::Error::Qdrant(inner) => Self::Qdrant { message: inner.to_string() },
			hunian_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<hunian_domain::Error> for Error {
	fn from(err: hunian_domain::Error) -> Self {
		match err {
			hunian_domain::Error::MalformedFilter { message } => Self::MalformedFilter { message },
			hunian_domain::Error::MalformedGold { message } => Self::InvalidRequest { message },
		}
	}
}
