pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Request timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
	#[error("Upstream returned HTTP status {status}.")]
	Status { status: u16 },
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("Listing API credentials are not configured.")]
	MissingCredentials,
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Opaque label safe to show outside the process.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Timeout { .. } => "timeout",
			Self::Status { .. } => "http_status",
			Self::Reqwest(_) => "transport",
			Self::SerdeJson(_) | Self::InvalidResponse { .. } => "invalid_response",
			Self::InvalidHeaderName(_) | Self::InvalidHeaderValue(_) | Self::InvalidConfig { .. } =>
				"invalid_config",
			Self::MissingCredentials => "missing_credentials",
		}
	}

	pub(crate) fn transport(timeout_ms: u64) -> impl Fn(reqwest::Error) -> Self {
		move |err| {
			if err.is_timeout() {
				Self::Timeout { timeout_ms }
			} else if let Some(status) = err.status() {
				Self::Status { status: status.as_u16() }
			} else {
				Self::Reqwest(err)
			}
		}
	}
}
