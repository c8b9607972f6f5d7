pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Malformed filter: {message}")]
	MalformedFilter { message: String },
	#[error("Malformed gold constraints: {message}")]
	MalformedGold { message: String },
}
