pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Network trouble, timeouts, throttling, 5xx. Safe to retry.
	#[error("{0}")]
	Transient(String),
	/// Bad or missing credentials. Never retried.
	#[error("{0}")]
	Auth(String),
	/// The provider answered but the payload was not usable.
	#[error("{0}")]
	InvalidResponse(String),
	/// The consent service could not produce a decision. Handled by policy,
	/// not by retry.
	#[error("Consent service unavailable: {0}")]
	ConsentUnavailable(String),
}

impl Error {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Transient(_))
	}
}

impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() || err.is_connect() {
			return Self::Transient(err.to_string());
		}
		if err.is_decode() {
			return Self::InvalidResponse(err.to_string());
		}

		match err.status() {
			Some(status) if status.as_u16() == 401 || status.as_u16() == 403 =>
				Self::Auth(err.to_string()),
			Some(status) if status.as_u16() == 429 || status.is_server_error() =>
				Self::Transient(err.to_string()),
			Some(_) => Self::InvalidResponse(err.to_string()),
			// Request never reached the wire or the body stream broke.
			None => Self::Transient(err.to_string()),
		}
	}
}
