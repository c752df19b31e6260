pub type ServiceResult<T, E = ServiceError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<kith_storage::Error> for ServiceError {
	fn from(err: kith_storage::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<kith_providers::Error> for ServiceError {
	fn from(err: kith_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for ServiceError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
