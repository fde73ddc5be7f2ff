pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// `fields` holds JSON paths such as `$.action_items[2].status`.
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String, fields: Vec<String> },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Export error: {message}")]
	Export { message: String },
}
impl Error {
	pub fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into(), fields: Vec::new() }
	}

	pub fn invalid_field(path: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidRequest { message: message.into(), fields: vec![path.into()] }
	}
}

impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<mmp_storage::Error> for Error {
	fn from(err: mmp_storage::Error) -> Self {
		match err {
			mmp_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			mmp_storage::Error::SerdeJson(inner) => Self::Storage { message: inner.to_string() },
			mmp_storage::Error::InvalidArgument(message) => Self::invalid(message),
			mmp_storage::Error::NotFound(message) => Self::NotFound { message },
			mmp_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<mmp_providers::Error> for Error {
	fn from(err: mmp_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<mmp_docx::Error> for Error {
	fn from(err: mmp_docx::Error) -> Self {
		match err {
			mmp_docx::Error::Malformed { message } => Self::invalid(message),
			other => Self::Export { message: other.to_string() },
		}
	}
}

impl From<mmp_domain::validate::ValidationError> for Error {
	fn from(err: mmp_domain::validate::ValidationError) -> Self {
		Self::InvalidRequest { message: err.to_string(), fields: err.fields() }
	}
}

impl From<mmp_domain::validate::FieldError> for Error {
	fn from(err: mmp_domain::validate::FieldError) -> Self {
		Self::invalid_field(err.path, err.message)
	}
}
