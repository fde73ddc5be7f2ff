pub mod chat;
pub mod json;
pub mod transcribe;

mod error;

pub use error::{Error, Result};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

use mmp_config::ApiStyle;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Credentials in the shape each API expects, followed by the configured extra headers.
pub fn auth_headers(
	style: ApiStyle,
	api_key: &str,
	default_headers: &Map<String, Value>,
) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	match style {
		ApiStyle::Openai => {
			headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);
		},
		ApiStyle::Anthropic => {
			headers.insert(HeaderName::from_static("x-api-key"), api_key.parse()?);
			headers.insert(
				HeaderName::from_static("anthropic-version"),
				HeaderValue::from_static(ANTHROPIC_VERSION),
			);
		},
		ApiStyle::Gemini => {
			headers.insert(HeaderName::from_static("x-goog-api-key"), api_key.parse()?);
		},
	}

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
