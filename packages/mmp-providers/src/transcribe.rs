use std::time::Duration;

use reqwest::{
	Client,
	multipart::{Form, Part},
};
use serde_json::Value;

use crate::{Error, Result};
use mmp_config::{ApiStyle, ProviderConfig};

/// Sends audio to a Whisper-compatible `audio/transcriptions` endpoint.
pub async fn transcribe(
	cfg: &ProviderConfig,
	file_name: &str,
	content_type: &str,
	audio: Vec<u8>,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let part = Part::bytes(audio).file_name(file_name.to_string()).mime_str(content_type)?;
	let form = Form::new().text("model", cfg.model.clone()).part("file", part);
	let res = client
		.post(&url)
		.headers(crate::auth_headers(ApiStyle::Openai, &cfg.api_key, &cfg.default_headers)?)
		.multipart(form)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_transcription(json)
}

pub fn parse_transcription(json: Value) -> Result<String> {
	json.get("text").and_then(Value::as_str).map(|text| text.trim().to_string()).ok_or_else(|| {
		Error::InvalidResponse { message: "Transcription response is missing text.".to_string() }
	})
}
