use std::time::Duration;

use reqwest::Client;
use serde_json::{Value, json};

use crate::{Error, Result};
use mmp_config::{ApiStyle, LlmProviderConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
	Text(String),
	/// Base64 payload, e.g. a PNG screenshot.
	Image { media_type: String, data: String },
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
	pub system: String,
	pub parts: Vec<ContentPart>,
}
impl ChatRequest {
	pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
		Self { system: system.into(), parts: vec![ContentPart::Text(user.into())] }
	}
}

/// One request to one provider, returning the model's text. Retries and failover belong to the
/// caller.
pub async fn complete(cfg: &LlmProviderConfig, request: &ChatRequest) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = endpoint(cfg);
	let body = build_body(cfg, request);
	let res = client
		.post(&url)
		.headers(crate::auth_headers(cfg.api_style, &cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_content(cfg.api_style, json)
}

/// Gemini paths carry the model name, written as `{model}` in the configured path.
pub fn endpoint(cfg: &LlmProviderConfig) -> String {
	format!("{}{}", cfg.api_base, cfg.path.replace("{model}", &cfg.model))
}

pub fn build_body(cfg: &LlmProviderConfig, request: &ChatRequest) -> Value {
	match cfg.api_style {
		ApiStyle::Anthropic => {
			let content: Vec<Value> = request
				.parts
				.iter()
				.map(|part| match part {
					ContentPart::Text(text) => json!({ "type": "text", "text": text }),
					ContentPart::Image { media_type, data } => json!({
						"type": "image",
						"source": { "type": "base64", "media_type": media_type, "data": data },
					}),
				})
				.collect();

			json!({
				"model": cfg.model,
				"max_tokens": cfg.max_tokens,
				"temperature": cfg.temperature,
				"system": request.system,
				"messages": [{ "role": "user", "content": content }],
			})
		},
		ApiStyle::Openai => {
			let content: Vec<Value> = request
				.parts
				.iter()
				.map(|part| match part {
					ContentPart::Text(text) => json!({ "type": "text", "text": text }),
					ContentPart::Image { media_type, data } => json!({
						"type": "image_url",
						"image_url": { "url": format!("data:{media_type};base64,{data}") },
					}),
				})
				.collect();

			json!({
				"model": cfg.model,
				"max_tokens": cfg.max_tokens,
				"temperature": cfg.temperature,
				"messages": [
					{ "role": "system", "content": request.system },
					{ "role": "user", "content": content },
				],
			})
		},
		ApiStyle::Gemini => {
			let parts: Vec<Value> = request
				.parts
				.iter()
				.map(|part| match part {
					ContentPart::Text(text) => json!({ "text": text }),
					ContentPart::Image { media_type, data } =>
						json!({ "inline_data": { "mime_type": media_type, "data": data } }),
				})
				.collect();

			json!({
				"systemInstruction": { "parts": [{ "text": request.system }] },
				"contents": [{ "role": "user", "parts": parts }],
				"generationConfig": {
					"temperature": cfg.temperature,
					"maxOutputTokens": cfg.max_tokens,
				},
			})
		},
	}
}

pub fn parse_content(style: ApiStyle, json: Value) -> Result<String> {
	let text = match style {
		ApiStyle::Anthropic => json.get("content").and_then(Value::as_array).map(|blocks| {
			blocks
				.iter()
				.filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
				.filter_map(|block| block.get("text").and_then(Value::as_str))
				.collect::<Vec<_>>()
				.join("")
		}),
		ApiStyle::Openai => json
			.get("choices")
			.and_then(Value::as_array)
			.and_then(|choices| choices.first())
			.and_then(|choice| choice.get("message"))
			.and_then(|message| message.get("content"))
			.and_then(Value::as_str)
			.map(str::to_string),
		ApiStyle::Gemini => json
			.get("candidates")
			.and_then(Value::as_array)
			.and_then(|candidates| candidates.first())
			.and_then(|candidate| candidate.get("content"))
			.and_then(|content| content.get("parts"))
			.and_then(Value::as_array)
			.map(|parts| {
				parts
					.iter()
					.filter_map(|part| part.get("text").and_then(Value::as_str))
					.collect::<Vec<_>>()
					.join("")
			}),
	};

	match text {
		Some(text) if !text.trim().is_empty() => Ok(text),
		_ => Err(Error::InvalidResponse {
			message: format!("{} response is missing text content.", style.as_str()),
		}),
	}
}

#[cfg(test)]
mod tests {
	use serde_json::Map;

	use super::*;

	fn provider(style: ApiStyle, path: &str) -> LlmProviderConfig {
		LlmProviderConfig {
			provider_id: "p".to_string(),
			api_style: style,
			api_base: "http://localhost".to_string(),
			api_key: "key".to_string(),
			path: path.to_string(),
			model: "m".to_string(),
			max_tokens: 512,
			temperature: 0.1,
			timeout_ms: 1_000,
			max_attempts: 1,
			default_headers: Map::new(),
		}
	}

	#[test]
	fn parses_anthropic_text_blocks() {
		let json = json!({
			"content": [
				{ "type": "text", "text": "{\"a\":" },
				{ "type": "tool_use", "id": "x" },
				{ "type": "text", "text": "1}" }
			]
		});

		assert_eq!(parse_content(ApiStyle::Anthropic, json).expect("parse failed"), "{\"a\":1}");
	}

	#[test]
	fn parses_openai_choice_content() {
		let json = json!({ "choices": [{ "message": { "content": "hello" } }] });

		assert_eq!(parse_content(ApiStyle::Openai, json).expect("parse failed"), "hello");
	}

	#[test]
	fn parses_gemini_candidate_parts() {
		let json = json!({
			"candidates": [{ "content": { "parts": [{ "text": "he" }, { "text": "llo" }] } }]
		});

		assert_eq!(parse_content(ApiStyle::Gemini, json).expect("parse failed"), "hello");
	}

	#[test]
	fn empty_content_is_an_error() {
		let json = json!({ "choices": [{ "message": { "content": "  " } }] });

		assert!(parse_content(ApiStyle::Openai, json).is_err());
		assert!(parse_content(ApiStyle::Anthropic, json!({})).is_err());
	}

	#[test]
	fn gemini_endpoint_substitutes_model() {
		let cfg = provider(ApiStyle::Gemini, "/v1beta/models/{model}:generateContent");

		assert_eq!(endpoint(&cfg), "http://localhost/v1beta/models/m:generateContent");
	}

	#[test]
	fn image_parts_follow_each_style() {
		let request = ChatRequest {
			system: "sys".to_string(),
			parts: vec![
				ContentPart::Text("look".to_string()),
				ContentPart::Image { media_type: "image/png".to_string(), data: "AAAA".to_string() },
			],
		};
		let anthropic = build_body(&provider(ApiStyle::Anthropic, "/v1/messages"), &request);

		assert_eq!(anthropic["system"], "sys");
		assert_eq!(anthropic["messages"][0]["content"][1]["source"]["data"], "AAAA");

		let openai = build_body(&provider(ApiStyle::Openai, "/v1/chat/completions"), &request);

		assert_eq!(openai["messages"][0]["role"], "system");
		assert_eq!(
			openai["messages"][1]["content"][1]["image_url"]["url"],
			"data:image/png;base64,AAAA"
		);

		let gemini = build_body(&provider(ApiStyle::Gemini, "/x"), &request);

		assert_eq!(gemini["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
		assert_eq!(gemini["generationConfig"]["maxOutputTokens"], 512);
	}
}
