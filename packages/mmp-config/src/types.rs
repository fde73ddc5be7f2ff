use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub providers: Providers,
	#[serde(default)]
	pub classifier: Classifier,
	#[serde(default)]
	pub export: Export,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Origins allowed by CORS. Empty means same-origin only.
	#[serde(default)]
	pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub sqlite: Sqlite,
	pub uploads_dir: String,
	#[serde(default = "default_max_upload_bytes")]
	pub max_upload_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct Sqlite {
	/// e.g. `sqlite://meetings.db`.
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct Providers {
	/// Tried in order until one succeeds. Empty disables the AI routes.
	#[serde(default)]
	pub llm: Vec<LlmProviderConfig>,
	pub transcription: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
	Anthropic,
	Openai,
	Gemini,
}
impl ApiStyle {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Anthropic => "anthropic",
			Self::Openai => "openai",
			Self::Gemini => "gemini",
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_style: ApiStyle,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Classifier {
	/// Minimum confidence for a match to become the primary project.
	pub min_confidence: f32,
	/// Upper bound for keyword-only confidence.
	pub keyword_confidence_cap: f32,
	/// Words of meeting text sent to the model during AI classification.
	pub transcript_word_limit: u32,
	pub max_keywords: u32,
}
impl Default for Classifier {
	fn default() -> Self {
		Self {
			min_confidence: 0.3,
			keyword_confidence_cap: 0.8,
			transcript_word_limit: 2_000,
			max_keywords: 15,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Export {
	pub file_prefix: String,
}
impl Default for Export {
	fn default() -> Self {
		Self { file_prefix: "meeting_minutes".to_string() }
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
	pub api_auth_token: Option<String>,
}

fn default_max_upload_bytes() -> u64 {
	10 * 1_024 * 1_024
}

fn default_max_tokens() -> u32 {
	4_096
}

fn default_max_attempts() -> u32 {
	1
}
