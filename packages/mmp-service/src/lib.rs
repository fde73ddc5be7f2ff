pub mod action_items;
pub mod ai;
pub mod classify;
pub mod documents;
pub mod meetings;
pub mod projects;
pub mod screenshots;

mod error;
mod time_serde;

pub use error::{Error, Result};

use std::{
	future::Future,
	pin::Pin,
	sync::{Arc, Mutex, PoisonError},
};

use serde::Serialize;

pub use action_items::{ActionItemPatch, ActionItemQuery};
pub use ai::{AiGenerateRequest, TranscriptionResponse};
pub use classify::{ClassificationResponse, ClassifyRequest};
pub use documents::ExportedDocument;
pub use meetings::{
	ActionItemView, AgendaItemView, AttendeeView, MeetingListQuery, MeetingSummary, MeetingView,
	ProjectMatchView, ReorderList, ReorderRequest, VersionView,
};
pub use projects::{ProjectRequest, ProjectView};
pub use screenshots::{
	AnalyzeScreenshotRequest, IdentifySpeakersRequest, ScreenshotUpload, ScreenshotView,
	SpeakerIdentification,
};
pub use mmp_domain::{
	draft::{ActionItemDraft, MeetingDraft},
	validate::{ActionItemInput, MeetingInput},
};
use mmp_config::{Config, LlmProviderConfig, ProviderConfig};
use mmp_providers::chat::{self, ChatRequest};
use mmp_storage::db::Db;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait LlmProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		request: &'a ChatRequest,
	) -> BoxFuture<'a, Result<String>>;
}

pub trait TranscriptionProvider
where
	Self: Send + Sync,
{
	fn transcribe<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		audio: &'a AudioUpload,
	) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Clone)]
pub struct AudioUpload {
	pub file_name: String,
	pub content_type: String,
	pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct Providers {
	pub llm: Arc<dyn LlmProvider>,
	pub transcription: Arc<dyn TranscriptionProvider>,
}
impl Providers {
	pub fn new(llm: Arc<dyn LlmProvider>, transcription: Arc<dyn TranscriptionProvider>) -> Self {
		Self { llm, transcription }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { llm: provider.clone(), transcription: provider }
	}
}

/// Per-provider call counters since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
	pub provider_id: String,
	pub requests: u64,
	pub successes: u64,
	pub errors: u64,
	pub last_error: Option<String>,
}

pub struct MeetingService {
	pub cfg: Config,
	pub db: Db,
	pub providers: Providers,
	stats: Mutex<Vec<ProviderStats>>,
}
impl MeetingService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self::with_providers(cfg, db, Providers::default())
	}

	pub fn with_providers(cfg: Config, db: Db, providers: Providers) -> Self {
		let stats = cfg
			.providers
			.llm
			.iter()
			.map(|provider| provider.provider_id.clone())
			.chain(cfg.providers.transcription.iter().map(|provider| provider.provider_id.clone()))
			.map(|provider_id| ProviderStats { provider_id, ..Default::default() })
			.collect();

		Self { cfg, db, providers, stats: Mutex::new(stats) }
	}

	/// Counters in configuration order, transcription last.
	pub fn ai_stats(&self) -> Vec<ProviderStats> {
		self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
	}

	/// Tries each configured LLM in order, `max_attempts` times each, and returns the first
	/// answer.
	pub(crate) async fn complete_with_failover(
		&self,
		task: &str,
		request: &ChatRequest,
	) -> Result<String> {
		let mut last_error = None;

		for provider in &self.cfg.providers.llm {
			for attempt in 1..=provider.max_attempts {
				match self.providers.llm.complete(provider, request).await {
					Ok(text) => {
						self.record(&provider.provider_id, None);
						tracing::debug!(
							provider_id = %provider.provider_id,
							task,
							attempt,
							"LLM call succeeded."
						);

						return Ok(text);
					},
					Err(err) => {
						let message = err.to_string();

						tracing::warn!(
							provider_id = %provider.provider_id,
							task,
							attempt,
							error = %message,
							"LLM call failed."
						);
						self.record(&provider.provider_id, Some(&message));

						last_error = Some(format!("{}: {message}", provider.provider_id));
					},
				}
			}
		}

		Err(Error::Provider {
			message: match last_error {
				Some(last) => format!("All LLM providers failed. Last error from {last}"),
				None => "No LLM providers are configured.".to_string(),
			},
		})
	}

	pub(crate) fn record(&self, provider_id: &str, error: Option<&str>) {
		let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
		let Some(entry) = stats.iter_mut().find(|entry| entry.provider_id == provider_id) else {
			return;
		};

		entry.requests += 1;

		match error {
			Some(message) => {
				entry.errors += 1;
				entry.last_error = Some(message.to_string());
			},
			None => entry.successes += 1,
		}
	}
}

struct DefaultProviders;
impl LlmProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		request: &'a ChatRequest,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(chat::complete(cfg, request).await?) })
	}
}
impl TranscriptionProvider for DefaultProviders {
	fn transcribe<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		audio: &'a AudioUpload,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move {
			let text = mmp_providers::transcribe::transcribe(
				cfg,
				&audio.file_name,
				&audio.content_type,
				audio.bytes.clone(),
			)
			.await?;

			Ok(text)
		})
	}
}
