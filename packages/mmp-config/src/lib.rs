mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	ApiStyle, Classifier, Config, Export, LlmProviderConfig, ProviderConfig, Providers, Security,
	Service, Sqlite, Storage,
};

use std::{collections::HashSet, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.sqlite.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.sqlite.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.sqlite.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.uploads_dir.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.uploads_dir must be non-empty.".to_string(),
		});
	}
	if cfg.storage.max_upload_bytes == 0 {
		return Err(Error::Validation {
			message: "storage.max_upload_bytes must be greater than zero.".to_string(),
		});
	}

	let mut seen = HashSet::new();

	for (idx, provider) in cfg.providers.llm.iter().enumerate() {
		for (label, value) in [
			("provider_id", &provider.provider_id),
			("api_base", &provider.api_base),
			("api_key", &provider.api_key),
			("path", &provider.path),
			("model", &provider.model),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("providers.llm[{idx}].{label} must be non-empty."),
				});
			}
		}

		if !seen.insert(provider.provider_id.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"providers.llm[{idx}].provider_id {:?} is listed more than once.",
					provider.provider_id
				),
			});
		}
		if provider.max_tokens == 0 {
			return Err(Error::Validation {
				message: format!("providers.llm[{idx}].max_tokens must be greater than zero."),
			});
		}
		if provider.max_attempts == 0 {
			return Err(Error::Validation {
				message: format!("providers.llm[{idx}].max_attempts must be greater than zero."),
			});
		}
		if provider.timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.llm[{idx}].timeout_ms must be greater than zero."),
			});
		}
		if !provider.temperature.is_finite() || !(0.0..=2.0).contains(&provider.temperature) {
			return Err(Error::Validation {
				message: format!("providers.llm[{idx}].temperature must be in the range 0.0-2.0."),
			});
		}
	}

	if let Some(transcription) = cfg.providers.transcription.as_ref() {
		for (label, value) in [
			("provider_id", &transcription.provider_id),
			("api_base", &transcription.api_base),
			("api_key", &transcription.api_key),
			("path", &transcription.path),
			("model", &transcription.model),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation {
					message: format!("providers.transcription.{label} must be non-empty."),
				});
			}
		}
	}

	for (label, value) in [
		("classifier.min_confidence", cfg.classifier.min_confidence),
		("classifier.keyword_confidence_cap", cfg.classifier.keyword_confidence_cap),
	] {
		if !value.is_finite() {
			return Err(Error::Validation { message: format!("{label} must be a finite number.") });
		}
		if !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.classifier.transcript_word_limit == 0 {
		return Err(Error::Validation {
			message: "classifier.transcript_word_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.classifier.max_keywords == 0 {
		return Err(Error::Validation {
			message: "classifier.max_keywords must be greater than zero.".to_string(),
		});
	}
	if !is_plain_file_prefix(&cfg.export.file_prefix) {
		return Err(Error::Validation {
			message: "export.file_prefix must be a non-empty plain file name of visible ASCII."
				.to_string(),
		});
	}

	Ok(())
}

/// The prefix lands in a `Content-Disposition` header, so it must be header-safe as is.
fn is_plain_file_prefix(prefix: &str) -> bool {
	!prefix.trim().is_empty()
		&& prefix.chars().all(|ch| ch.is_ascii_graphic() || ch == ' ')
		&& !prefix.contains(['/', '\\', '"'])
}

fn normalize(cfg: &mut Config) {
	if cfg.security.api_auth_token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.security.api_auth_token = None;
	}

	cfg.service.cors_allowed_origins.retain(|origin| !origin.trim().is_empty());

	for provider in &mut cfg.providers.llm {
		provider.api_base = provider.api_base.trim_end_matches('/').to_string();
	}

	if let Some(transcription) = cfg.providers.transcription.as_mut() {
		transcription.api_base = transcription.api_base.trim_end_matches('/').to_string();
	}
}
