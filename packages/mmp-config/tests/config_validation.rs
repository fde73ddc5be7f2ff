use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use mmp_config::{ApiStyle, Config};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml_with(edit: impl FnOnce(&mut toml::Table)) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn table<'a>(root: &'a mut toml::Table, key: &str) -> &'a mut toml::Table {
	root.get_mut(key)
		.and_then(Value::as_table_mut)
		.unwrap_or_else(|| panic!("Template config must include [{key}]."))
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("mmp_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

fn load_message(payload: String) -> String {
	let path = write_temp_config(payload);
	let result = mmp_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result.expect_err("Expected validation error.").to_string()
}

#[test]
fn sample_config_is_valid() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = mmp_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert_eq!(cfg.providers.llm.len(), 2);
	assert_eq!(cfg.providers.llm[0].api_style, ApiStyle::Anthropic);
	assert_eq!(cfg.providers.llm[0].max_attempts, 2);
	assert_eq!(cfg.providers.llm[1].max_attempts, 1);
	assert!(cfg.providers.transcription.is_some());
}

#[test]
fn blank_auth_token_is_normalized_to_none() {
	let path = write_temp_config(SAMPLE_CONFIG_TEMPLATE_TOML.to_string());
	let result = mmp_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected sample config to load.");

	assert!(cfg.security.api_auth_token.is_none());
}

#[test]
fn classifier_and_export_sections_have_defaults() {
	let payload = sample_toml_with(|root| {
		root.remove("classifier");
		root.remove("export");
	});
	let cfg: Config = toml::from_str(&payload).expect("Failed to parse test config.");

	assert_eq!(cfg.classifier.keyword_confidence_cap, 0.8);
	assert_eq!(cfg.classifier.transcript_word_limit, 2_000);
	assert_eq!(cfg.export.file_prefix, "meeting_minutes");
	assert!(mmp_config::validate(&cfg).is_ok());
}

#[test]
fn config_without_providers_is_valid() {
	let payload = sample_toml_with(|root| {
		root.remove("providers");
	});
	let path = write_temp_config(payload);
	let result = mmp_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	let cfg = result.expect("Expected a config without providers to load.");

	assert!(cfg.providers.llm.is_empty());
	assert!(cfg.providers.transcription.is_none());

	let payload = sample_toml_with(|root| {
		table(root, "providers").insert("llm".to_string(), Value::Array(Vec::new()));
	});
	let cfg: Config = toml::from_str(&payload).expect("Failed to parse test config.");

	assert!(mmp_config::validate(&cfg).is_ok());
}

#[test]
fn provider_api_key_must_be_non_empty() {
	let mut cfg = base_config();

	cfg.providers.llm[1].api_key = "  ".to_string();

	let err = mmp_config::validate(&cfg).expect_err("Expected api_key validation error.");

	assert!(
		err.to_string().contains("providers.llm[1].api_key must be non-empty."),
		"Unexpected error: {err}"
	);
}

#[test]
fn provider_ids_must_be_unique() {
	let mut cfg = base_config();

	cfg.providers.llm[1].provider_id = "anthropic".to_string();

	let err = mmp_config::validate(&cfg).expect_err("Expected duplicate provider error.");

	assert!(err.to_string().contains("is listed more than once."), "Unexpected error: {err}");
}

#[test]
fn unknown_api_style_is_a_parse_error() {
	let payload = sample_toml_with(|root| {
		let providers = table(root, "providers");
		let llm = providers
			.get_mut("llm")
			.and_then(Value::as_array_mut)
			.expect("Template config must include [[providers.llm]].");
		let first = llm[0].as_table_mut().expect("Provider entry must be a table.");

		first.insert("api_style".to_string(), Value::String("cohere".to_string()));
	});
	let message = load_message(payload);

	assert!(message.contains("Failed to parse config file"), "Unexpected error message: {message}");
}

#[test]
fn classifier_confidences_must_be_in_range() {
	let mut cfg = base_config();

	cfg.classifier.keyword_confidence_cap = 1.5;

	let err = mmp_config::validate(&cfg).expect_err("Expected range validation error.");

	assert!(
		err.to_string().contains("classifier.keyword_confidence_cap must be in the range 0.0-1.0."),
		"Unexpected error: {err}"
	);

	let mut cfg = base_config();

	cfg.classifier.min_confidence = f32::NAN;

	let err = mmp_config::validate(&cfg).expect_err("Expected finite validation error.");

	assert!(
		err.to_string().contains("classifier.min_confidence must be a finite number."),
		"Unexpected error: {err}"
	);
}

#[test]
fn export_prefix_must_be_a_plain_file_name() {
	let mut cfg = base_config();

	cfg.export.file_prefix = "../minutes".to_string();

	let err = mmp_config::validate(&cfg).expect_err("Expected file prefix validation error.");

	assert!(
		err.to_string().contains("export.file_prefix must be a non-empty plain file name"),
		"Unexpected error: {err}"
	);

	for prefix in ["protokoll_für", "minutes\tdraft", "minutes\u{7f}"] {
		let mut cfg = base_config();

		cfg.export.file_prefix = prefix.to_string();

		assert!(mmp_config::validate(&cfg).is_err(), "Expected {prefix:?} to be rejected.");
	}

	let mut cfg = base_config();

	cfg.export.file_prefix = "Team Minutes_2026".to_string();

	assert!(mmp_config::validate(&cfg).is_ok());
}

#[test]
fn pool_size_must_be_positive() {
	let payload = sample_toml_with(|root| {
		let storage = table(root, "storage");

		table(storage, "sqlite").insert("pool_max_conns".to_string(), Value::Integer(0));
	});
	let message = load_message(payload);

	assert!(
		message.contains("storage.sqlite.pool_max_conns must be greater than zero."),
		"Unexpected error message: {message}"
	);
}
