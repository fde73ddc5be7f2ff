//! Throwaway SQLite databases and configuration for tests.

mod error;

pub use error::{Error, Result};

use std::{
	env, fs,
	future::Future,
	io::ErrorKind,
	path::{Path, PathBuf},
};

use sqlx::{
	ConnectOptions, Connection,
	sqlite::{SqliteConnectOptions, SqliteConnection},
};
use uuid::Uuid;

use mmp_config::Config;

const SIDE_FILE_SUFFIXES: [&str; 3] = ["", "-wal", "-shm"];

/// A database file plus an uploads directory, both unique to one test and removed on cleanup or
/// drop.
pub struct TestDatabase {
	path: PathBuf,
	uploads_dir: PathBuf,
	dsn: String,
	cleaned: bool,
}
impl TestDatabase {
	pub async fn new() -> Result<Self> {
		let root = env_dir().unwrap_or_else(env::temp_dir);
		let name = format!("mmp_test_{}", Uuid::new_v4().simple());
		let path = root.join(format!("{name}.db"));
		let uploads_dir = root.join(format!("{name}_uploads"));

		tokio::fs::create_dir_all(&uploads_dir).await?;

		let options = SqliteConnectOptions::new().filename(&path).create_if_missing(true);
		let conn = options
			.connect()
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		conn.close().await?;

		let dsn = format!("sqlite://{}", path.display());

		Ok(Self { path, uploads_dir, dsn, cleaned: false })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn uploads_dir(&self) -> &Path {
		&self.uploads_dir
	}

	/// Configuration pointing at this database with a fake, unreachable provider chain.
	pub fn config(&self) -> Result<Config> {
		sample_config(&self.dsn, &self.uploads_dir)
	}

	pub async fn cleanup(mut self) -> Result<()> {
		self.cleanup_inner().await
	}

	async fn cleanup_inner(&mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		for suffix in SIDE_FILE_SUFFIXES {
			match tokio::fs::remove_file(side_file(&self.path, suffix)).await {
				Ok(()) => {},
				Err(err) if err.kind() == ErrorKind::NotFound => {},
				Err(err) => return Err(err.into()),
			}
		}
		match tokio::fs::remove_dir_all(&self.uploads_dir).await {
			Ok(()) => {},
			Err(err) if err.kind() == ErrorKind::NotFound => {},
			Err(err) => return Err(err.into()),
		}

		self.cleaned = true;

		Ok(())
	}
}
impl Drop for TestDatabase {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		for suffix in SIDE_FILE_SUFFIXES {
			if let Err(err) = fs::remove_file(side_file(&self.path, suffix))
				&& err.kind() != ErrorKind::NotFound
			{
				eprintln!("Test database cleanup failed: {err}.");
			}
		}
		if let Err(err) = fs::remove_dir_all(&self.uploads_dir)
			&& err.kind() != ErrorKind::NotFound
		{
			eprintln!("Test uploads cleanup failed: {err}.");
		}
	}
}

/// Directory for test databases; defaults to the system temp dir.
pub fn env_dir() -> Option<PathBuf> {
	env::var_os("MMP_TEST_DIR").map(PathBuf::from)
}

pub async fn with_test_db<F, Fut, T>(f: F) -> Result<T>
where
	F: FnOnce(&TestDatabase) -> Fut,
	Fut: Future<Output = Result<T>>,
{
	let db = TestDatabase::new().await?;
	let result = f(&db).await;
	let mut db = db;

	if let Err(err) = db.cleanup_inner().await {
		eprintln!("Test database cleanup warning: {err}.");

		if result.is_ok() {
			return Err(err);
		}
	}

	result
}

pub fn sample_config(dsn: &str, uploads_dir: &Path) -> Result<Config> {
	let raw = format!(
		r#"
[service]
http_bind = "127.0.0.1:0"
log_level = "warn"

[storage]
uploads_dir = {uploads_dir:?}
max_upload_bytes = 1048576

[storage.sqlite]
dsn = {dsn:?}
pool_max_conns = 4

[[providers.llm]]
provider_id = "primary"
api_style = "anthropic"
api_base = "http://127.0.0.1:9"
api_key = "test-key"
path = "/v1/messages"
model = "test-model"
temperature = 0.0
timeout_ms = 1000
max_attempts = 1

[[providers.llm]]
provider_id = "secondary"
api_style = "openai"
api_base = "http://127.0.0.1:9"
api_key = "test-key"
path = "/v1/chat/completions"
model = "test-model"
temperature = 0.0
timeout_ms = 1000
max_attempts = 1

[providers.transcription]
provider_id = "whisper"
api_base = "http://127.0.0.1:9"
api_key = "test-key"
path = "/v1/audio/transcriptions"
model = "whisper-1"
timeout_ms = 1000

[security]
bind_localhost_only = true
"#,
		uploads_dir = uploads_dir.display().to_string(),
	);
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::Message(format!("Failed to parse sample config: {err}.")))?;

	mmp_config::validate(&cfg)
		.map_err(|err| Error::Message(format!("Sample config is invalid: {err}.")))?;

	Ok(cfg)
}

fn side_file(path: &Path, suffix: &str) -> PathBuf {
	let mut raw = path.as_os_str().to_os_string();

	raw.push(suffix);

	PathBuf::from(raw)
}
