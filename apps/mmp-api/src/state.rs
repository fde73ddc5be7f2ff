use std::sync::Arc;

use mmp_config::Config;
use mmp_service::MeetingService;
use mmp_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<MeetingService>,
}
impl AppState {
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.sqlite).await?;

		db.ensure_schema().await?;

		Ok(Self::from_service(MeetingService::new(config, db)))
	}

	pub fn from_service(service: MeetingService) -> Self {
		Self { service: Arc::new(service) }
	}
}
