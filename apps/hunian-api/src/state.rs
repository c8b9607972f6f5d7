use std::sync::Arc;

use hunian_service::{Assistant, Providers};
use hunian_storage::{qdrant::QdrantStore, session::MemorySessionStore};

#[derive(Clone)]
pub struct AppState {
	pub assistant: Arc<Assistant>,
}
impl AppState {
	pub fn new(config: hunian_config::Config) -> color_eyre::Result<Self> {
		let index = Arc::new(QdrantStore::new(&config.vector)?);
		let sessions = Arc::new(MemorySessionStore::new(&config.session));
		let assistant = Assistant::new(config, Providers::default(), index, sessions)?;

		Ok(Self::from_assistant(assistant))
	}

	pub fn from_assistant(assistant: Assistant) -> Self {
		Self { assistant: Arc::new(assistant) }
	}
}
