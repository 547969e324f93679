//! Application state shared by all handlers.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::uploads::UploadStore;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// The one lms.db connection
    pub db: DbPool,

    pub config: Arc<AppConfig>,

    /// Upload root (images, lecture notes, contents, quizzes)
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig) -> Self {
        let uploads = UploadStore::new(config.uploads_dir.clone());
        Self {
            db,
            config: Arc::new(config),
            uploads,
        }
    }
}
