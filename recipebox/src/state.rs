use crate::config::Config;
use crate::db::DB;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DB,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DB, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}
