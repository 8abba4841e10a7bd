//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::PongMatch;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub game: Arc<PongMatch>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let game = Arc::new(PongMatch::from_config(&config));

        Self {
            config: Arc::new(config),
            game,
        }
    }
}
