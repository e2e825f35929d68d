use std::sync::Arc;

use haggle::Marketplace;

use crate::config::Config;

/// Shared application state passed to all handlers
///
/// The marketplace services are cheap to clone and hold no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub market: Marketplace,
}

impl AppState {
    pub fn new(config: Config, market: Marketplace) -> Self {
        Self {
            config: Arc::new(config),
            market,
        }
    }
}
