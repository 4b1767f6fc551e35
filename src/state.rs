use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::host::HostApi;
use crate::livekit::RoomService;
use crate::store::ConfigStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: ConfigStore,
    pub host: Arc<dyn HostApi>,
    pub rooms: Arc<dyn RoomService>,
    bot_user_id: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        config: Config,
        settings: ConfigStore,
        host: Arc<dyn HostApi>,
        rooms: Arc<dyn RoomService>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            settings,
            host,
            rooms,
            bot_user_id: Arc::new(RwLock::new(None)),
        }
    }

    /// User id of the bot that authors room posts, once activated.
    pub fn bot_user_id(&self) -> Option<String> {
        self.bot_user_id.read().clone()
    }

    pub fn set_bot_user_id(&self, user_id: Option<String>) {
        *self.bot_user_id.write() = user_id;
    }
}
