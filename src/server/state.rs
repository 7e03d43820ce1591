use std::sync::Arc;

use crate::config::Settings;
use crate::realtime::{BroadcastManager, RealtimeNotifier};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub broadcast_manager: Arc<BroadcastManager>,
    pub notifier: RealtimeNotifier,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let broadcast_manager = Arc::new(BroadcastManager::new());
        let notifier = RealtimeNotifier::new(broadcast_manager.clone());

        Self {
            settings: Arc::new(settings),
            broadcast_manager,
            notifier,
        }
    }
}
