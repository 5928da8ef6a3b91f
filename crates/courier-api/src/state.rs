use std::sync::Arc;

use courier_automation::Automation;
use courier_chatlog::ChatLogReader;
use courier_db::Database;
use courier_gateway::Hub;

/// Shared state for all bridge API handlers.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub chatlog: Arc<ChatLogReader>,
    pub automation: Automation,
    pub hub: Hub,
    pub history_limit: u32,
    pub typing_indicator: bool,
}

pub type AppState = Arc<AppStateInner>;
