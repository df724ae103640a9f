use crate::config::ServerConfig;
use crate::monitor::engine::RefreshEngine;
use crate::monitor::service::MonitorService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RefreshEngine>,
    pub service: Arc<MonitorService>,
    pub config: Arc<ServerConfig>,
}
