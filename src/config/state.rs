// Application state module
// Everything a request needs, built once at startup and shared read-only

use std::sync::Arc;

use super::types::Config;
use crate::customer::{CustomerController, LoggingService};
use crate::routing::RouteTable;
use crate::store::CustomerStore;

/// Application state
pub struct AppState {
    pub config: Config,
    pub routes: RouteTable,
    pub customers: CustomerController,
}

impl AppState {
    /// Wire the collaborators explicitly; there is no container
    pub fn new(
        config: Config,
        store: Arc<dyn CustomerStore>,
        log_service: Arc<dyn LoggingService>,
    ) -> Self {
        let routes = RouteTable::new(&config.health);
        Self {
            config,
            routes,
            customers: CustomerController::new(store, log_service),
        }
    }
}
