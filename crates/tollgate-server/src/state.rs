use std::sync::Arc;

use tollgate::{EventBus, Facilitator};

use crate::config::{GateConfig, RouteTable};

/// Shared application state for the gateway server.
///
/// The route table is read-only after startup; the event bus is the only
/// mutable state shared across concurrent requests. The bus is passed in
/// explicitly rather than living in a process-wide singleton so tests can
/// run gateways side by side.
pub struct GatewayState {
    pub routes: RouteTable,
    pub facilitator: Arc<dyn Facilitator>,
    pub bus: Arc<EventBus>,
    pub config: GateConfig,
}

impl GatewayState {
    pub fn new(
        routes: RouteTable,
        facilitator: Arc<dyn Facilitator>,
        bus: Arc<EventBus>,
        config: GateConfig,
    ) -> Self {
        Self {
            routes,
            facilitator,
            bus,
            config,
        }
    }
}
