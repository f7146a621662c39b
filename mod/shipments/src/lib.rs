pub mod api;
pub mod code;
pub mod effects;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod service;

use std::sync::Arc;

use axum::Router;
use shiptrack_core::{Authenticator, Module};

use service::ShipmentService;

/// Shipments Module — device shipment tracking and receiving.
pub struct ShipmentsModule {
    service: Arc<ShipmentService>,
    authenticator: Arc<dyn Authenticator>,
}

impl ShipmentsModule {
    pub fn new(service: ShipmentService, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            service: Arc::new(service),
            authenticator,
        }
    }
}

impl Module for ShipmentsModule {
    fn name(&self) -> &str {
        "shipments"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone(), self.authenticator.clone())
    }
}
