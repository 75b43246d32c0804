use std::sync::{Arc, Mutex};

use platewatch_common::config::ReceiverConfig;

use crate::registry::{RegistryError, VehicleRegistry};
use crate::slots::ParkingSlots;

/// Shared by the notification listener and the HTTP handlers.
pub struct AppState {
    pub registry: Arc<VehicleRegistry>,
    pub slots: Mutex<ParkingSlots>,
}

impl AppState {
    pub fn open(config: &ReceiverConfig) -> Result<Self, RegistryError> {
        Ok(Self {
            registry: Arc::new(VehicleRegistry::open(&config.db_path)?),
            slots: Mutex::new(ParkingSlots::new(config.slots)),
        })
    }
}
