use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use lib_whatpulse::adapter::{Adapter, ButtonInfo, EntitySink, SensorState};
use tracing::debug;

/// Latest published state of every entity, keyed by unique id.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    sensors: RwLock<BTreeMap<String, SensorState>>,
    buttons: RwLock<BTreeMap<String, ButtonInfo>>,
}

impl EntityRegistry {
    pub fn sensors(&self) -> Vec<SensorState> {
        let sensors = self.sensors.read().unwrap_or_else(PoisonError::into_inner);
        sensors.values().cloned().collect()
    }

    pub fn sensor(&self, unique_id: &str) -> Option<SensorState> {
        let sensors = self.sensors.read().unwrap_or_else(PoisonError::into_inner);
        sensors.get(unique_id).cloned()
    }

    pub fn buttons(&self) -> Vec<ButtonInfo> {
        let buttons = self.buttons.read().unwrap_or_else(PoisonError::into_inner);
        buttons.values().cloned().collect()
    }
}

impl EntitySink for EntityRegistry {
    fn publish_sensor(&self, state: SensorState) {
        debug!(unique_id = %state.unique_id, "Sensor state published");
        let mut sensors = self.sensors.write().unwrap_or_else(PoisonError::into_inner);
        sensors.insert(state.unique_id.clone(), state);
    }

    fn register_button(&self, button: ButtonInfo) {
        let mut buttons = self.buttons.write().unwrap_or_else(PoisonError::into_inner);
        buttons.insert(button.unique_id.clone(), button);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub adapter: Arc<Adapter>,
    pub registry: Arc<EntityRegistry>,
}

impl AppState {
    pub fn new(adapter: Arc<Adapter>, registry: Arc<EntityRegistry>) -> Self {
        Self { adapter, registry }
    }
}
