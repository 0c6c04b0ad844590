use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::api::ProvisioningBackend;
use crate::schemas::SchemaRegistry;
use crate::services::{ResourceRepository, WizardSession};

#[derive(Clone)]
pub struct AppState {
    pub schemas: Arc<SchemaRegistry>,
    /// Open wizards keyed by wizard id. Each session owns its draft.
    pub sessions: Arc<Mutex<HashMap<String, WizardSession>>>,
    pub backend: Arc<dyn ProvisioningBackend>,
    pub repository: Arc<dyn ResourceRepository>,
}

impl AppState {
    pub fn new(
        schemas: SchemaRegistry,
        backend: Arc<dyn ProvisioningBackend>,
        repository: Arc<dyn ResourceRepository>,
    ) -> Self {
        Self {
            schemas: Arc::new(schemas),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            backend,
            repository,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}
