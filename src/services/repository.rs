use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::wizard::ResourceId;

pub const VOLUMES_FLOW: &str = "volumes";

/// A resource the backend has accepted for creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: ResourceId,
    pub flow: String,
    pub name: String,
    pub region: String,
    pub idempotency_key: String,
    pub fields: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Storage for created resources, injected into backends and handlers.
pub trait ResourceRepository: Send + Sync {
    fn list(&self) -> Vec<Resource>;

    fn list_volumes(&self) -> Vec<Resource> {
        self.list().into_iter().filter(|r| r.flow == VOLUMES_FLOW).collect()
    }

    fn find_by_key(&self, idempotency_key: &str) -> Option<Resource>;

    fn create(&self, resource: Resource) -> Resource;

    /// Returns the removed resource, `None` if there was nothing to remove.
    fn delete(&self, id: &str) -> Option<Resource>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceRepository {
    resources: Arc<Mutex<Vec<Resource>>>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceRepository for InMemoryResourceRepository {
    fn list(&self) -> Vec<Resource> {
        self.resources.lock().unwrap().clone()
    }

    fn find_by_key(&self, idempotency_key: &str) -> Option<Resource> {
        self.resources
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.idempotency_key == idempotency_key)
            .cloned()
    }

    fn create(&self, resource: Resource) -> Resource {
        self.resources.lock().unwrap().push(resource.clone());
        resource
    }

    fn delete(&self, id: &str) -> Option<Resource> {
        let mut resources = self.resources.lock().unwrap();
        let pos = resources.iter().position(|r| r.id.0 == id)?;
        Some(resources.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: &str, flow: &str) -> Resource {
        Resource {
            id: ResourceId(id.into()),
            flow: flow.into(),
            name: id.into(),
            region: "us-east-1".into(),
            idempotency_key: format!("key-{}", id),
            fields: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn list_volumes_filters_by_flow() {
        let repo = InMemoryResourceRepository::new();
        repo.create(resource("vol-1", "volumes"));
        repo.create(resource("k8s-1", "kubernetes"));
        let volumes = repo.list_volumes();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].id.0, "vol-1");
        assert_eq!(repo.list().len(), 2);
    }

    #[test]
    fn delete_removes_once() {
        let repo = InMemoryResourceRepository::new();
        repo.create(resource("vol-1", "volumes"));
        assert!(repo.delete("vol-1").is_some());
        assert!(repo.delete("vol-1").is_none());
        assert!(repo.list().is_empty());
    }

    #[test]
    fn find_by_key_matches_idempotency_key() {
        let repo = InMemoryResourceRepository::new();
        repo.create(resource("vol-1", "volumes"));
        assert_eq!(repo.find_by_key("key-vol-1").map(|r| r.id.0), Some("vol-1".to_string()));
        assert!(repo.find_by_key("missing").is_none());
    }
}
