use async_trait::async_trait;
use chrono::Utc;
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::client::api_call;
use crate::services::repository::{Resource, ResourceRepository};
use crate::wizard::{ResourceId, SubmissionError, SubmissionTicket};

/// Collaborator that turns a validated draft into a real resource.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    async fn submit_configuration(&self, ticket: &SubmissionTicket) -> Result<ResourceId, SubmissionError>;

    fn name(&self) -> &'static str;
}

fn resource_prefix(flow: &str) -> &'static str {
    match flow {
        "kubernetes" => "k8s",
        "load-balancers" => "lb",
        "volumes" => "vol",
        _ => "res",
    }
}

fn random_suffix() -> String {
    let mut b = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut b);
    hex::encode(b)
}

/// In-process backend: waits, then records the resource in the repository.
///
/// With `fail_every = n > 0` every n-th submission is rejected.
pub struct SimulatedBackend {
    latency: Duration,
    fail_every: u64,
    submissions: AtomicU64,
    repository: Arc<dyn ResourceRepository>,
}

impl SimulatedBackend {
    pub fn new(repository: Arc<dyn ResourceRepository>, latency: Duration, fail_every: u64) -> Self {
        Self {
            latency,
            fail_every,
            submissions: AtomicU64::new(0),
            repository,
        }
    }

    pub fn submissions(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProvisioningBackend for SimulatedBackend {
    async fn submit_configuration(&self, ticket: &SubmissionTicket) -> Result<ResourceId, SubmissionError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            tracing::warn!(flow = %ticket.flow, submission = n, "Simulated backend rejecting submission");
            return Err(SubmissionError::Rejected("the provider is out of capacity, try again".into()));
        }
        if let Some(existing) = self.repository.find_by_key(&ticket.idempotency_key) {
            tracing::info!(resource = %existing.id, "Replayed submission, returning existing resource");
            return Ok(existing.id);
        }

        let id = ResourceId(format!("{}-{}", resource_prefix(&ticket.flow), random_suffix()));
        let name = match ticket.draft.get("name") {
            "" => id.0.clone(),
            n => n.to_string(),
        };
        self.repository.create(Resource {
            id: id.clone(),
            flow: ticket.flow.clone(),
            name,
            region: ticket.draft.get("region").to_string(),
            idempotency_key: ticket.idempotency_key.clone(),
            fields: ticket.draft.fields().clone(),
            created_at: Utc::now(),
        });
        tracing::info!(flow = %ticket.flow, resource = %id, "Simulated backend created resource");
        Ok(id)
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Forwards the draft to a provisioning API.
///
/// `POST {base}/v1/{flow}` with the draft as JSON; the response's `data.id`
/// (or top-level `id`) is the created resource.
pub struct HttpBackend {
    client: reqwest::Client,
    api_base_url: String,
    api_token: String,
}

impl HttpBackend {
    pub fn new(client: reqwest::Client, api_base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into(),
            api_token: api_token.into(),
        }
    }
}

#[async_trait]
impl ProvisioningBackend for HttpBackend {
    async fn submit_configuration(&self, ticket: &SubmissionTicket) -> Result<ResourceId, SubmissionError> {
        let body = serde_json::to_value(&ticket.draft).map_err(|e| SubmissionError::Rejected(e.to_string()))?;
        let endpoint = format!("/v1/{}", ticket.flow);
        let payload = api_call(
            &self.client,
            &self.api_base_url,
            &self.api_token,
            "POST",
            &endpoint,
            Some(body),
            &[("Idempotency-Key", ticket.idempotency_key.clone())],
        )
        .await?;

        payload
            .get("data")
            .and_then(|d| d.get("id"))
            .or_else(|| payload.get("id"))
            .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_u64().map(|n| n.to_string())))
            .map(ResourceId)
            .ok_or_else(|| SubmissionError::Rejected("response did not include a resource id".into()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::repository::InMemoryResourceRepository;
    use crate::wizard::ConfigurationDraft;

    fn ticket(key: &str) -> SubmissionTicket {
        let mut draft = ConfigurationDraft::new();
        draft.set("name", "data-1");
        draft.set("region", "eu-west-1");
        SubmissionTicket {
            attempt: 1,
            wizard_id: "w1".into(),
            flow: "volumes".into(),
            idempotency_key: key.into(),
            draft,
        }
    }

    #[tokio::test]
    async fn simulated_backend_records_resource() {
        let repo = Arc::new(InMemoryResourceRepository::new());
        let backend = SimulatedBackend::new(repo.clone(), Duration::ZERO, 0);
        let id = backend.submit_configuration(&ticket("k1")).await.unwrap();
        assert!(id.0.starts_with("vol-"));
        let stored = repo.list_volumes();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "data-1");
        assert_eq!(stored[0].region, "eu-west-1");
    }

    #[tokio::test]
    async fn simulated_backend_fails_every_nth() {
        let repo = Arc::new(InMemoryResourceRepository::new());
        let backend = SimulatedBackend::new(repo, Duration::ZERO, 2);
        assert!(backend.submit_configuration(&ticket("a")).await.is_ok());
        assert!(matches!(
            backend.submit_configuration(&ticket("b")).await,
            Err(SubmissionError::Rejected(_))
        ));
        assert_eq!(backend.submissions(), 2);
    }

    #[tokio::test]
    async fn simulated_backend_deduplicates_by_key() {
        let repo = Arc::new(InMemoryResourceRepository::new());
        let backend = SimulatedBackend::new(repo.clone(), Duration::ZERO, 0);
        let first = backend.submit_configuration(&ticket("same")).await.unwrap();
        let second = backend.submit_configuration(&ticket("same")).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.list().len(), 1);
    }
}
