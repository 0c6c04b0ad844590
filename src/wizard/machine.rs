use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::api::ProvisioningBackend;

use super::cost::{CostBreakdown, CostEstimator};
use super::dependency::DependencyResolver;
use super::draft::{ConfigurationDraft, RepeatableItemList};
use super::error::{SubmissionError, WizardError};
use super::schema::{ListSpec, Step, WizardSchema};
use super::validator::{counts_key, item_key, FieldValidator, ValidationErrors, ValidationResult};

/// Identifier the backend assigns to a created resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Dismissable message shown next to the wizard, never blocking it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Result of `advance_step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepTransition {
    Advanced { step: Step },
    /// Validation failed; `invalid` fields are listed in the error map.
    Blocked { invalid: usize },
}

/// Everything the backend needs for one creation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionTicket {
    pub attempt: u64,
    pub wizard_id: String,
    pub flow: String,
    /// Stable for an unchanged draft, so a retried request can be deduplicated.
    pub idempotency_key: String,
    pub draft: ConfigurationDraft,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionStart {
    Started(SubmissionTicket),
    Blocked { invalid: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Created(ResourceId),
    Failed(String),
    Cancelled,
    Blocked { invalid: usize },
}

/// Two-step creation wizard over a [`WizardSchema`].
///
/// Owns its draft exclusively. All operations except submission complete
/// synchronously; a submission is split into [`begin_submission`] and
/// [`complete_submission`] so callers can await the backend without holding
/// the machine.
///
/// [`begin_submission`]: WizardStateMachine::begin_submission
/// [`complete_submission`]: WizardStateMachine::complete_submission
#[derive(Debug, Clone)]
pub struct WizardStateMachine {
    id: String,
    schema: Arc<WizardSchema>,
    draft: ConfigurationDraft,
    step: Step,
    errors: ValidationErrors,
    cost: CostBreakdown,
    creation_started: bool,
    submitting: bool,
    pending: Option<u64>,
    attempts: u64,
    created: Option<ResourceId>,
    notifications: Vec<Notification>,
    next_notification: u64,
}

impl WizardStateMachine {
    pub fn new(schema: Arc<WizardSchema>) -> Self {
        let mut b = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut b);
        Self::with_id(schema, hex::encode(b))
    }

    /// Fresh wizard with schema defaults and the initial list items.
    pub fn with_id(schema: Arc<WizardSchema>, id: impl Into<String>) -> Self {
        let mut draft = ConfigurationDraft::new();
        for spec in &schema.fields {
            if let Some(default) = &spec.default {
                draft.set(&spec.name, default);
            }
        }
        for list in &schema.lists {
            let mut items = RepeatableItemList::default();
            for n in 0..list.initial_items {
                let (next, _) = items.with_item(item_defaults(list), n == 0 && list.protect_default);
                items = next;
            }
            draft.replace_list(&list.name, items);
        }
        let cost = CostEstimator::new(&schema.pricing).estimate(&draft);
        Self {
            id: id.into(),
            schema,
            draft,
            step: Step::Configuration,
            errors: ValidationErrors::new(),
            cost,
            creation_started: false,
            submitting: false,
            pending: None,
            attempts: 0,
            created: None,
            notifications: Vec::new(),
            next_notification: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &WizardSchema {
        &self.schema
    }

    pub fn draft(&self) -> &ConfigurationDraft {
        &self.draft
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn cost(&self) -> &CostBreakdown {
        &self.cost
    }

    pub fn is_creation_started(&self) -> bool {
        self.creation_started
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Attempt number of the submission awaiting its result, if any.
    pub fn pending_attempt(&self) -> Option<u64> {
        self.pending
    }

    pub fn created(&self) -> Option<&ResourceId> {
        self.created.as_ref()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Remove a notification; `false` if it was already gone.
    pub fn dismiss_notification(&mut self, id: u64) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        before != self.notifications.len()
    }

    /// Options currently selectable for a scalar field or `list.field` key.
    pub fn options_for(&self, field: &str) -> Result<Vec<String>, WizardError> {
        self.schema.catalog.options_for(field, &self.draft)
    }

    /// Apply a batch of values in schema declaration order, so that upstream
    /// fields are set before the fields that depend on them. Unknown keys are
    /// returned instead of applied.
    pub fn prefill(&mut self, values: &BTreeMap<String, String>) -> Result<Vec<String>, WizardError> {
        let names: Vec<String> = self.schema.fields.iter().map(|f| f.name.clone()).collect();
        for name in &names {
            if let Some(value) = values.get(name) {
                self.field_change(name, value)?;
            }
        }
        Ok(values
            .keys()
            .filter(|k| !names.contains(k))
            .cloned()
            .collect())
    }

    /// Set a scalar field and reset everything depending on it.
    ///
    /// The value is stored trimmed. Returns the fields that were reset.
    pub fn field_change(&mut self, field: &str, value: &str) -> Result<Vec<String>, WizardError> {
        self.ensure_editable()?;
        let value = value.trim();
        if self.schema.field_spec(field).is_none() {
            return Err(WizardError::UnknownField(field.to_string()));
        }
        let (draft, reset) =
            DependencyResolver::new(&self.schema.dependencies).on_field_change(field, value, &self.draft);
        self.draft = draft;

        let validator = FieldValidator::new(&self.schema);
        for key in std::iter::once(field).chain(reset.iter().map(String::as_str)) {
            if self.errors.contains(key) && validator.validate(key, self.draft.get(key), &self.draft).is_valid() {
                self.errors.remove(key);
            }
        }
        self.refresh_cost();
        tracing::debug!(wizard = %self.id, field, ?reset, "Field changed");
        Ok(reset)
    }

    /// Move to the next step if every field of the current one is valid.
    ///
    /// On failure all failing fields are reported at once.
    pub fn advance_step(&mut self) -> Result<StepTransition, WizardError> {
        self.ensure_editable()?;
        let next = self.step.next().ok_or(WizardError::InvalidTransition {
            from: self.step,
            action: "advance",
        })?;
        self.errors = FieldValidator::new(&self.schema).validate_step(self.step, &self.draft);
        if self.errors.is_empty() {
            tracing::info!(wizard = %self.id, from = ?self.step, to = ?next, "Advanced step");
            self.step = next;
            Ok(StepTransition::Advanced { step: next })
        } else {
            let invalid = self.errors.len();
            tracing::info!(wizard = %self.id, step = ?self.step, invalid, "Advance blocked by validation");
            Ok(StepTransition::Blocked { invalid })
        }
    }

    /// Return to the previous step; the draft is kept as is.
    pub fn go_back(&mut self) -> Result<Step, WizardError> {
        self.ensure_editable()?;
        let previous = self.step.previous().ok_or(WizardError::InvalidTransition {
            from: self.step,
            action: "go back",
        })?;
        self.step = previous;
        self.errors = ValidationErrors::new();
        tracing::info!(wizard = %self.id, to = ?previous, "Went back");
        Ok(previous)
    }

    pub fn add_item(&mut self, list: &str) -> Result<u64, WizardError> {
        self.ensure_editable()?;
        let spec = self.list_spec(list)?;
        let defaults = item_defaults(spec);
        let (updated, id) = self.current_list(list).with_item(defaults, false);
        self.draft.replace_list(list, updated);
        self.refresh_cost();
        tracing::debug!(wizard = %self.id, list, id, "Item added");
        Ok(id)
    }

    pub fn remove_item(&mut self, list: &str, id: u64) -> Result<(), WizardError> {
        self.ensure_editable()?;
        let min = self.list_spec(list)?.min_items;
        let updated = self.current_list(list).without(list, id)?;
        if updated.len() < min {
            return Err(WizardError::MinimumItems {
                list: list.to_string(),
                min,
            });
        }
        self.draft.replace_list(list, updated);
        self.errors.remove_prefix(&format!("{}.{}.", list, id));
        self.refresh_cost();
        tracing::debug!(wizard = %self.id, list, id, "Item removed");
        Ok(())
    }

    /// Set one field of a list item, stored trimmed.
    ///
    /// Editing any of min/desired/max re-checks the item's count invariant
    /// right away; other fields only lose a stale error once valid.
    pub fn update_item_field(&mut self, list: &str, id: u64, field: &str, value: &str) -> Result<(), WizardError> {
        self.ensure_editable()?;
        let value = value.trim();
        let spec = self.list_spec(list)?.clone();
        if spec.field_spec(field).is_none() {
            return Err(WizardError::UnknownField(format!("{}.{}", list, field)));
        }
        let updated = self.current_list(list).with_value(list, id, field, value)?;
        self.draft.replace_list(list, updated);

        let validator = FieldValidator::new(&self.schema);
        let key = item_key(list, id, field);
        if self.errors.contains(&key)
            && validator
                .validate_item_field(&spec, field, value, &self.draft)
                .is_valid()
        {
            self.errors.remove(&key);
        }
        let counts = counts_key(list, id);
        let touches_counts = spec.counts.as_ref().map(|c| c.contains(field)).unwrap_or(false);
        if touches_counts {
            if let Some(item) = self.draft.list(list).and_then(|l| l.get(id)) {
                match validator.validate_counts(&spec, item) {
                    ValidationResult::Valid => {
                        self.errors.remove(&counts);
                    }
                    ValidationResult::Invalid(reason) => self.errors.insert(counts, reason),
                }
            }
        }
        self.refresh_cost();
        Ok(())
    }

    /// Validate everything and, if clean, mark creation as started.
    ///
    /// Only one submission may be pending at a time.
    pub fn begin_submission(&mut self) -> Result<SubmissionStart, WizardError> {
        if self.created.is_some() {
            return Err(WizardError::Completed);
        }
        if self.submitting {
            return Err(WizardError::SubmissionInFlight);
        }
        if self.step != Step::ResourcesAndAddons {
            return Err(WizardError::InvalidTransition {
                from: self.step,
                action: "submit",
            });
        }
        self.errors = FieldValidator::new(&self.schema).validate_all(&self.draft);
        if !self.errors.is_empty() {
            let invalid = self.errors.len();
            tracing::info!(wizard = %self.id, invalid, "Submission blocked by validation");
            return Ok(SubmissionStart::Blocked { invalid });
        }
        self.attempts += 1;
        self.pending = Some(self.attempts);
        self.submitting = true;
        self.creation_started = true;
        let ticket = SubmissionTicket {
            attempt: self.attempts,
            wizard_id: self.id.clone(),
            flow: self.schema.flow.clone(),
            idempotency_key: self.idempotency_key(),
            draft: self.draft.clone(),
        };
        tracing::info!(wizard = %self.id, attempt = ticket.attempt, "Creation started");
        Ok(SubmissionStart::Started(ticket))
    }

    /// Record the backend's answer for the pending attempt.
    ///
    /// A failure leaves the draft untouched and the wizard editable.
    pub fn complete_submission(
        &mut self,
        attempt: u64,
        result: Result<ResourceId, SubmissionError>,
    ) -> Result<SubmissionOutcome, WizardError> {
        if self.pending != Some(attempt) {
            return Err(WizardError::NoPendingSubmission);
        }
        self.pending = None;
        self.submitting = false;
        self.creation_started = false;
        match result {
            Ok(id) => {
                tracing::info!(wizard = %self.id, resource = %id, "Creation succeeded");
                self.notify(
                    NotificationLevel::Success,
                    format!("{} {} is being created", self.schema.title, id),
                );
                self.created = Some(id.clone());
                Ok(SubmissionOutcome::Created(id))
            }
            Err(SubmissionError::Cancelled) => {
                tracing::info!(wizard = %self.id, "Creation cancelled");
                self.notify(NotificationLevel::Info, SubmissionError::Cancelled.to_string());
                Ok(SubmissionOutcome::Cancelled)
            }
            Err(e) => {
                tracing::warn!(wizard = %self.id, %e, "Creation failed");
                self.notify(NotificationLevel::Error, e.to_string());
                Ok(SubmissionOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Run a whole submission against `backend`.
    pub async fn submit(&mut self, backend: &dyn ProvisioningBackend) -> Result<SubmissionOutcome, WizardError> {
        let ticket = match self.begin_submission()? {
            SubmissionStart::Started(ticket) => ticket,
            SubmissionStart::Blocked { invalid } => return Ok(SubmissionOutcome::Blocked { invalid }),
        };
        let result = backend.submit_configuration(&ticket).await;
        self.complete_submission(ticket.attempt, result)
    }

    /// Like [`submit`](Self::submit), but gives up as soon as `cancel` fires.
    ///
    /// Dropping the sender without sending does not cancel.
    pub async fn submit_with_cancel(
        &mut self,
        backend: &dyn ProvisioningBackend,
        cancel: oneshot::Receiver<()>,
    ) -> Result<SubmissionOutcome, WizardError> {
        let ticket = match self.begin_submission()? {
            SubmissionStart::Started(ticket) => ticket,
            SubmissionStart::Blocked { invalid } => return Ok(SubmissionOutcome::Blocked { invalid }),
        };
        let result = run_cancellable(backend, &ticket, cancel).await;
        self.complete_submission(ticket.attempt, result)
    }

    fn ensure_editable(&self) -> Result<(), WizardError> {
        if self.created.is_some() {
            return Err(WizardError::Completed);
        }
        if self.submitting {
            return Err(WizardError::Locked);
        }
        Ok(())
    }

    fn list_spec(&self, list: &str) -> Result<&ListSpec, WizardError> {
        self.schema
            .list_spec(list)
            .ok_or_else(|| WizardError::UnknownList(list.to_string()))
    }

    fn current_list(&self, list: &str) -> RepeatableItemList {
        self.draft.list(list).cloned().unwrap_or_default()
    }

    fn refresh_cost(&mut self) {
        self.cost = CostEstimator::new(&self.schema.pricing).estimate(&self.draft);
    }

    fn notify(&mut self, level: NotificationLevel, message: String) {
        self.next_notification += 1;
        self.notifications.push(Notification {
            id: self.next_notification,
            level,
            message,
            created_at: Utc::now(),
        });
    }

    fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.schema.flow.as_bytes());
        hasher.update(b"\n");
        hasher.update(serde_json::to_string(&self.draft).unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Await the backend unless `cancel` fires first.
pub async fn run_cancellable(
    backend: &dyn ProvisioningBackend,
    ticket: &SubmissionTicket,
    cancel: oneshot::Receiver<()>,
) -> Result<ResourceId, SubmissionError> {
    tokio::select! {
        result = backend.submit_configuration(ticket) => result,
        Ok(()) = cancel => Err(SubmissionError::Cancelled),
    }
}

fn item_defaults(list: &ListSpec) -> BTreeMap<String, String> {
    list.fields
        .iter()
        .filter_map(|f| f.default.as_ref().map(|d| (f.name.clone(), d.clone())))
        .collect()
}
