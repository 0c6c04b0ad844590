use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::utils::build_query_string;
use crate::wizard::{
    ConfigurationDraft, NavigationGuard, Step, SubmissionError, WizardSchema, WizardStateMachine,
};

/// One open wizard: the state machine, its navigation guard and the cancel
/// handle of a pending submission.
#[derive(Debug)]
pub struct WizardSession {
    pub machine: WizardStateMachine,
    pub guard: NavigationGuard,
    cancel: Option<oneshot::Sender<()>>,
}

impl WizardSession {
    pub fn new(schema: Arc<WizardSchema>) -> Self {
        let guard = NavigationGuard::new(schema.section.clone());
        Self {
            machine: WizardStateMachine::new(schema),
            guard,
            cancel: None,
        }
    }

    /// Bring the guard in line with the machine's creation flag.
    pub fn sync_guard(&mut self) {
        self.guard.observe(self.machine.is_creation_started());
    }

    /// Register the cancel handle for the submission that just started.
    pub fn arm_cancel(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.cancel = Some(tx);
        rx
    }

    pub fn disarm_cancel(&mut self) {
        self.cancel = None;
    }

    /// Signal the pending submission to stop waiting. `false` if none was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Cancel the pending submission. When nothing is left waiting on the
    /// cancel handle, the attempt is closed here so the wizard is editable
    /// again.
    pub fn abandon_pending(&mut self) -> bool {
        if self.cancel_pending() {
            return true;
        }
        let Some(attempt) = self.machine.pending_attempt() else {
            return false;
        };
        let closed = self
            .machine
            .complete_submission(attempt, Err(SubmissionError::Cancelled))
            .is_ok();
        self.sync_guard();
        closed
    }
}

/// Read configuration-step values from a deep link's query parameters.
///
/// Only fields of the configuration step are taken; blank values are dropped.
pub fn parse_draft_query(schema: &WizardSchema, query: &HashMap<String, String>) -> BTreeMap<String, String> {
    schema
        .fields_for_step(Step::Configuration)
        .filter_map(|spec| {
            let value = query.get(&spec.name)?.trim();
            if value.is_empty() {
                None
            } else {
                Some((spec.name.clone(), value.to_string()))
            }
        })
        .collect()
}

/// Inverse of [`parse_draft_query`]: configuration values in schema order.
pub fn build_draft_query_pairs(schema: &WizardSchema, draft: &ConfigurationDraft) -> Vec<(String, String)> {
    let mut pairs = vec![("flow".to_string(), schema.flow.clone())];
    for spec in schema.fields_for_step(Step::Configuration) {
        if draft.is_set(&spec.name) {
            pairs.push((spec.name.clone(), draft.get(&spec.name).to_string()));
        }
    }
    pairs
}

/// URL that reopens a wizard with the current configuration step filled in.
pub fn deep_link(schema: &WizardSchema, draft: &ConfigurationDraft) -> String {
    format!("/wizards/new?{}", build_query_string(&build_draft_query_pairs(schema, draft)))
}
