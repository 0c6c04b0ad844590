/// Error types for the wizard core
use thiserror::Error;

use super::schema::Step;

/// Usage and programming errors raised by the wizard core.
///
/// Field validation failures are never reported through this type; they live
/// in [`super::ValidationErrors`] as data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    /// The dependency graph of a schema contains a cycle
    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle {
        /// Fields forming the cycle, first field repeated at the end
        path: Vec<String>,
    },

    /// A dependency edge names a field the schema does not declare
    #[error("Dependency on undeclared field '{0}'")]
    UndeclaredDependency(String),

    /// The field is not part of the flow schema
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// The repeatable list is not part of the flow schema
    #[error("Unknown list: {0}")]
    UnknownList(String),

    /// No item with that id exists in the list
    #[error("No item {id} in list '{list}'")]
    UnknownItem { list: String, id: u64 },

    /// The item is the protected default entry of its list
    #[error("Item {id} is the default entry of '{list}' and cannot be removed")]
    ProtectedItem { list: String, id: u64 },

    /// The list already holds the minimum number of items
    #[error("List '{list}' must keep at least {min} item(s)")]
    MinimumItems { list: String, min: usize },

    /// The requested transition is not available from the current step
    #[error("Cannot {action} from step {from:?}")]
    InvalidTransition { from: Step, action: &'static str },

    /// A submission is already pending for this wizard
    #[error("A submission is already in flight")]
    SubmissionInFlight,

    /// The draft cannot be edited while a submission is pending
    #[error("The wizard is locked while a submission is in flight")]
    Locked,

    /// The wizard already produced a resource and is finished
    #[error("The wizard has already completed")]
    Completed,

    /// The ticket does not belong to the pending submission
    #[error("No matching submission is pending")]
    NoPendingSubmission,

    /// Options were requested for a field whose prerequisite is unset
    #[error("Options for '{field}' require '{prerequisite}' to be set first")]
    DependencyViolation { field: String, prerequisite: String },
}

impl WizardError {
    /// Stable machine-readable identifier, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            WizardError::DependencyCycle { .. } => "dependency_cycle",
            WizardError::UndeclaredDependency(_) => "undeclared_dependency",
            WizardError::UnknownField(_) => "unknown_field",
            WizardError::UnknownList(_) => "unknown_list",
            WizardError::UnknownItem { .. } => "unknown_item",
            WizardError::ProtectedItem { .. } => "protected_item",
            WizardError::MinimumItems { .. } => "minimum_items",
            WizardError::InvalidTransition { .. } => "invalid_transition",
            WizardError::SubmissionInFlight => "submission_in_flight",
            WizardError::Locked => "locked",
            WizardError::Completed => "completed",
            WizardError::NoPendingSubmission => "no_pending_submission",
            WizardError::DependencyViolation { .. } => "dependency_violation",
        }
    }
}

/// Failures reported by the provisioning backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The backend refused the configuration
    #[error("Creation rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or answered garbage
    #[error("Network error: {0}")]
    Transport(String),

    /// The user abandoned the flow before the backend answered
    #[error("Creation cancelled")]
    Cancelled,
}
