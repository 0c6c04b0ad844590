//! Reusable multi-step creation wizard.
//!
//! A flow is described once by a [`WizardSchema`] (fields per step, the
//! dependency graph between them, option catalogs, repeatable lists and a
//! pricing table). [`WizardStateMachine`] drives a draft through the steps:
//!
//! ```text
//! input -> FieldValidator -> DependencyResolver -> draft -> CostEstimator -> view
//! ```
//!
//! [`NavigationGuard`] watches the machine's creation-started flag and decides
//! whether a navigation attempt needs the user's confirmation.

mod cost;
mod dependency;
mod draft;
mod error;
mod guard;
mod machine;
mod schema;
mod validator;

pub use cost::{
    format_money, CostBreakdown, CostEstimator, CostTotal, LineItem, PriceRule, PriceScope, PricingTable, Rate,
    HOURS_PER_MONTH,
};
pub use dependency::{DependencyGraph, DependencyResolver, OptionCatalog, OptionSource};
pub use draft::{ConfigurationDraft, RepeatableItem, RepeatableItemList};
pub use error::{SubmissionError, WizardError};
pub use guard::{NavigationDecision, NavigationGuard, NavigationIntent};
pub use machine::{
    run_cancellable, Notification, NotificationLevel, ResourceId, StepTransition, SubmissionOutcome,
    SubmissionStart, SubmissionTicket, WizardStateMachine,
};
pub use schema::{CountTriple, FieldRule, FieldSpec, ListSpec, Step, WizardSchema, WizardSchemaBuilder};
pub use validator::{
    check_node_counts, counts_key, is_valid_cidr, is_valid_name, item_key, parse_count, FieldValidator,
    ValidationErrors, ValidationResult, REQUIRED,
};
