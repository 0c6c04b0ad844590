use serde::Serialize;

use crate::services::{deep_link, WizardSession};
use crate::wizard::{
    format_money, ConfigurationDraft, CostBreakdown, NavigationIntent, Notification, ResourceId, Step,
    ValidationErrors,
};

#[derive(Debug, Clone, Serialize)]
pub struct GuardView {
    pub armed: bool,
    pub pending: Option<NavigationIntent>,
}

/// Money rounded for display; the raw breakdown stays unrounded.
#[derive(Debug, Clone, Serialize)]
pub struct CostDisplay {
    pub hourly: String,
    pub monthly: String,
}

/// Everything the shell renders for one wizard.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub id: String,
    pub flow: String,
    pub title: String,
    pub step: Step,
    pub step_label: &'static str,
    pub draft: ConfigurationDraft,
    pub validation_errors: ValidationErrors,
    pub cost: CostBreakdown,
    pub cost_display: CostDisplay,
    pub creation_started: bool,
    pub submitting: bool,
    pub created: Option<ResourceId>,
    pub notifications: Vec<Notification>,
    pub guard: GuardView,
    pub deep_link: String,
}

impl From<&WizardSession> for WizardView {
    fn from(session: &WizardSession) -> Self {
        let m = &session.machine;
        let schema = m.schema();
        WizardView {
            id: m.id().to_string(),
            flow: schema.flow.clone(),
            title: schema.title.clone(),
            step: m.step(),
            step_label: m.step().label(),
            draft: m.draft().clone(),
            validation_errors: m.errors().clone(),
            cost: m.cost().clone(),
            cost_display: CostDisplay {
                hourly: format_money(m.cost().total.hourly),
                monthly: format_money(m.cost().total.monthly),
            },
            creation_started: m.is_creation_started(),
            submitting: m.is_submitting(),
            created: m.created().cloned(),
            notifications: m.notifications().to_vec(),
            guard: GuardView {
                armed: session.guard.is_armed(),
                pending: session.guard.pending().cloned(),
            },
            deep_link: deep_link(schema, m.draft()),
        }
    }
}
