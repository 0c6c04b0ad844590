use serde::Deserialize;
use std::collections::BTreeMap;

use crate::wizard::NavigationIntent;

#[derive(Debug, Deserialize)]
pub struct CreateWizardRequest {
    pub flow: String,
    #[serde(default)]
    pub prefill: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct FieldChangeRequest {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemFieldRequest {
    pub field: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub intent: NavigationIntent,
}
