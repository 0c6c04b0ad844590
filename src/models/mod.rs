pub mod app_state;
pub mod requests;
pub mod wizard_view;

pub use app_state::AppState;
pub use requests::{CreateWizardRequest, FieldChangeRequest, ItemFieldRequest, NavigateRequest};
pub use wizard_view::{CostDisplay, GuardView, WizardView};
