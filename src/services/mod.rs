pub mod repository;
pub mod wizard_service;

// Re-export commonly used items
pub use repository::{InMemoryResourceRepository, Resource, ResourceRepository, VOLUMES_FLOW};
pub use wizard_service::{build_draft_query_pairs, deep_link, parse_draft_query, WizardSession};
