use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::AppState;
use crate::services::WizardSession;
use crate::wizard::WizardError;

/// Errors surfaced by the HTTP shell.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No wizard, flow or resource with that id
    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Wizard(e) => match e {
                WizardError::UnknownField(_) | WizardError::UnknownList(_) | WizardError::UnknownItem { .. } => {
                    StatusCode::NOT_FOUND
                }
                WizardError::InvalidTransition { .. }
                | WizardError::SubmissionInFlight
                | WizardError::Locked
                | WizardError::Completed
                | WizardError::NoPendingSubmission => StatusCode::CONFLICT,
                WizardError::ProtectedItem { .. }
                | WizardError::MinimumItems { .. }
                | WizardError::DependencyViolation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                WizardError::DependencyCycle { .. } | WizardError::UndeclaredDependency(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
            ApiError::Wizard(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }
        (status, Json(json!({"error": self.to_string(), "kind": self.kind()}))).into_response()
    }
}

pub fn get_session<'a>(
    sessions: &'a mut HashMap<String, WizardSession>,
    id: &str,
) -> Result<&'a mut WizardSession, ApiError> {
    sessions
        .get_mut(id)
        .ok_or_else(|| ApiError::NotFound(format!("Wizard {}", id)))
}

/// Run `f` against a session and resync its guard afterwards.
pub fn with_session<T>(
    state: &AppState,
    id: &str,
    f: impl FnOnce(&mut WizardSession) -> Result<T, WizardError>,
) -> Result<T, ApiError> {
    let mut sessions = state.sessions.lock().unwrap();
    let session = get_session(&mut sessions, id)?;
    let out = f(session)?;
    session.sync_guard();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::Step;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(WizardError::Locked).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(WizardError::InvalidTransition {
                from: Step::Configuration,
                action: "submit"
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(WizardError::ProtectedItem {
                list: "node_pools".into(),
                id: 1
            })
            .status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn kind_passes_through() {
        assert_eq!(ApiError::from(WizardError::Completed).kind(), "completed");
        assert_eq!(ApiError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(ApiError::Internal("panicked".into()).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
