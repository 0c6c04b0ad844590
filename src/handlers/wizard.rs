use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::oneshot;

use crate::handlers::helpers::{get_session, with_session, ApiError};
use crate::models::{AppState, CreateWizardRequest, FieldChangeRequest, ItemFieldRequest, NavigateRequest, WizardView};
use crate::services::{parse_draft_query, WizardSession};
use crate::wizard::{
    run_cancellable, ResourceId, SubmissionError, SubmissionOutcome, SubmissionStart, SubmissionTicket,
};

fn open_session(
    state: &AppState,
    flow: &str,
    prefill: &BTreeMap<String, String>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let schema = state
        .schemas
        .get(flow)
        .ok_or_else(|| ApiError::NotFound(format!("Flow {}", flow)))?;
    let mut session = WizardSession::new(schema);
    let ignored = session.machine.prefill(prefill)?;
    let view = WizardView::from(&session);
    tracing::info!(wizard = %view.id, flow, prefilled = prefill.len(), "Wizard opened");
    state
        .sessions
        .lock()
        .unwrap()
        .insert(view.id.clone(), session);
    Ok((StatusCode::CREATED, Json(json!({"wizard": view, "ignored": ignored}))))
}

pub async fn create_wizard(
    State(state): State<AppState>,
    Json(req): Json<CreateWizardRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    open_session(&state, &req.flow, &req.prefill)
}

/// Deep link: `/wizards/new?flow=volumes&region=eu-west-1&...`.
pub async fn new_wizard_from_query(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let flow = query.get("flow").map(|s| s.trim().to_string()).unwrap_or_default();
    let schema = state
        .schemas
        .get(&flow)
        .ok_or_else(|| ApiError::NotFound(format!("Flow {}", flow)))?;
    let prefill = parse_draft_query(&schema, &query);
    open_session(&state, &flow, &prefill)
}

pub async fn get_wizard(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<WizardView>, ApiError> {
    with_session(&state, &id, |s| Ok(WizardView::from(&*s))).map(Json)
}

pub async fn change_field(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<FieldChangeRequest>,
) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        let reset = s.machine.field_change(&req.name, &req.value)?;
        Ok(json!({"reset": reset, "wizard": WizardView::from(&*s)}))
    })
    .map(Json)
}

pub async fn field_options(
    State(state): State<AppState>,
    Path((id, field)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        let options = s.machine.options_for(&field)?;
        Ok(json!({"field": field, "options": options}))
    })
    .map(Json)
}

pub async fn advance_step(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        let transition = s.machine.advance_step()?;
        Ok(json!({"transition": transition, "wizard": WizardView::from(&*s)}))
    })
    .map(Json)
}

pub async fn go_back(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        let step = s.machine.go_back()?;
        Ok(json!({"step": step, "wizard": WizardView::from(&*s)}))
    })
    .map(Json)
}

pub async fn add_item(
    State(state): State<AppState>,
    Path((id, list)): Path<(String, String)>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    with_session(&state, &id, |s| {
        let item = s.machine.add_item(&list)?;
        Ok(json!({"item": item, "wizard": WizardView::from(&*s)}))
    })
    .map(|body| (StatusCode::CREATED, Json(body)))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path((id, list, item)): Path<(String, String, u64)>,
    Json(req): Json<ItemFieldRequest>,
) -> Result<Json<WizardView>, ApiError> {
    with_session(&state, &id, |s| {
        s.machine.update_item_field(&list, item, &req.field, &req.value)?;
        Ok(WizardView::from(&*s))
    })
    .map(Json)
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path((id, list, item)): Path<(String, String, u64)>,
) -> Result<Json<WizardView>, ApiError> {
    with_session(&state, &id, |s| {
        s.machine.remove_item(&list, item)?;
        Ok(WizardView::from(&*s))
    })
    .map(Json)
}

enum Started {
    Waiting(SubmissionTicket, oneshot::Receiver<()>),
    Blocked(Value),
}

fn start_submission(state: &AppState, id: &str) -> Result<Started, ApiError> {
    let mut sessions = state.sessions.lock().unwrap();
    let session = get_session(&mut sessions, id)?;
    match session.machine.begin_submission()? {
        SubmissionStart::Started(ticket) => {
            let cancel = session.arm_cancel();
            session.sync_guard();
            Ok(Started::Waiting(ticket, cancel))
        }
        SubmissionStart::Blocked { invalid } => {
            let outcome = SubmissionOutcome::Blocked { invalid };
            Ok(Started::Blocked(json!({"outcome": outcome, "wizard": WizardView::from(&*session)})))
        }
    }
}

/// Apply the backend's answer to the session. A created wizard is done:
/// its session, draft included, is dropped and only the returned view remains.
fn finish_submission(
    state: &AppState,
    id: &str,
    attempt: u64,
    result: Result<ResourceId, SubmissionError>,
) -> Result<Value, ApiError> {
    let mut sessions = state.sessions.lock().unwrap();
    let session = get_session(&mut sessions, id)?;
    let outcome = session.machine.complete_submission(attempt, result)?;
    session.disarm_cancel();
    session.sync_guard();
    let body = json!({"outcome": outcome, "wizard": WizardView::from(&*session)});
    if matches!(outcome, SubmissionOutcome::Created(_)) {
        sessions.remove(id);
        tracing::info!(wizard = %id, "Wizard completed and closed");
    }
    Ok(body)
}

/// Start a submission and wait for the backend.
///
/// The backend call runs on its own task, so the attempt is always settled
/// even if this request goes away. The session lock is not held while
/// waiting, so `abandon` can cancel it.
pub async fn submit_wizard(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let (ticket, cancel) = match start_submission(&state, &id)? {
        Started::Waiting(ticket, cancel) => (ticket, cancel),
        Started::Blocked(body) => return Ok(Json(body)),
    };

    tracing::info!(wizard = %id, backend = state.backend.name(), attempt = ticket.attempt, "Submitting");
    let task = tokio::spawn(async move {
        let result = run_cancellable(state.backend.as_ref(), &ticket, cancel).await;
        finish_submission(&state, &id, ticket.attempt, result)
    });
    match task.await {
        Ok(body) => body.map(Json),
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

/// Cancel a pending submission; with nothing pending, discard the wizard.
pub async fn abandon_wizard(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let mut sessions = state.sessions.lock().unwrap();
    let session = get_session(&mut sessions, &id)?;
    if session.machine.is_submitting() {
        let cancelled = session.abandon_pending();
        tracing::info!(wizard = %id, cancelled, "Submission abandoned");
        return Ok(Json(json!({"cancelled": cancelled, "discarded": false})));
    }
    sessions.remove(&id);
    tracing::info!(wizard = %id, "Wizard discarded");
    Ok(Json(json!({"cancelled": false, "discarded": true})))
}

pub async fn navigate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NavigateRequest>,
) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        let decision = s.guard.request(req.intent);
        Ok(json!({"decision": decision}))
    })
    .map(Json)
}

pub async fn navigate_stay(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        s.guard.stay();
        Ok(json!({"armed": s.guard.is_armed()}))
    })
    .map(Json)
}

pub async fn navigate_leave(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    with_session(&state, &id, |s| {
        let intent = s.guard.leave_anyway();
        Ok(json!({"intent": intent, "armed": s.guard.is_armed()}))
    })
    .map(Json)
}

pub async fn dismiss_notification(
    State(state): State<AppState>,
    Path((id, notification)): Path<(String, u64)>,
) -> Result<Json<Value>, ApiError> {
    let dismissed = with_session(&state, &id, |s| Ok(s.machine.dismiss_notification(notification)))?;
    if !dismissed {
        return Err(ApiError::NotFound(format!("Notification {}", notification)));
    }
    Ok(Json(json!({"dismissed": notification})))
}
