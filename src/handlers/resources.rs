use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::handlers::helpers::ApiError;
use crate::models::AppState;
use crate::services::Resource;
use crate::wizard::Step;

pub async fn list_flows(State(state): State<AppState>) -> Json<Value> {
    let flows: Vec<Value> = state
        .schemas
        .iter()
        .map(|schema| {
            json!({
                "flow": schema.flow,
                "title": schema.title,
                "section": schema.section,
                "steps": Step::all().iter().map(|s| json!({"step": s, "label": s.label()})).collect::<Vec<_>>(),
                "fields": schema.fields,
                "lists": schema.lists,
            })
        })
        .collect();
    Json(json!({ "flows": flows }))
}

pub async fn list_resources(State(state): State<AppState>) -> Json<Vec<Resource>> {
    Json(state.repository.list())
}

pub async fn list_volumes(State(state): State<AppState>) -> Json<Vec<Resource>> {
    Json(state.repository.list_volumes())
}

pub async fn delete_volume(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, ApiError> {
    let is_volume = state
        .repository
        .list_volumes()
        .iter()
        .any(|r| r.id.0 == id);
    if !is_volume {
        return Err(ApiError::NotFound(format!("Volume {}", id)));
    }
    let removed = state
        .repository
        .delete(&id)
        .ok_or_else(|| ApiError::NotFound(format!("Volume {}", id)))?;
    tracing::info!(volume = %removed.id, "Volume deleted");
    Ok(Json(json!({"deleted": removed.id})))
}
