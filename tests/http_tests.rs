use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use stratus::api::SimulatedBackend;
use stratus::models::AppState;
use stratus::routes::build_router;
use stratus::schemas::SchemaRegistry;
use stratus::services::{InMemoryResourceRepository, ResourceRepository};

fn app_with_latency(latency: Duration) -> Router {
    let repository: Arc<dyn ResourceRepository> = Arc::new(InMemoryResourceRepository::new());
    let backend = Arc::new(SimulatedBackend::new(repository.clone(), latency, 0));
    build_router(AppState::new(SchemaRegistry::builtin().unwrap(), backend, repository))
}

fn app() -> Router {
    app_with_latency(Duration::ZERO)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn open(app: &Router, flow: &str) -> String {
    let (status, body) = send(app, "POST", "/wizards", Some(json!({"flow": flow}))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["wizard"]["id"].as_str().unwrap().to_string()
}

async fn set(app: &Router, id: &str, name: &str, value: &str) -> Value {
    let (status, body) = send(
        app,
        "POST",
        &format!("/wizards/{}/fields", id),
        Some(json!({"name": name, "value": value})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    body
}

/// A volume wizard sitting on its last step, ready to submit.
async fn ready_volume(app: &Router) -> String {
    let id = open(app, "volumes").await;
    for (field, value) in [("name", "pg-data"), ("region", "eu-west-1"), ("zone", "eu-west-1a"), ("size_gb", "50")] {
        set(app, &id, field, value).await;
    }
    let (status, body) = send(app, "POST", &format!("/wizards/{}/advance", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transition"]["result"], "advanced");
    id
}

#[tokio::test]
async fn test_list_flows() {
    let app = app();
    let (status, body) = send(&app, "GET", "/flows", None).await;
    assert_eq!(status, StatusCode::OK);
    let flows: Vec<&str> = body["flows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["flow"].as_str().unwrap())
        .collect();
    assert_eq!(flows, vec!["kubernetes", "load-balancers", "volumes"]);
}

#[tokio::test]
async fn test_create_wizard_and_view() {
    let app = app();
    let id = open(&app, "kubernetes").await;
    let (status, view) = send(&app, "GET", &format!("/wizards/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["step"], "configuration");
    assert_eq!(view["creation_started"], false);
    assert_eq!(view["guard"]["armed"], false);
    assert_eq!(view["cost_display"]["monthly"].as_str().unwrap().chars().next(), Some('$'));
}

#[tokio::test]
async fn test_unknown_flow_and_wizard_are_not_found() {
    let app = app();
    let (status, body) = send(&app, "POST", "/wizards", Some(json!({"flow": "databases"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    let (status, _) = send(&app, "GET", "/wizards/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_field_change_reports_resets_and_options() {
    let app = app();
    let id = open(&app, "kubernetes").await;

    let (status, body) = send(&app, "GET", &format!("/wizards/{}/options/vpc", id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "dependency_violation");

    set(&app, &id, "region", "ap-south-1").await;
    let (_, body) = send(&app, "GET", &format!("/wizards/{}/options/vpc", id), None).await;
    assert_eq!(body["options"], json!(["vpc-1", "vpc-2"]));

    set(&app, &id, "vpc", "vpc-1").await;
    let body = set(&app, &id, "region", "us-east-1").await;
    assert_eq!(body["reset"], json!(["vpc", "subnet"]));
    assert!(body["wizard"]["draft"]["fields"].get("vpc").is_none());
}

#[tokio::test]
async fn test_blocked_advance_returns_errors() {
    let app = app();
    let id = open(&app, "kubernetes").await;
    let (status, body) = send(&app, "POST", &format!("/wizards/{}/advance", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transition"]["result"], "blocked");
    assert_eq!(body["wizard"]["validation_errors"]["region"], "Required");
    assert_eq!(body["wizard"]["step"], "configuration");
}

#[tokio::test]
async fn test_kubernetes_end_to_end() {
    let app = app();
    let id = open(&app, "kubernetes").await;
    for (field, value) in [("region", "ap-south-1"), ("vpc", "vpc-1"), ("subnet", "subnet-1"), ("version", "1.29")] {
        set(&app, &id, field, value).await;
    }
    let (_, body) = send(&app, "POST", &format!("/wizards/{}/advance", id), None).await;
    assert_eq!(body["transition"]["step"], "resources_and_addons");

    let pool = body["wizard"]["draft"]["lists"]["node_pools"]["items"][0]["id"].as_u64().unwrap();
    let (status, _) = send(
        &app,
        "PUT",
        &format!("/wizards/{}/items/node_pools/{}", id, pool),
        Some(json!({"field": "name", "value": "general"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", &format!("/wizards/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["result"], "created");
    assert_eq!(body["wizard"]["creation_started"], false);
    assert_eq!(body["wizard"]["notifications"][0]["level"], "success");

    let (_, resources) = send(&app, "GET", "/resources", None).await;
    assert_eq!(resources.as_array().unwrap().len(), 1);

    // the finished wizard and its draft are gone
    let (status, body) = send(&app, "GET", &format!("/wizards/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
    let (status, _) = send(&app, "POST", &format!("/wizards/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_completed_wizards_release_their_sessions() {
    let repository: Arc<dyn ResourceRepository> = Arc::new(InMemoryResourceRepository::new());
    let backend = Arc::new(SimulatedBackend::new(repository.clone(), Duration::ZERO, 0));
    let state = AppState::new(SchemaRegistry::builtin().unwrap(), backend, repository);
    let app = build_router(state.clone());

    let first = ready_volume(&app).await;
    let second = ready_volume(&app).await;
    assert_eq!(state.session_count(), 2);

    let (_, body) = send(&app, "POST", &format!("/wizards/{}/submit", first), None).await;
    assert_eq!(body["outcome"]["result"], "created");
    assert_eq!(body["wizard"]["created"], body["outcome"]["detail"]);
    assert_eq!(state.session_count(), 1);

    send(&app, "POST", &format!("/wizards/{}/submit", second), None).await;
    assert_eq!(state.session_count(), 0);
}

#[tokio::test]
async fn test_submit_from_first_step_conflicts() {
    let app = app();
    let id = open(&app, "volumes").await;
    let (status, body) = send(&app, "POST", &format!("/wizards/{}/submit", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_transition");
}

#[tokio::test]
async fn test_item_routes() {
    let app = app();
    let id = open(&app, "load-balancers").await;
    let (_, view) = send(&app, "GET", &format!("/wizards/{}", id), None).await;
    let default = view["draft"]["lists"]["listeners"]["items"][0]["id"].as_u64().unwrap();

    let (status, body) = send(&app, "POST", &format!("/wizards/{}/items/listeners", id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let added = body["item"].as_u64().unwrap();

    let (status, body) = send(&app, "DELETE", &format!("/wizards/{}/items/listeners/{}", id, default), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "protected_item");

    let (status, view) = send(&app, "DELETE", &format!("/wizards/{}/items/listeners/{}", id, added), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["draft"]["lists"]["listeners"]["items"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "POST", &format!("/wizards/{}/items/widgets", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deep_link_prefills_configuration() {
    let app = app();
    let (status, body) = send(&app, "GET", "/wizards/new?flow=volumes&region=eu-west-1&zone=eu-west-1b", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["wizard"]["draft"]["fields"]["region"], "eu-west-1");
    assert_eq!(body["wizard"]["draft"]["fields"]["zone"], "eu-west-1b");
    let link = body["wizard"]["deep_link"].as_str().unwrap();
    assert!(link.starts_with("/wizards/new?flow=volumes"));
    assert!(link.contains("zone=eu-west-1b"));
}

#[tokio::test]
async fn test_volume_listing_and_delete() {
    let app = app();
    let id = ready_volume(&app).await;
    let (_, body) = send(&app, "POST", &format!("/wizards/{}/submit", id), None).await;
    let volume = body["outcome"]["detail"].as_str().unwrap().to_string();

    let (_, volumes) = send(&app, "GET", "/volumes", None).await;
    assert_eq!(volumes[0]["id"], volume);
    assert_eq!(volumes[0]["name"], "pg-data");

    let (status, _) = send(&app, "DELETE", &format!("/volumes/{}", volume), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/volumes/{}", volume), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_abandon_discards_idle_wizard() {
    let app = app();
    let id = open(&app, "volumes").await;
    let (status, body) = send(&app, "POST", &format!("/wizards/{}/abandon", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["discarded"], true);
    let (status, _) = send(&app, "GET", &format!("/wizards/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_navigation_guard_during_submission_and_cancel() {
    let app = app_with_latency(Duration::from_secs(30));
    let id = ready_volume(&app).await;

    let (_, body) = send(
        &app,
        "POST",
        &format!("/wizards/{}/navigate", id),
        Some(json!({"intent": {"kind": "link", "target": "/resources"}})),
    )
    .await;
    assert_eq!(body["decision"]["decision"], "proceed");

    let submit_app = app.clone();
    let submit_uri = format!("/wizards/{}/submit", id);
    let submit = tokio::spawn(async move { send(&submit_app, "POST", &submit_uri, None).await });

    let mut started = false;
    for _ in 0..200 {
        let (_, view) = send(&app, "GET", &format!("/wizards/{}", id), None).await;
        if view["creation_started"] == true {
            assert_eq!(view["guard"]["armed"], true);
            started = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(started, "submission never started");

    let (_, body) = send(
        &app,
        "POST",
        &format!("/wizards/{}/navigate", id),
        Some(json!({"intent": {"kind": "link", "target": "/resources"}})),
    )
    .await;
    assert_eq!(body["decision"]["decision"], "confirm");
    let (_, body) = send(&app, "POST", &format!("/wizards/{}/navigate/stay", id), None).await;
    assert_eq!(body["armed"], true);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/wizards/{}/fields", id),
        Some(json!({"name": "snapshot_schedule", "value": "daily"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "POST", &format!("/wizards/{}/abandon", id), None).await;
    assert_eq!(body["cancelled"], true);

    let (status, body) = submit.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["result"], "cancelled");
    assert_eq!(body["wizard"]["creation_started"], false);
    assert_eq!(body["wizard"]["guard"]["armed"], false);

    let nid = body["wizard"]["notifications"][0]["id"].as_u64().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/wizards/{}/notifications/{}", id, nid), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "DELETE", &format!("/wizards/{}/notifications/{}", id, nid), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

async fn wait_until_submitting(app: &Router, id: &str, submitting: bool) {
    for _ in 0..400 {
        let (_, view) = send(app, "GET", &format!("/wizards/{}", id), None).await;
        if view["submitting"] == submitting {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("wizard {} never reached submitting={}", id, submitting);
}

#[tokio::test]
async fn test_dropped_submit_request_leaves_wizard_recoverable() {
    let app = app_with_latency(Duration::from_secs(30));
    let id = ready_volume(&app).await;

    let submit_app = app.clone();
    let submit_uri = format!("/wizards/{}/submit", id);
    let submit = tokio::spawn(async move { send(&submit_app, "POST", &submit_uri, None).await });
    wait_until_submitting(&app, &id, true).await;

    // the client goes away mid-request
    submit.abort();
    assert!(submit.await.unwrap_err().is_cancelled());

    let (status, body) = send(&app, "POST", &format!("/wizards/{}/abandon", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    wait_until_submitting(&app, &id, false).await;

    let (_, view) = send(&app, "GET", &format!("/wizards/{}", id), None).await;
    assert_eq!(view["creation_started"], false);
    assert_eq!(view["guard"]["armed"], false);
    assert_eq!(view["notifications"][0]["level"], "info");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/wizards/{}/fields", id),
        Some(json!({"name": "snapshot_schedule", "value": "weekly"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
