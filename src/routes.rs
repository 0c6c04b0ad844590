use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::handlers;
use crate::models::AppState;

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
        let uri = request.uri().to_string();
        info_span!("http_request", method = ?request.method(), uri)
    });
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(Any)
        .allow_headers([CONTENT_TYPE]);

    Router::new()
        .route("/flows", get(handlers::list_flows))
        .route("/wizards", post(handlers::create_wizard))
        .route("/wizards/new", get(handlers::new_wizard_from_query))
        .route("/wizards/:id", get(handlers::get_wizard))
        .route("/wizards/:id/fields", post(handlers::change_field))
        .route("/wizards/:id/options/:field", get(handlers::field_options))
        .route("/wizards/:id/advance", post(handlers::advance_step))
        .route("/wizards/:id/back", post(handlers::go_back))
        .route("/wizards/:id/items/:list", post(handlers::add_item))
        .route(
            "/wizards/:id/items/:list/:item",
            delete(handlers::remove_item).put(handlers::update_item),
        )
        .route("/wizards/:id/submit", post(handlers::submit_wizard))
        .route("/wizards/:id/abandon", post(handlers::abandon_wizard))
        .route("/wizards/:id/navigate", post(handlers::navigate))
        .route("/wizards/:id/navigate/stay", post(handlers::navigate_stay))
        .route("/wizards/:id/navigate/leave", post(handlers::navigate_leave))
        .route("/wizards/:id/notifications/:nid", delete(handlers::dismiss_notification))
        .route("/volumes", get(handlers::list_volumes))
        .route("/volumes/:id", delete(handlers::delete_volume))
        .route("/resources", get(handlers::list_resources))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}
