//! SensorThings resource routes, mounted under `/{api_prefix}/v{version}`.
//! A single wildcard route receives every resource path; the handlers parse it into a `ResourcePath`.

use crate::handlers::entity::{create, delete as delete_handler, landing, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

pub fn sensorthings_routes(state: AppState) -> Router {
    let api_root = state.settings.api_root();
    let body_limit = state.settings.body_limit;
    let api = Router::new()
        .route("/", get(landing))
        .route("/*path", get(read).post(create).patch(update).delete(delete_handler))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state);
    Router::new().nest(&api_root, api)
}
