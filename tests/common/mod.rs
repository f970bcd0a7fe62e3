#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use sensorthings_sdk::{common_routes_with_ready, sensorthings_routes, AppState, MemoryBackend, Settings};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ROOT: &str = "/sensorthings/v1.1";
pub const BASE: &str = "http://testserver/sensorthings/v1.1";

const SAMPLE_FIXTURE: &str = include_str!("../../fixtures/sample.json");

pub fn app() -> Router {
    app_with(Settings::default())
}

pub fn app_with(settings: Settings) -> Router {
    let backend = MemoryBackend::from_fixture_str(SAMPLE_FIXTURE, settings.id_type.clone()).unwrap();
    let state = AppState::new(Arc::new(backend), settings);
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .merge(sensorthings_routes(state))
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Value) {
    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::HOST, "testserver");
    let body = match body {
        Some(v) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

pub async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, &format!("{}/{}", ROOT, path), None).await;
    (status, body)
}

pub fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|e| e["@iot.id"].as_i64().unwrap())
        .collect()
}
