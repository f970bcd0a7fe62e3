//! Resource handlers: landing page, read any path, create, update, delete, CreateObservations,
//! DeleteObservations.

use crate::data_array::DataArrayBatch;
use crate::engine::{DeleteObservationsBody, PathTarget, ResourcePath};
use crate::error::AppError;
use crate::model::{EntityId, EntityType};
use crate::query::QueryOptions;
use crate::response::landing as landing_body;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

const CREATE_OBSERVATIONS: &str = "CreateObservations";
const DELETE_OBSERVATIONS: &str = "DeleteObservations";

fn host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost")
}

/// Parse the path and reject it when any entity type on it is disabled.
fn resource_path(state: &AppState, raw: &str) -> Result<ResourcePath, AppError> {
    let path = ResourcePath::parse(raw, &state.settings.id_type)?;
    if path.entity_types().any(|t| !state.settings.is_enabled(t)) {
        return Err(AppError::NotFound(path.raw));
    }
    Ok(path)
}

/// Entity type and id of a plain `Collection(id)` path; nested paths are read-only.
fn writable_entity(state: &AppState, raw: &str, method: &Method) -> Result<(EntityType, EntityId), AppError> {
    let path = resource_path(state, raw)?;
    if path.is_nested() {
        return Err(AppError::MethodNotAllowedOnNestedPath {
            method: method.to_string(),
            path: path.raw,
        });
    }
    match path.single_entity() {
        Some((t, id)) => Ok((t, id.clone())),
        None => Err(AppError::BadRequest(format!("{} requires an entity path such as Things(1)", method))),
    }
}

pub async fn landing(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let engine = state.engine(host(&headers));
    Json(landing_body(engine.settings(), engine.links()))
}

pub async fn read(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let path = resource_path(&state, &raw)?;
    let options = QueryOptions::from_params(&params, &state.settings)?;
    let engine = state.engine(host(&headers));
    let body = engine.read_path(&path, options).await?;
    Ok(Json(body))
}

pub async fn create(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Response, AppError> {
    let engine = state.engine(host(&headers));

    if raw.trim_matches('/') == CREATE_OBSERVATIONS {
        if !state.settings.is_enabled(EntityType::Observation) {
            return Err(AppError::NotFound(raw));
        }
        let batches: Vec<DataArrayBatch> =
            serde_json::from_value(body).map_err(|e| AppError::Validation(format!("CreateObservations body: {}", e)))?;
        let links = engine.create_observations(batches).await?;
        return Ok((StatusCode::CREATED, Json(links)).into_response());
    }

    if raw.trim_matches('/') == DELETE_OBSERVATIONS {
        if !state.settings.is_enabled(EntityType::Observation) {
            return Err(AppError::NotFound(raw));
        }
        let request: DeleteObservationsBody =
            serde_json::from_value(body).map_err(|e| AppError::Validation(format!("DeleteObservations body: {}", e)))?;
        engine.delete_observations(request).await?;
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let path = resource_path(&state, &raw)?;
    if path.is_nested() {
        return Err(AppError::MethodNotAllowedOnNestedPath {
            method: Method::POST.to_string(),
            path: path.raw,
        });
    }
    let entity_type = match path.target {
        PathTarget::Collection(t) => t,
        PathTarget::Entity(_) => {
            return Err(AppError::BadRequest("POST requires a collection path such as Things".into()))
        }
    };
    let id = engine.create_entity(entity_type, body).await?;
    let location = engine.links().self_link(entity_type, &id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

pub async fn update(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<StatusCode, AppError> {
    let (entity_type, id) = writable_entity(&state, &raw, &Method::PATCH)?;
    state.engine(host(&headers)).update_entity(entity_type, &id, body).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    Path(raw): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let (entity_type, id) = writable_entity(&state, &raw, &Method::DELETE)?;
    state.engine(host(&headers)).delete_entity(entity_type, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
