//! Query executor: list, get, create, update and delete against a `Backend`, with link
//! building and `$expand` resolution on the way out.

pub mod expansion;
pub mod nested;
pub mod quality_control;

pub use quality_control::DeleteObservationsBody;
pub use nested::{NestedResolution, PathSegment, PathTarget, ResourcePath, SegmentId};

use crate::case::object_keys_to_snake_case;
use crate::config::Settings;
use crate::data_array::{from_data_array, DataArrayBatch, ObservationField};
use crate::error::AppError;
use crate::links::LinkBuilder;
use crate::model::{relations_of, Cardinality, Entity, EntityId, EntityType};
use crate::query::{FilterExpr, QueryOptions};
use crate::response::{collection, entity_to_wire, EntityPage};
use crate::service::RequestValidator;
use crate::store::{Backend, FetchQuery, JoinFilter};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where a list call sits: the request's own collection, or a batch fetched for `$expand`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListScope {
    pub depth: usize,
    pub root: bool,
}

impl ListScope {
    pub fn root() -> Self {
        ListScope { depth: 0, root: true }
    }

    pub fn nested(self) -> Self {
        ListScope {
            depth: self.depth + 1,
            root: false,
        }
    }

    /// Navigation links of sibling relations are left out of expanded entities.
    pub fn drop_related_links(&self) -> bool {
        !self.root
    }
}

/// Per-request engine. Holds borrowed backend and settings and the request's link builder.
pub struct SensorThingsEngine<'a> {
    backend: &'a dyn Backend,
    settings: &'a Settings,
    links: LinkBuilder,
}

impl<'a> SensorThingsEngine<'a> {
    pub fn new(backend: &'a dyn Backend, settings: &'a Settings, links: LinkBuilder) -> Self {
        SensorThingsEngine {
            backend,
            settings,
            links,
        }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Fetch one page, attach links and expansions. Boxed because expansion recurses into it.
    pub fn list_entities<'s>(
        &'s self,
        entity_type: EntityType,
        options: &'s QueryOptions,
        join: Option<JoinFilter>,
        scope: ListScope,
    ) -> BoxFuture<'s, Result<EntityPage, AppError>> {
        Box::pin(async move {
            if options.is_data_array() && entity_type != EntityType::Observation {
                return Err(AppError::BadRequest(
                    "$resultFormat=dataArray is only supported for Observations".into(),
                ));
            }
            let pagination = options.pagination(self.settings);
            let query = FetchQuery {
                ids: None,
                join,
                filter: options.filter.clone(),
                ordering: options.order_by.clone(),
                pagination: Some(pagination),
                expanded: !scope.root,
            };
            tracing::debug!(
                entity_type = %entity_type,
                filter = ?query.filter.as_ref().map(ToString::to_string),
                join = ?query.join,
                top = pagination.top,
                skip = pagination.skip,
                depth = scope.depth,
                "fetch"
            );
            let result = self.backend.fetch(entity_type, &query).await?;
            let next_link = if scope.root {
                self.links
                    .build_next_link(entity_type, result.count, Some(pagination.top), Some(pagination.skip))
            } else {
                None
            };
            let mut values = result.entities;
            self.resolve_expansions(entity_type, &mut values, options, scope).await?;
            Ok(EntityPage {
                values,
                count: options.count.then_some(result.count),
                next_link,
            })
        })
    }

    /// Collection response in wire form.
    pub async fn list(&self, entity_type: EntityType, options: &QueryOptions) -> Result<Value, AppError> {
        let page = self.list_entities(entity_type, options, None, ListScope::root()).await?;
        let body = collection(entity_type, page, options, &self.links);
        serde_json::to_value(body).map_err(|e| AppError::Backend(e.to_string()))
    }

    /// One entity by id, links and expansions attached, in internal form.
    pub async fn get_entity(&self, entity_type: EntityType, id: &EntityId, options: &QueryOptions) -> Result<Entity, AppError> {
        let query = FetchQuery {
            filter: Some(FilterExpr::id_eq(entity_type, id)),
            ..FetchQuery::default()
        };
        tracing::debug!(entity_type = %entity_type, id = %id, "fetch one");
        let mut values = self.backend.fetch(entity_type, &query).await?.entities;
        self.resolve_expansions(entity_type, &mut values, options, ListScope::root()).await?;
        values
            .into_iter()
            .next()
            .ok_or_else(|| AppError::entity_not_found(entity_type, id))
    }

    /// One entity in wire form.
    pub async fn get(&self, entity_type: EntityType, id: &EntityId, options: &QueryOptions) -> Result<Value, AppError> {
        if options.is_data_array() {
            return Err(AppError::BadRequest(
                "$resultFormat=dataArray applies to Observation collections".into(),
            ));
        }
        let entity = self.get_entity(entity_type, id, options).await?;
        Ok(entity_to_wire(entity_type, entity, &options.select))
    }

    /// Raw fetch of one entity, optionally constrained to a parent. `None` when absent.
    pub(crate) async fn fetch_one(
        &self,
        entity_type: EntityType,
        id: &EntityId,
        join: Option<JoinFilter>,
    ) -> Result<Option<Entity>, AppError> {
        let query = FetchQuery {
            ids: Some(vec![id.clone()]),
            join,
            expanded: true,
            ..FetchQuery::default()
        };
        Ok(self.backend.fetch(entity_type, &query).await?.entities.into_iter().next())
    }

    pub async fn create_entity(&self, entity_type: EntityType, body: Value) -> Result<EntityId, AppError> {
        let body = object_body(body)?;
        RequestValidator::validate(entity_type, &body)?;
        let record = self.wire_to_record(entity_type, body).await?;
        let id = self.backend.create(entity_type, record).await?;
        tracing::debug!(entity_type = %entity_type, id = %id, "created");
        Ok(id)
    }

    pub async fn update_entity(&self, entity_type: EntityType, id: &EntityId, body: Value) -> Result<(), AppError> {
        let mut body = object_body(body)?;
        body.remove("@iot.id");
        RequestValidator::validate_partial(&body)?;
        let record = self.wire_to_record(entity_type, body).await?;
        self.backend.update(entity_type, id, record).await?;
        tracing::debug!(entity_type = %entity_type, id = %id, "updated");
        Ok(())
    }

    pub async fn delete_entity(&self, entity_type: EntityType, id: &EntityId) -> Result<(), AppError> {
        self.backend.delete(entity_type, id).await?;
        tracing::debug!(entity_type = %entity_type, id = %id, "deleted");
        Ok(())
    }

    /// Create every Observation of a data-array payload; returns their self links in row order.
    pub async fn create_observations(&self, batches: Vec<DataArrayBatch>) -> Result<Vec<String>, AppError> {
        let creates = from_data_array(&batches)?;
        for batch in &batches {
            self.require_exists(EntityType::Datastream, &batch.datastream.id).await?;
        }
        let mut features: Vec<EntityId> = Vec::new();
        for value in creates
            .iter()
            .filter_map(|c| c.get(ObservationField::FeatureOfInterestId))
            .filter(|v| !v.is_null())
        {
            let id = EntityId::from_value(value).ok_or_else(|| {
                AppError::Validation(format!("FeatureOfInterest/id must be an id, got {}", value))
            })?;
            if !features.contains(&id) {
                features.push(id);
            }
        }
        for id in &features {
            self.require_exists(EntityType::FeatureOfInterest, id).await?;
        }
        let mut links = Vec::with_capacity(creates.len());
        for create in creates {
            let id = self.backend.create(EntityType::Observation, create.into_entity()).await?;
            links.push(self.links.self_link(EntityType::Observation, &id));
        }
        tracing::debug!(created = links.len(), "data array observations created");
        Ok(links)
    }

    async fn require_exists(&self, entity_type: EntityType, id: &EntityId) -> Result<(), AppError> {
        match self.fetch_one(entity_type, id, None).await? {
            Some(_) => Ok(()),
            None => Err(AppError::Validation(format!("referenced {} {} does not exist", entity_type, id))),
        }
    }

    /// Wire body to backend body: relation references become foreign keys or join lists,
    /// property names become snake_case. Deep inserts are rejected.
    async fn wire_to_record(&self, entity_type: EntityType, mut body: Map<String, Value>) -> Result<Entity, AppError> {
        let mut record = Entity::new();
        if let Some(id) = body.remove("@iot.id") {
            record.insert("id".into(), id);
        }
        for relation in relations_of(entity_type) {
            let Some(value) = body.remove(relation.name) else { continue };
            match relation.cardinality {
                Cardinality::ToOne => {
                    let id = reference_id(relation.name, &value)?;
                    self.require_exists(relation.target, &id).await?;
                    record.insert(relation.target.foreign_key(), id.to_value());
                }
                Cardinality::ManyToMany => {
                    let refs = value.as_array().ok_or_else(|| {
                        AppError::BadRequest(format!("{} must be a list of references", relation.name))
                    })?;
                    let mut ids = Vec::with_capacity(refs.len());
                    for r in refs {
                        let id = reference_id(relation.name, r)?;
                        self.require_exists(relation.target, &id).await?;
                        ids.push(id.to_value());
                    }
                    record.insert(relation.target.join_list(), Value::Array(ids));
                }
                Cardinality::ToMany => {
                    return Err(AppError::BadRequest(format!(
                        "{} cannot be set from {}; create them with a reference to it",
                        relation.name, entity_type
                    )));
                }
            }
        }
        body.retain(|key, _| !key.contains("@iot."));
        object_keys_to_snake_case(&mut body);
        record.extend(body);
        Ok(record)
    }
}

fn object_body(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// `{"@iot.id": x}` to `x`. Anything else would be a deep insert.
fn reference_id(relation: &str, value: &Value) -> Result<EntityId, AppError> {
    match value.as_object() {
        Some(obj) if obj.len() == 1 => obj
            .get("@iot.id")
            .and_then(EntityId::from_value)
            .ok_or_else(|| AppError::BadRequest(format!("{} reference needs an @iot.id", relation))),
        _ => Err(AppError::BadRequest(format!(
            "deep insert is not supported; reference {} by @iot.id",
            relation
        ))),
    }
}
