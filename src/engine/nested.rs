//! Nested resource paths such as `Things(1)/Datastreams` or `Datastreams(1)/Thing`.

use crate::config::IdType;
use crate::engine::SensorThingsEngine;
use crate::error::AppError;
use crate::model::{find_relation, Entity, EntityId, EntityType};
use crate::query::{parse_filter, FilterExpr, QueryOptions};
use crate::store::JoinFilter;
use regex::Regex;
use serde_json::Value;

/// `Name` or `Name(id)`.
const SEGMENT_PATTERN: &str = r"^([A-Za-z]+)(?:\((.+)\))?$";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SegmentId {
    Id(EntityId),
    /// Implicit singular navigation; resolved from the previous entity's foreign key.
    Placeholder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSegment {
    pub entity_type: EntityType,
    pub id: SegmentId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathTarget {
    /// Trailing collection segment without id: `.../Datastreams`.
    Collection(EntityType),
    /// The last segment of the chain addresses one entity.
    Entity(EntityType),
}

/// A parsed resource path: the id-bearing chain and what the path finally addresses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourcePath {
    pub raw: String,
    pub chain: Vec<PathSegment>,
    pub target: PathTarget,
}

/// Outcome of walking a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NestedResolution {
    /// Id found for a trailing placeholder segment.
    pub replacement_id: Option<EntityId>,
    /// `{LastType}/id eq {lastId}` for the entity the chain ends on.
    pub filter: Option<String>,
}

impl ResourcePath {
    pub fn parse(path: &str, id_type: &IdType) -> Result<Self, AppError> {
        let raw = path.trim_matches('/').to_string();
        let not_found = || AppError::NotFound(raw.clone());
        let segment_re = Regex::new(SEGMENT_PATTERN).map_err(|e| AppError::Backend(e.to_string()))?;
        let parts: Vec<&str> = raw.split('/').collect();
        let mut chain: Vec<PathSegment> = Vec::new();
        let mut target = None;

        for (index, part) in parts.iter().enumerate() {
            let caps = segment_re.captures(part).ok_or_else(not_found)?;
            let name = caps.get(1).map_or("", |m| m.as_str());
            let id = caps
                .get(2)
                .map(|m| EntityId::parse(m.as_str(), id_type))
                .transpose()?;
            let is_last = index + 1 == parts.len();

            let (entity_type, collection) = match chain.last() {
                None => (EntityType::from_plural(name).ok_or_else(not_found)?, true),
                Some(previous) => {
                    let relation = find_relation(previous.entity_type, name)
                        .filter(|r| r.name == name)
                        .ok_or_else(|| {
                            AppError::UnresolvableNestedPath(format!(
                                "{} has no relation {} in {}",
                                previous.entity_type, name, raw
                            ))
                        })?;
                    if !relation.is_collection() && id.is_some() {
                        return Err(AppError::UnresolvableNestedPath(format!(
                            "{} addresses a single entity and takes no id in {}",
                            name, raw
                        )));
                    }
                    (relation.target, relation.is_collection())
                }
            };

            match (id, collection) {
                (Some(id), _) => chain.push(PathSegment { entity_type, id: SegmentId::Id(id) }),
                (None, false) => chain.push(PathSegment { entity_type, id: SegmentId::Placeholder }),
                (None, true) if is_last => target = Some(PathTarget::Collection(entity_type)),
                (None, true) => {
                    return Err(AppError::UnresolvableNestedPath(format!(
                        "collection {} needs an id before {}",
                        name, raw
                    )))
                }
            }
        }

        let target = match target {
            Some(t) => t,
            None => PathTarget::Entity(chain.last().map(|s| s.entity_type).ok_or_else(not_found)?),
        };
        Ok(ResourcePath { raw, chain, target })
    }

    /// More than a plain collection or entity path.
    pub fn is_nested(&self) -> bool {
        match self.target {
            PathTarget::Collection(_) => !self.chain.is_empty(),
            PathTarget::Entity(_) => self.chain.len() > 1,
        }
    }

    pub fn entity_types(&self) -> impl Iterator<Item = EntityType> + '_ {
        let target = match self.target {
            PathTarget::Collection(t) | PathTarget::Entity(t) => t,
        };
        self.chain.iter().map(|s| s.entity_type).chain(std::iter::once(target))
    }

    /// Explicit id of a single-segment entity path, e.g. `Things(1)`.
    pub fn single_entity(&self) -> Option<(EntityType, &EntityId)> {
        match (self.target, self.chain.as_slice()) {
            (PathTarget::Entity(t), [PathSegment { id: SegmentId::Id(id), .. }]) => Some((t, id)),
            _ => None,
        }
    }
}

impl<'a> SensorThingsEngine<'a> {
    /// Walk the chain left to right, checking each entity exists and is related to the previous one.
    pub async fn resolve_path(&self, chain: &[PathSegment]) -> Result<NestedResolution, AppError> {
        let mut resolution = NestedResolution::default();
        let mut previous: Option<(EntityType, EntityId, Entity)> = None;

        for (index, segment) in chain.iter().enumerate() {
            let (lookup_id, join) = match (&segment.id, &previous) {
                (SegmentId::Id(id), None) => (id.clone(), None),
                (SegmentId::Id(id), Some((parent_type, parent_id, _))) => (
                    id.clone(),
                    Some(JoinFilter::Related {
                        entity_type: *parent_type,
                        ids: vec![parent_id.clone()],
                    }),
                ),
                (SegmentId::Placeholder, Some((parent_type, parent_id, parent))) => {
                    let id = parent
                        .get(&segment.entity_type.foreign_key())
                        .and_then(EntityId::from_value)
                        .ok_or_else(|| {
                            AppError::UnresolvableNestedPath(format!(
                                "{}({}) has no {}",
                                parent_type, parent_id, segment.entity_type
                            ))
                        })?;
                    if index + 1 == chain.len() {
                        resolution.replacement_id = Some(id.clone());
                    }
                    (id, None)
                }
                (SegmentId::Placeholder, None) => {
                    return Err(AppError::UnresolvableNestedPath(format!(
                        "{} cannot start a path",
                        segment.entity_type
                    )))
                }
            };

            tracing::debug!(entity_type = %segment.entity_type, id = %lookup_id, index, "resolve path segment");
            let entity = match self.fetch_one(segment.entity_type, &lookup_id, join).await? {
                Some(entity) => entity,
                None if index == 0 => return Err(AppError::entity_not_found(segment.entity_type, &lookup_id)),
                None => {
                    let parent = previous
                        .as_ref()
                        .map(|(t, id, _)| format!(" to {}({})", t, id))
                        .unwrap_or_default();
                    return Err(AppError::UnresolvableNestedPath(format!(
                        "{}({}) is not related{}",
                        segment.entity_type, lookup_id, parent
                    )));
                }
            };
            resolution.filter = Some(FilterExpr::id_eq(segment.entity_type, &lookup_id).to_string());
            previous = Some((segment.entity_type, lookup_id, entity));
        }
        Ok(resolution)
    }

    /// GET any resource path: collection, entity, or a nested chain ending in either.
    pub async fn read_path(&self, path: &ResourcePath, mut options: QueryOptions) -> Result<Value, AppError> {
        if !path.is_nested() {
            return match (path.target, path.single_entity()) {
                (PathTarget::Collection(t), _) => self.list(t, &options).await,
                (_, Some((t, id))) => self.get(t, id, &options).await,
                _ => Err(AppError::NotFound(path.raw.clone())),
            };
        }

        let resolution = self.resolve_path(&path.chain).await?;
        match path.target {
            PathTarget::Collection(t) => {
                if let Some(filter) = resolution.filter {
                    options.filter = Some(FilterExpr::and(options.filter.take(), parse_filter(&filter)?));
                }
                self.list(t, &options).await
            }
            PathTarget::Entity(t) => {
                let id = match path.chain.last().map(|segment| &segment.id) {
                    Some(SegmentId::Id(id)) => Some(id.clone()),
                    Some(SegmentId::Placeholder) => resolution.replacement_id,
                    None => None,
                }
                .ok_or_else(|| AppError::UnresolvableNestedPath(path.raw.clone()))?;
                self.get(t, &id, &options).await
            }
        }
    }
}
