//! In-memory backend: one table per entity type, insertion ordered, seeded from a JSON fixture.

use crate::case::to_snake_case;
use crate::config::IdType;
use crate::error::AppError;
use crate::model::{relations_of, Entity, EntityId, EntityType};
use crate::query::{CompareOp, Direction, FilterExpr, Operand, OrderBy};
use crate::store::traits::{Backend, FetchQuery, FetchResult, JoinFilter};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Tables = HashMap<EntityType, Vec<Entity>>;

pub struct MemoryBackend {
    id_type: IdType,
    tables: RwLock<Tables>,
}

impl MemoryBackend {
    pub fn new(id_type: IdType) -> Self {
        MemoryBackend {
            id_type,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Seed from an object keyed by snake plural table names, e.g. `{"things": [...], "datastreams": [...]}`.
    pub fn from_fixture(fixture: &Value, id_type: IdType) -> Result<Self, AppError> {
        let obj = fixture
            .as_object()
            .ok_or_else(|| AppError::BadRequest("fixture must be a JSON object".into()))?;
        let mut tables = Tables::new();
        for (name, rows) in obj {
            let entity_type = EntityType::from_name(name)?;
            let rows = rows
                .as_array()
                .ok_or_else(|| AppError::BadRequest(format!("fixture table {} must be an array", name)))?;
            let mut entities = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Value::Object(map) if map.contains_key("id") => entities.push(map.clone()),
                    _ => return Err(AppError::BadRequest(format!("fixture rows of {} must be objects with an id", name))),
                }
            }
            tables.insert(entity_type, entities);
        }
        tracing::debug!(tables = tables.len(), "memory backend seeded");
        Ok(MemoryBackend {
            id_type,
            tables: RwLock::new(tables),
        })
    }

    pub fn from_fixture_str(json: &str, id_type: IdType) -> Result<Self, AppError> {
        let fixture: Value = serde_json::from_str(json).map_err(|e| AppError::BadRequest(format!("fixture: {}", e)))?;
        Self::from_fixture(&fixture, id_type)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AppError> {
        self.tables
            .read()
            .map_err(|_| AppError::Backend("memory backend lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AppError> {
        self.tables
            .write()
            .map_err(|_| AppError::Backend("memory backend lock poisoned".into()))
    }

    fn next_id(&self, rows: &[Entity]) -> EntityId {
        match self.id_type {
            IdType::Integer => {
                let max = rows
                    .iter()
                    .filter_map(|e| e.get("id").and_then(Value::as_i64))
                    .max()
                    .unwrap_or(0);
                EntityId::Int(max + 1)
            }
            IdType::Uuid | IdType::Text => EntityId::Text(uuid::Uuid::new_v4().to_string()),
        }
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    async fn fetch(&self, entity_type: EntityType, query: &FetchQuery) -> Result<FetchResult, AppError> {
        let tables = self.read()?;
        let rows = tables.get(&entity_type).map(Vec::as_slice).unwrap_or(&[]);
        let mut matched: Vec<Entity> = rows
            .iter()
            .filter(|e| match &query.ids {
                Some(ids) => EntityId::of(e).is_some_and(|id| ids.contains(&id)),
                None => true,
            })
            .filter(|e| query.join.as_ref().map_or(true, |j| join_matches(entity_type, e, j)))
            .filter(|e| query.filter.as_ref().map_or(true, |f| evaluate(entity_type, e, f)))
            .cloned()
            .collect();
        drop(tables);

        if !query.ordering.is_empty() {
            matched.sort_by(|a, b| compare_rows(entity_type, a, b, &query.ordering));
        }
        let count = matched.len() as u64;
        if let Some(page) = query.pagination {
            matched = matched
                .into_iter()
                .skip(page.skip as usize)
                .take(page.top as usize)
                .collect();
        }
        Ok(FetchResult { entities: matched, count })
    }

    async fn create(&self, entity_type: EntityType, mut body: Entity) -> Result<EntityId, AppError> {
        let mut tables = self.write()?;
        let id = {
            let rows = tables.entry(entity_type).or_default();
            let id = match EntityId::of(&body) {
                Some(id) if rows.iter().any(|e| EntityId::of(e).as_ref() == Some(&id)) => {
                    return Err(AppError::Validation(format!("{} {} already exists", entity_type, id)));
                }
                Some(id) => id,
                None => self.next_id(rows),
            };
            body.insert("id".into(), id.to_value());
            rows.push(body.clone());
            id
        };
        sync_join_lists(&mut tables, entity_type, &id, &body);
        Ok(id)
    }

    async fn update(&self, entity_type: EntityType, id: &EntityId, body: Entity) -> Result<(), AppError> {
        let mut tables = self.write()?;
        let row = tables
            .get_mut(&entity_type)
            .and_then(|rows| rows.iter_mut().find(|e| EntityId::of(e).as_ref() == Some(id)))
            .ok_or_else(|| AppError::entity_not_found(entity_type, id))?;
        for (key, value) in body.iter().filter(|(k, _)| k.as_str() != "id") {
            row.insert(key.clone(), value.clone());
        }
        sync_join_lists(&mut tables, entity_type, id, &body);
        Ok(())
    }

    async fn delete(&self, entity_type: EntityType, id: &EntityId) -> Result<(), AppError> {
        let mut tables = self.write()?;
        let rows = tables
            .get_mut(&entity_type)
            .ok_or_else(|| AppError::entity_not_found(entity_type, id))?;
        let position = rows
            .iter()
            .position(|e| EntityId::of(e).as_ref() == Some(id))
            .ok_or_else(|| AppError::entity_not_found(entity_type, id))?;
        rows.remove(position);
        let cleared: Entity = relations_of(entity_type)
            .iter()
            .filter(|r| r.is_many_to_many())
            .map(|r| (r.target.join_list(), Value::Array(Vec::new())))
            .collect();
        sync_join_lists(&mut tables, entity_type, id, &cleared);
        Ok(())
    }
}

/// Mirror the many-to-many join lists present in `body` onto the partner tables.
fn sync_join_lists(tables: &mut Tables, entity_type: EntityType, id: &EntityId, body: &Entity) {
    for relation in relations_of(entity_type).iter().filter(|r| r.is_many_to_many()) {
        let Some(Value::Array(members)) = body.get(&relation.target.join_list()) else {
            continue;
        };
        let members: Vec<EntityId> = members.iter().filter_map(EntityId::from_value).collect();
        let back_list = entity_type.join_list();
        for partner in tables.entry(relation.target).or_default().iter_mut() {
            let Some(partner_id) = EntityId::of(partner) else { continue };
            let list = partner
                .entry(back_list.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            let Value::Array(list) = list else { continue };
            let present = list.iter().any(|v| id.matches(v));
            let wanted = members.contains(&partner_id);
            if wanted && !present {
                list.push(id.to_value());
            } else if !wanted && present {
                list.retain(|v| !id.matches(v));
            }
        }
    }
}

fn join_matches(entity_type: EntityType, entity: &Entity, join: &JoinFilter) -> bool {
    match join {
        JoinFilter::Ids(ids) => EntityId::of(entity).is_some_and(|id| ids.contains(&id)),
        JoinFilter::Related { entity_type: parent, ids } if *parent == entity_type => {
            EntityId::of(entity).is_some_and(|id| ids.contains(&id))
        }
        JoinFilter::Related { entity_type: parent, ids } => reference_values(entity, *parent)
            .iter()
            .any(|v| ids.iter().any(|id| id.matches(v))),
    }
}

/// Values of `{type}_id` and `{type}_ids` on an entity.
fn reference_values(entity: &Entity, target: EntityType) -> Vec<Value> {
    let mut values = Vec::new();
    if let Some(v) = entity.get(&target.foreign_key()).filter(|v| !v.is_null()) {
        values.push(v.clone());
    }
    if let Some(Value::Array(list)) = entity.get(&target.join_list()) {
        values.extend(list.iter().cloned());
    }
    values
}

/// Resolve a filter or ordering path on an entity. A path can yield several values through join lists.
fn lookup(entity_type: EntityType, entity: &Entity, path: &[String]) -> Vec<Value> {
    match path {
        [] => Vec::new(),
        [field] if field == "id" || field == "@iot.id" => entity.get("id").cloned().into_iter().collect(),
        [head, field] if field == "id" || field == "@iot.id" => match EntityType::from_name(head) {
            Ok(t) if t == entity_type => entity.get("id").cloned().into_iter().collect(),
            Ok(t) => reference_values(entity, t),
            Err(_) => nested_value(entity, path).into_iter().collect(),
        },
        _ => nested_value(entity, path).into_iter().collect(),
    }
}

/// Walk into object-valued properties: `properties/owner` reads `entity.properties.owner`.
fn nested_value(entity: &Entity, path: &[String]) -> Option<Value> {
    let (first, rest) = path.split_first()?;
    let mut current = entity.get(&to_snake_case(first))?;
    for key in rest {
        current = current.get(key.as_str())?;
    }
    Some(current.clone())
}

fn evaluate(entity_type: EntityType, entity: &Entity, expr: &FilterExpr) -> bool {
    match expr {
        FilterExpr::And(a, b) => evaluate(entity_type, entity, a) && evaluate(entity_type, entity, b),
        FilterExpr::Or(a, b) => evaluate(entity_type, entity, a) || evaluate(entity_type, entity, b),
        FilterExpr::Not(a) => !evaluate(entity_type, entity, a),
        FilterExpr::Compare { left, op, right } => {
            let left = operand_values(entity_type, entity, left);
            let right = operand_values(entity_type, entity, right);
            if left.is_empty() || right.is_empty() {
                // a missing property compares like null
                let l = left.first().cloned().unwrap_or(Value::Null);
                let r = right.first().cloned().unwrap_or(Value::Null);
                return op.test(compare_values(&l, &r));
            }
            match op {
                CompareOp::Ne => left.iter().all(|l| right.iter().all(|r| op.test(compare_values(l, r)))),
                _ => left.iter().any(|l| right.iter().any(|r| op.test(compare_values(l, r)))),
            }
        }
    }
}

fn operand_values(entity_type: EntityType, entity: &Entity, operand: &Operand) -> Vec<Value> {
    match operand {
        Operand::Literal(v) => vec![v.clone()],
        Operand::Path(path) => lookup(entity_type, entity, path),
    }
}

/// Numbers compare numerically, RFC 3339 strings as instants, other strings lexically.
/// Values of different kinds are incomparable, except null which only equals null.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => {
            match (
                chrono::DateTime::parse_from_rfc3339(x),
                chrono::DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(x), Ok(y)) => Some(x.cmp(&y)),
                _ => Some(x.cmp(y)),
            }
        }
        _ => None,
    }
}

fn compare_rows(entity_type: EntityType, a: &Entity, b: &Entity, ordering: &[OrderBy]) -> Ordering {
    for term in ordering {
        let path: Vec<String> = term.field.split('/').map(str::to_string).collect();
        let x = lookup(entity_type, a, &path).into_iter().next().unwrap_or(Value::Null);
        let y = lookup(entity_type, b, &path).into_iter().next().unwrap_or(Value::Null);
        // nulls sort first
        let ord = match (x.is_null(), y.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => compare_values(&x, &y).unwrap_or(Ordering::Equal),
        };
        let ord = match term.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
