//! Link attachment and `$expand` resolution for one batch of entities.
//!
//! Each expanded relation costs one backend fetch per nesting level, whatever the batch size:
//! join ids are collected over the whole batch, fetched once, then spliced back per parent.

use crate::data_array::{selected_fields, to_data_array, DataArrayGroup};
use crate::engine::{ListScope, SensorThingsEngine};
use crate::error::AppError;
use crate::model::{relations_of, Cardinality, Entity, EntityId, EntityType, JoinField};
use crate::query::{parse_expand, ExpandEntry, QueryOptions};
use crate::response::{entity_to_wire, EntityPage};
use crate::store::JoinFilter;
use serde_json::Value;
use std::collections::HashMap;

impl<'a> SensorThingsEngine<'a> {
    /// Set self links, navigation links and expanded relations on every entity of the batch.
    pub(crate) async fn resolve_expansions(
        &self,
        entity_type: EntityType,
        values: &mut [Entity],
        options: &QueryOptions,
        scope: ListScope,
    ) -> Result<(), AppError> {
        let mut plan = parse_expand(entity_type, options.expand.as_deref(), self.settings)?;
        if !plan.is_empty() && scope.depth >= self.settings.max_expand_depth {
            return Err(AppError::BadRequest(format!(
                "$expand nests deeper than {} levels",
                self.settings.max_expand_depth
            )));
        }

        for value in values.iter_mut() {
            let id = EntityId::of(value)
                .ok_or_else(|| AppError::Backend(format!("{} returned without an id", entity_type)))?;
            value.insert("self_link".into(), Value::String(self.links.self_link(entity_type, &id)));
            for relation in relations_of(entity_type) {
                match plan.get_mut(relation) {
                    Some(entry) => collect_join_id(entry, &id, value),
                    None if !scope.drop_related_links() => {
                        value.insert(
                            format!("{}_link", relation.key()),
                            Value::String(self.links.navigation_link(entity_type, &id, relation)),
                        );
                    }
                    None => {}
                }
            }
        }

        for entry in plan.entries() {
            let related = if entry.join_ids.is_empty() {
                EntityPage::default()
            } else {
                let join = match entry.join_field {
                    JoinField::ParentId => JoinFilter::Related {
                        entity_type,
                        ids: entry.join_ids.clone(),
                    },
                    JoinField::ForeignKey(_) => JoinFilter::Ids(entry.join_ids.clone()),
                };
                self.list_entities(entry.relation.target, &entry.options, Some(join), scope.nested())
                    .await?
            };
            self.splice(entity_type, values, entry, related.values);
        }
        Ok(())
    }

    fn splice(&self, parent_type: EntityType, values: &mut [Entity], entry: &ExpandEntry, related: Vec<Entity>) {
        let relation = entry.relation;
        let target = relation.target;
        let key = format!("{}_rel", relation.key());
        let wire = |e: &Entity| entity_to_wire(target, e.clone(), &entry.options.select);

        match relation.cardinality {
            Cardinality::ManyToMany => {
                let list_field = parent_type.join_list();
                for value in values.iter_mut() {
                    let Some(id) = EntityId::of(value) else { continue };
                    let matched: Vec<Value> = related
                        .iter()
                        .filter(|r| match r.get(&list_field) {
                            Some(Value::Array(ids)) => ids.iter().any(|v| id.matches(v)),
                            _ => false,
                        })
                        .map(wire)
                        .collect();
                    value.insert(key.clone(), Value::Array(matched));
                }
            }
            Cardinality::ToMany => {
                let fk = parent_type.foreign_key();
                for value in values.iter_mut() {
                    let Some(id) = EntityId::of(value) else { continue };
                    let matched: Vec<Entity> = related
                        .iter()
                        .filter(|r| r.get(&fk).is_some_and(|v| id.matches(v)))
                        .cloned()
                        .collect();
                    let spliced = if target == EntityType::Observation && entry.options.is_data_array() {
                        self.data_array_value(parent_type, &id, &matched, &entry.options)
                    } else {
                        Value::Array(matched.iter().map(wire).collect())
                    };
                    value.insert(key.clone(), spliced);
                }
            }
            Cardinality::ToOne => {
                let by_id: HashMap<EntityId, &Entity> = related
                    .iter()
                    .filter_map(|r| EntityId::of(r).map(|id| (id, r)))
                    .collect();
                let fk = target.foreign_key();
                for value in values.iter_mut() {
                    let spliced = value
                        .get(&fk)
                        .and_then(EntityId::from_value)
                        .and_then(|fid| by_id.get(&fid).copied())
                        .map(wire)
                        .unwrap_or(Value::Null);
                    value.insert(key.clone(), spliced);
                }
            }
        }
    }

    /// Observations nested under a Datastream become that Datastream's single group, without
    /// its own navigation link. Under any other parent they become a list of groups.
    fn data_array_value(&self, parent_type: EntityType, parent_id: &EntityId, observations: &[Entity], options: &QueryOptions) -> Value {
        let fields = selected_fields(&options.select);
        let groups = to_data_array(observations, &fields, &self.links);
        if parent_type == EntityType::Datastream {
            let mut group = groups
                .into_iter()
                .next()
                .unwrap_or_else(|| DataArrayGroup::empty(parent_id.clone(), &fields));
            group.datastream_link = None;
            group.into_value()
        } else {
            Value::Array(groups.into_iter().map(DataArrayGroup::into_value).collect())
        }
    }
}

fn collect_join_id(entry: &mut ExpandEntry, id: &EntityId, value: &Entity) {
    match &entry.join_field {
        JoinField::ParentId => entry.add_join_id(id.clone()),
        JoinField::ForeignKey(fk) => {
            if let Some(fid) = value.get(fk).and_then(EntityId::from_value) {
                entry.add_join_id(fid);
            }
        }
    }
}
