//! Static relationship catalog: for each entity type, its named relations with target and cardinality.

use crate::case::to_snake_case;
use crate::error::{AppError, ConfigError};
use crate::model::EntityType;

/// How a relation is stored: to_one (we hold their FK), to_many (they hold our FK),
/// many_to_many (explicit join lists on both sides).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
    ManyToMany,
}

/// Field of the parent entity whose value correlates it with the related entities during expansion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinField {
    /// The parent's own id (to_many and many_to_many relations).
    ParentId,
    /// The parent's foreign key to the target (to_one relations), e.g. `datastream_id`.
    ForeignKey(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
    /// Wire name of the relation, plural for collections (`Datastreams`, `Thing`).
    pub name: &'static str,
    pub target: EntityType,
    pub cardinality: Cardinality,
}

impl Relation {
    const fn new(name: &'static str, target: EntityType, cardinality: Cardinality) -> Self {
        Relation {
            name,
            target,
            cardinality,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.cardinality, Cardinality::ToMany | Cardinality::ManyToMany)
    }

    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }

    /// Key used for `<relation>_link` / `<relation>_rel` fields, e.g. `feature_of_interest`.
    pub fn key(&self) -> String {
        to_snake_case(self.name)
    }

    pub fn join_field(&self) -> JoinField {
        if self.is_collection() {
            JoinField::ParentId
        } else {
            JoinField::ForeignKey(self.target.foreign_key())
        }
    }
}

use Cardinality::{ManyToMany, ToMany, ToOne};
use EntityType::*;

const THING: &[Relation] = &[
    Relation::new("Locations", Location, ManyToMany),
    Relation::new("HistoricalLocations", HistoricalLocation, ToMany),
    Relation::new("Datastreams", Datastream, ToMany),
];

const LOCATION: &[Relation] = &[
    Relation::new("Things", Thing, ManyToMany),
    Relation::new("HistoricalLocations", HistoricalLocation, ManyToMany),
];

const HISTORICAL_LOCATION: &[Relation] = &[
    Relation::new("Thing", Thing, ToOne),
    Relation::new("Locations", Location, ManyToMany),
];

const DATASTREAM: &[Relation] = &[
    Relation::new("Thing", Thing, ToOne),
    Relation::new("Sensor", Sensor, ToOne),
    Relation::new("ObservedProperty", ObservedProperty, ToOne),
    Relation::new("Observations", Observation, ToMany),
];

const SENSOR: &[Relation] = &[Relation::new("Datastreams", Datastream, ToMany)];

const OBSERVED_PROPERTY: &[Relation] = &[Relation::new("Datastreams", Datastream, ToMany)];

const FEATURE_OF_INTEREST: &[Relation] = &[Relation::new("Observations", Observation, ToMany)];

const OBSERVATION: &[Relation] = &[
    Relation::new("Datastream", Datastream, ToOne),
    Relation::new("FeatureOfInterest", FeatureOfInterest, ToOne),
];

pub fn relations_of(entity_type: EntityType) -> &'static [Relation] {
    match entity_type {
        Thing => THING,
        Location => LOCATION,
        HistoricalLocation => HISTORICAL_LOCATION,
        Datastream => DATASTREAM,
        Sensor => SENSOR,
        ObservedProperty => OBSERVED_PROPERTY,
        FeatureOfInterest => FEATURE_OF_INTEREST,
        Observation => OBSERVATION,
    }
}

/// Relations of an entity type given by name; unknown names fail with `UnknownEntityType`.
pub fn relations_of_name(name: &str) -> Result<&'static [Relation], AppError> {
    EntityType::from_name(name).map(relations_of)
}

/// Find a relation by wire or snake_case name (`Locations`, `locations`).
pub fn find_relation(entity_type: EntityType, name: &str) -> Option<&'static Relation> {
    let wanted = to_snake_case(name);
    relations_of(entity_type).iter().find(|r| r.key() == wanted)
}

/// The relation from `source` to `target`, if the two types are related.
pub fn relation_between(source: EntityType, target: EntityType) -> Option<&'static Relation> {
    relations_of(source).iter().find(|r| r.target == target)
}

/// Check that every relation is declared consistently on both sides.
/// to_one pairs with to_many; many_to_many pairs with many_to_many.
pub fn validate() -> Result<(), ConfigError> {
    for source in EntityType::ALL {
        for rel in relations_of(source) {
            let back = relation_between(rel.target, source).ok_or_else(|| ConfigError::InconsistentRelation {
                source_type: source,
                relation: rel.name,
                reason: format!("{} declares no relation back to {}", rel.target, source),
            })?;
            let expected = match rel.cardinality {
                ToOne => ToMany,
                ToMany => ToOne,
                ManyToMany => ManyToMany,
            };
            if back.cardinality != expected {
                return Err(ConfigError::InconsistentRelation {
                    source_type: source,
                    relation: rel.name,
                    reason: format!(
                        "{:?} relation answered by {:?} relation {}/{}",
                        rel.cardinality, back.cardinality, rel.target, back.name
                    ),
                });
            }
        }
    }
    Ok(())
}
