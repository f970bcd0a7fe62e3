//! STA entity model: the eight entity types, their identifiers and the internal entity map.

pub mod catalog;

pub use catalog::{find_relation, relation_between, relations_of, relations_of_name, Cardinality, JoinField, Relation};

use crate::config::IdType;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Internal entity representation: snake_case field names, foreign keys and join lists included.
pub type Entity = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Thing,
    Location,
    HistoricalLocation,
    Datastream,
    Sensor,
    ObservedProperty,
    FeatureOfInterest,
    Observation,
}

impl EntityType {
    pub const ALL: [EntityType; 8] = [
        EntityType::Thing,
        EntityType::Location,
        EntityType::HistoricalLocation,
        EntityType::Datastream,
        EntityType::Sensor,
        EntityType::ObservedProperty,
        EntityType::FeatureOfInterest,
        EntityType::Observation,
    ];

    pub fn singular(self) -> &'static str {
        match self {
            EntityType::Thing => "Thing",
            EntityType::Location => "Location",
            EntityType::HistoricalLocation => "HistoricalLocation",
            EntityType::Datastream => "Datastream",
            EntityType::Sensor => "Sensor",
            EntityType::ObservedProperty => "ObservedProperty",
            EntityType::FeatureOfInterest => "FeatureOfInterest",
            EntityType::Observation => "Observation",
        }
    }

    /// Collection name used in resource paths, e.g. `FeaturesOfInterest`.
    pub fn plural(self) -> &'static str {
        match self {
            EntityType::Thing => "Things",
            EntityType::Location => "Locations",
            EntityType::HistoricalLocation => "HistoricalLocations",
            EntityType::Datastream => "Datastreams",
            EntityType::Sensor => "Sensors",
            EntityType::ObservedProperty => "ObservedProperties",
            EntityType::FeatureOfInterest => "FeaturesOfInterest",
            EntityType::Observation => "Observations",
        }
    }

    pub fn snake_singular(self) -> &'static str {
        match self {
            EntityType::Thing => "thing",
            EntityType::Location => "location",
            EntityType::HistoricalLocation => "historical_location",
            EntityType::Datastream => "datastream",
            EntityType::Sensor => "sensor",
            EntityType::ObservedProperty => "observed_property",
            EntityType::FeatureOfInterest => "feature_of_interest",
            EntityType::Observation => "observation",
        }
    }

    /// Table name used by backends and fixtures, e.g. `features_of_interest`.
    pub fn snake_plural(self) -> &'static str {
        match self {
            EntityType::Thing => "things",
            EntityType::Location => "locations",
            EntityType::HistoricalLocation => "historical_locations",
            EntityType::Datastream => "datastreams",
            EntityType::Sensor => "sensors",
            EntityType::ObservedProperty => "observed_properties",
            EntityType::FeatureOfInterest => "features_of_interest",
            EntityType::Observation => "observations",
        }
    }

    /// Collection segment lookup (`Things`).
    pub fn from_plural(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.plural() == name)
    }

    /// Singular lookup (`Thing`), used for implicit navigation segments and filter paths.
    pub fn from_singular(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.singular() == name)
    }

    /// Accepts any of the four name forms.
    pub fn from_name(name: &str) -> Result<Self, AppError> {
        Self::ALL
            .into_iter()
            .find(|t| {
                t.singular() == name || t.plural() == name || t.snake_singular() == name || t.snake_plural() == name
            })
            .ok_or_else(|| AppError::UnknownEntityType(name.to_string()))
    }

    /// Foreign key field other entities use to point at this type, e.g. `datastream_id`.
    pub fn foreign_key(self) -> String {
        format!("{}_id", self.snake_singular())
    }

    /// Join list field many-to-many partners use to point at this type, e.g. `location_ids`.
    pub fn join_list(self) -> String {
        format!("{}_ids", self.snake_singular())
    }

    /// Wire properties and relations that must be present when creating an entity.
    pub fn required_properties(self) -> &'static [&'static str] {
        match self {
            EntityType::Thing => &["name", "description"],
            EntityType::Location => &["name", "description", "encodingType", "location"],
            EntityType::HistoricalLocation => &["time", "Thing"],
            EntityType::Datastream => &[
                "name",
                "description",
                "unitOfMeasurement",
                "observationType",
                "Thing",
                "Sensor",
                "ObservedProperty",
            ],
            EntityType::Sensor => &["name", "description", "encodingType", "metadata"],
            EntityType::ObservedProperty => &["name", "definition", "description"],
            EntityType::FeatureOfInterest => &["name", "description", "encodingType", "feature"],
            EntityType::Observation => &["result", "Datastream"],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.singular())
    }
}

impl std::str::FromStr for EntityType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::from_name(s)
    }
}

/// Entity identifier, opaque to the engine. Backends decide whether ids are numbers or strings.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl EntityId {
    pub fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => n.as_i64().map(EntityId::Int),
            Value::String(s) => Some(EntityId::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Int(n) => Value::Number((*n).into()),
            EntityId::Text(s) => Value::String(s.clone()),
        }
    }

    /// Parse an id from a resource path segment according to the configured id type.
    pub fn parse(id_str: &str, id_type: &IdType) -> Result<Self, AppError> {
        let id_str = id_str.trim_matches('\'');
        Ok(match id_type {
            IdType::Uuid => {
                let u = uuid::Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
                EntityId::Text(u.to_string())
            }
            IdType::Integer => {
                let n: i64 = id_str.parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
                EntityId::Int(n)
            }
            IdType::Text => EntityId::Text(id_str.to_string()),
        })
    }

    /// Read the `id` field of an entity.
    pub fn of(entity: &Entity) -> Option<Self> {
        entity.get("id").and_then(EntityId::from_value)
    }

    pub fn matches(&self, v: &Value) -> bool {
        EntityId::from_value(v).as_ref() == Some(self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(n) => write!(f, "{}", n),
            EntityId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Int(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}
