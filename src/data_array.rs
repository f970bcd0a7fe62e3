//! Columnar Observation encoding (`$resultFormat=dataArray`) and its inverse for `CreateObservations`.

use crate::error::AppError;
use crate::links::LinkBuilder;
use crate::model::{Entity, EntityId, EntityType};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Observation fields that can appear as data-array components, in their fixed output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObservationField {
    Id,
    PhenomenonTime,
    ResultTime,
    Result,
    ResultQuality,
    ValidTime,
    Parameters,
    FeatureOfInterestId,
}

impl ObservationField {
    pub const ALL: [ObservationField; 8] = [
        ObservationField::Id,
        ObservationField::PhenomenonTime,
        ObservationField::ResultTime,
        ObservationField::Result,
        ObservationField::ResultQuality,
        ObservationField::ValidTime,
        ObservationField::Parameters,
        ObservationField::FeatureOfInterestId,
    ];

    pub const DEFAULT: [ObservationField; 2] = [ObservationField::PhenomenonTime, ObservationField::Result];

    /// Name used in `components`.
    pub fn component(self) -> &'static str {
        match self {
            ObservationField::Id => "@iot.id",
            ObservationField::PhenomenonTime => "phenomenonTime",
            ObservationField::ResultTime => "resultTime",
            ObservationField::Result => "result",
            ObservationField::ResultQuality => "resultQuality",
            ObservationField::ValidTime => "validTime",
            ObservationField::Parameters => "parameters",
            ObservationField::FeatureOfInterestId => "FeatureOfInterest/id",
        }
    }

    /// Internal field name on the stored Observation.
    pub fn key(self) -> &'static str {
        match self {
            ObservationField::Id => "id",
            ObservationField::PhenomenonTime => "phenomenon_time",
            ObservationField::ResultTime => "result_time",
            ObservationField::Result => "result",
            ObservationField::ResultQuality => "result_quality",
            ObservationField::ValidTime => "valid_time",
            ObservationField::Parameters => "parameters",
            ObservationField::FeatureOfInterestId => "feature_of_interest_id",
        }
    }

    /// Accepts the wire name and the `$select` spelling `id`.
    pub fn from_component(name: &str) -> Option<Self> {
        match name {
            "id" => Some(ObservationField::Id),
            _ => Self::ALL.into_iter().find(|f| f.component() == name),
        }
    }
}

/// Filter the catalog by `$select`, keeping catalog order. An empty or non-matching select yields the default.
pub fn selected_fields(select: &[String]) -> Vec<ObservationField> {
    let fields: Vec<ObservationField> = ObservationField::ALL
        .into_iter()
        .filter(|f| select.iter().any(|s| ObservationField::from_component(s) == Some(*f)))
        .collect();
    if fields.is_empty() {
        ObservationField::DEFAULT.to_vec()
    } else {
        fields
    }
}

/// Observations of one Datastream in columnar form.
#[derive(Clone, Debug, PartialEq)]
pub struct DataArrayGroup {
    pub datastream_id: EntityId,
    /// Navigation link to the Datastream; dropped when the group is nested under that Datastream.
    pub datastream_link: Option<String>,
    pub components: Vec<ObservationField>,
    pub data_array: Vec<Vec<Value>>,
}

impl DataArrayGroup {
    pub fn empty(datastream_id: EntityId, components: &[ObservationField]) -> Self {
        DataArrayGroup {
            datastream_id,
            datastream_link: None,
            components: components.to_vec(),
            data_array: Vec::new(),
        }
    }

    pub fn into_value(self) -> Value {
        let mut out = Map::new();
        if let Some(link) = self.datastream_link {
            out.insert("Datastream@iot.navigationLink".into(), Value::String(link));
        }
        out.insert(
            "components".into(),
            Value::Array(self.components.iter().map(|f| Value::String(f.component().into())).collect()),
        );
        out.insert(
            "dataArray".into(),
            Value::Array(self.data_array.into_iter().map(Value::Array).collect()),
        );
        Value::Object(out)
    }
}

/// Group Observations by Datastream: groups in first-appearance order, rows in input order.
/// Observations without a datastream are skipped.
pub fn to_data_array(observations: &[Entity], fields: &[ObservationField], links: &LinkBuilder) -> Vec<DataArrayGroup> {
    let mut groups: Vec<DataArrayGroup> = Vec::new();
    for observation in observations {
        let Some(datastream_id) = observation.get("datastream_id").and_then(EntityId::from_value) else {
            tracing::debug!(observation = ?observation.get("id"), "observation without datastream left out of data array");
            continue;
        };
        let row: Vec<Value> = fields
            .iter()
            .map(|f| observation.get(f.key()).cloned().unwrap_or(Value::Null))
            .collect();
        match groups.iter_mut().find(|g| g.datastream_id == datastream_id) {
            Some(group) => group.data_array.push(row),
            None => {
                let mut group = DataArrayGroup::empty(datastream_id, fields);
                group.datastream_link = Some(links.self_link(EntityType::Datastream, &group.datastream_id));
                group.data_array.push(row);
                groups.push(group);
            }
        }
    }
    groups
}

/// `{"@iot.id": ...}` reference in request bodies.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "@iot.id")]
    pub id: EntityId,
}

/// One `CreateObservations` entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DataArrayBatch {
    #[serde(rename = "Datastream")]
    pub datastream: EntityRef,
    pub components: Vec<String>,
    #[serde(rename = "dataArray")]
    pub data_array: Vec<Vec<Value>>,
}

impl From<DataArrayGroup> for DataArrayBatch {
    fn from(group: DataArrayGroup) -> Self {
        DataArrayBatch {
            datastream: EntityRef { id: group.datastream_id },
            components: group.components.iter().map(|f| f.component().to_string()).collect(),
            data_array: group.data_array,
        }
    }
}

/// One Observation to create, with only the fields its row carried.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservationCreate {
    pub datastream: EntityId,
    pub values: Vec<(ObservationField, Value)>,
}

impl ObservationCreate {
    pub fn get(&self, field: ObservationField) -> Option<&Value> {
        self.values.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    /// Backend body: snake_case fields plus `datastream_id`.
    pub fn into_entity(self) -> Entity {
        let mut entity = Entity::new();
        entity.insert(EntityType::Datastream.foreign_key(), self.datastream.to_value());
        for (field, value) in self.values {
            entity.insert(field.key().to_string(), value);
        }
        entity
    }
}

/// Expand data-array batches into one create request per row.
pub fn from_data_array(batches: &[DataArrayBatch]) -> Result<Vec<ObservationCreate>, AppError> {
    let mut creates = Vec::new();
    for batch in batches {
        let fields = batch
            .components
            .iter()
            .map(|c| {
                ObservationField::from_component(c)
                    .ok_or_else(|| AppError::Validation(format!("unknown data array component {}", c)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (index, row) in batch.data_array.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(AppError::Validation(format!(
                    "dataArray row {} of Datastream {} has {} values, expected {}",
                    index,
                    batch.datastream.id,
                    row.len(),
                    fields.len()
                )));
            }
            creates.push(ObservationCreate {
                datastream: batch.datastream.id.clone(),
                values: fields.iter().copied().zip(row.iter().cloned()).collect(),
            });
        }
    }
    Ok(creates)
}
