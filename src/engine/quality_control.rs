//! Quality-control extension: bulk removal of a Datastream's Observations.

use crate::data_array::EntityRef;
use crate::engine::SensorThingsEngine;
use crate::error::AppError;
use crate::model::{EntityId, EntityType};
use crate::query::{CompareOp, FilterExpr, Operand};
use crate::service::is_time_or_interval;
use crate::store::{FetchQuery, JoinFilter};
use serde::Deserialize;
use serde_json::Value;

/// `DeleteObservations` body. Without `phenomenonTime` every Observation of the Datastream goes.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DeleteObservationsBody {
    #[serde(rename = "Datastream")]
    pub datastream: EntityRef,
    #[serde(rename = "phenomenonTime", default)]
    pub phenomenon_time: Option<String>,
}

/// `start/end` as an inclusive range; a single instant matches itself only.
fn phenomenon_time_range(interval: &str) -> Result<FilterExpr, AppError> {
    if !is_time_or_interval(interval) {
        return Err(AppError::Validation(format!(
            "phenomenonTime must be an ISO 8601 time or interval, got {}",
            interval
        )));
    }
    let (start, end) = interval.split_once('/').unwrap_or((interval, interval));
    let bound = |op, value: &str| FilterExpr::Compare {
        left: Operand::Path(vec!["phenomenonTime".to_string()]),
        op,
        right: Operand::Literal(Value::String(value.to_string())),
    };
    Ok(FilterExpr::And(
        Box::new(bound(CompareOp::Ge, start)),
        Box::new(bound(CompareOp::Le, end)),
    ))
}

impl<'a> SensorThingsEngine<'a> {
    /// Delete the Observations of one Datastream, optionally only those whose
    /// `phenomenonTime` falls in the interval. Returns the deleted ids.
    pub async fn delete_observations(&self, body: DeleteObservationsBody) -> Result<Vec<EntityId>, AppError> {
        let filter = body.phenomenon_time.as_deref().map(phenomenon_time_range).transpose()?;
        let datastream = body.datastream.id;
        if self.fetch_one(EntityType::Datastream, &datastream, None).await?.is_none() {
            return Err(AppError::entity_not_found(EntityType::Datastream, &datastream));
        }

        let query = FetchQuery {
            join: Some(JoinFilter::Related {
                entity_type: EntityType::Datastream,
                ids: vec![datastream.clone()],
            }),
            filter,
            ..FetchQuery::default()
        };
        let observations = self.backend.fetch(EntityType::Observation, &query).await?.entities;
        let ids: Vec<EntityId> = observations.iter().filter_map(EntityId::of).collect();
        for id in &ids {
            self.backend.delete(EntityType::Observation, id).await?;
        }
        tracing::debug!(datastream = %datastream, deleted = ids.len(), "observations deleted");
        Ok(ids)
    }
}
