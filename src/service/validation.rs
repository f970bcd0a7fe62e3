//! Request body validation for create and update.

use crate::error::AppError;
use crate::model::EntityType;
use serde_json::{Map, Value};

/// Properties holding an ISO 8601 instant or an `start/end` interval.
const TIME_PROPERTIES: &[&str] = &["phenomenonTime", "resultTime", "validTime", "time"];

/// Properties that must be JSON objects when present.
const OBJECT_PROPERTIES: &[&str] = &["unitOfMeasurement", "properties", "parameters"];

/// Properties that must be strings when present.
const STRING_PROPERTIES: &[&str] = &["name", "description", "encodingType", "definition", "observationType"];

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body given in wire form. All required properties must be present and non-null.
    pub fn validate(entity_type: EntityType, body: &Map<String, Value>) -> Result<(), AppError> {
        for name in entity_type.required_properties() {
            if body.get(*name).map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required for {}", name, entity_type)));
            }
        }
        Self::validate_partial(body)
    }

    /// Validate only the properties present (PATCH).
    pub fn validate_partial(body: &Map<String, Value>) -> Result<(), AppError> {
        for (name, value) in body {
            if value.is_null() {
                continue;
            }
            validate_field(name, value)?;
        }
        Ok(())
    }
}

fn validate_field(name: &str, value: &Value) -> Result<(), AppError> {
    if TIME_PROPERTIES.contains(&name) {
        let ok = value.as_str().is_some_and(is_time_or_interval);
        if !ok {
            return Err(AppError::Validation(format!(
                "{} must be an ISO 8601 time or interval",
                name
            )));
        }
    } else if OBJECT_PROPERTIES.contains(&name) && !value.is_object() {
        return Err(AppError::Validation(format!("{} must be an object", name)));
    } else if STRING_PROPERTIES.contains(&name) && !value.is_string() {
        return Err(AppError::Validation(format!("{} must be a string", name)));
    }
    Ok(())
}

pub(crate) fn is_time_or_interval(s: &str) -> bool {
    let instant = |t: &str| chrono::DateTime::parse_from_rfc3339(t).is_ok();
    match s.split_once('/') {
        Some((start, end)) => instant(start) && instant(end),
        None => instant(s),
    }
}
