//! Load settings from `STA_*` environment variables or from a JSON document.

use crate::config::types::{IdType, Settings};
use crate::config::validate;
use crate::error::ConfigError;
use crate::model::EntityType;
use std::path::Path;
use std::str::FromStr;

/// Load settings from the process environment. Call `dotenvy::dotenv()` first to pick up a `.env` file.
pub fn load_from_env() -> Result<Settings, ConfigError> {
    load_from_vars(|key| std::env::var(key).ok())
}

/// Load settings through an arbitrary variable lookup; unset variables keep their defaults.
pub fn load_from_vars<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();
    if let Some(v) = lookup("STA_SCHEME") {
        settings.scheme = v;
    }
    if let Some(v) = lookup("STA_PROXY_BASE_URL").filter(|v| !v.is_empty()) {
        settings.proxy_base_url = Some(v.trim_end_matches('/').to_string());
    }
    if let Some(v) = lookup("STA_API_PREFIX") {
        settings.api_prefix = v.trim_matches('/').to_string();
    }
    if let Some(v) = lookup("STA_VERSION") {
        settings.version = v;
    }
    if let Some(v) = lookup("STA_ID_TYPE") {
        settings.id_type = IdType::from_str(&v).map_err(|reason| ConfigError::InvalidSetting {
            name: "STA_ID_TYPE",
            reason,
        })?;
    }
    if let Some(v) = lookup("STA_ID_QUALIFIER") {
        settings.id_qualifier = v;
    }
    if let Some(v) = lookup("STA_DEFAULT_TOP") {
        settings.default_top = parse_number("STA_DEFAULT_TOP", &v)?;
    }
    if let Some(v) = lookup("STA_MAX_TOP") {
        settings.max_top = parse_number("STA_MAX_TOP", &v)?;
    }
    if let Some(v) = lookup("STA_MAX_EXPAND_DEPTH") {
        settings.max_expand_depth = parse_number("STA_MAX_EXPAND_DEPTH", &v)?;
    }
    if let Some(v) = lookup("STA_BODY_LIMIT") {
        settings.body_limit = parse_number("STA_BODY_LIMIT", &v)?;
    }
    if let Some(v) = lookup("STA_CAPABILITIES") {
        settings.capabilities = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|name| {
                EntityType::from_name(name).map_err(|_| ConfigError::InvalidSetting {
                    name: "STA_CAPABILITIES",
                    reason: format!("unknown entity type {}", name),
                })
            })
            .collect::<Result<_, _>>()?;
    }
    validate(&settings)?;
    Ok(settings)
}

/// Load settings from a JSON object; missing keys keep their defaults.
pub fn load_from_json(json: &str) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    validate(&settings)?;
    Ok(settings)
}

pub fn load_from_file(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_json(&raw)
}

fn parse_number<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidSetting {
        name,
        reason: format!("expected a non-negative integer, got {}", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = load_from_vars(vars(&[])).unwrap();
        assert_eq!(settings.api_root(), "/sensorthings/v1.1");
        assert_eq!(settings.default_top, 100);
        assert_eq!(settings.capabilities.len(), 8);
    }

    #[test]
    fn reads_overrides() {
        let settings = load_from_vars(vars(&[
            ("STA_API_PREFIX", "/sta/"),
            ("STA_VERSION", "1.0"),
            ("STA_ID_TYPE", "uuid"),
            ("STA_PROXY_BASE_URL", "https://example.org/"),
            ("STA_CAPABILITIES", "Things, Datastreams,Observations"),
        ]))
        .unwrap();
        assert_eq!(settings.api_root(), "/sta/v1.0");
        assert_eq!(settings.id_type, IdType::Uuid);
        assert_eq!(settings.proxy_base_url.as_deref(), Some("https://example.org"));
        assert_eq!(
            settings.capabilities,
            vec![EntityType::Thing, EntityType::Datastream, EntityType::Observation]
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert!(load_from_vars(vars(&[("STA_DEFAULT_TOP", "many")])).is_err());
        assert!(load_from_vars(vars(&[("STA_ID_TYPE", "float")])).is_err());
        assert!(load_from_vars(vars(&[("STA_CAPABILITIES", "Things,Widgets")])).is_err());
    }

    #[test]
    fn json_keeps_defaults_for_missing_keys() {
        let settings = load_from_json(r#"{"api_prefix": "api", "max_top": 500}"#).unwrap();
        assert_eq!(settings.api_prefix, "api");
        assert_eq!(settings.max_top, 500);
        assert_eq!(settings.version, "1.1");
        assert!(load_from_json("{").is_err());
    }
}
