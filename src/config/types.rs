//! Runtime settings: URL layout, id handling, paging limits and enabled entity types.

use crate::model::EntityType;
use serde::{Deserialize, Serialize};

/// Identifier type used when parsing ids out of resource paths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    #[default]
    Integer,
    Uuid,
    Text,
}

impl std::str::FromStr for IdType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "integer" | "int" | "bigint" => Ok(IdType::Integer),
            "uuid" => Ok(IdType::Uuid),
            "text" | "string" => Ok(IdType::Text),
            other => Err(format!("expected integer, uuid or text, got {}", other)),
        }
    }
}

/// Immutable settings handed to the link builder, the engine and the router at construction time.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scheme: String,
    /// Replaces `{scheme}://{host}` in every generated link when the API sits behind a proxy.
    pub proxy_base_url: Option<String>,
    pub api_prefix: String,
    /// STA version; `1.0` or `1.1`.
    pub version: String,
    pub id_type: IdType,
    /// Wrapped around ids in generated links, e.g. `'` for `Things('abc')`.
    pub id_qualifier: String,
    pub default_top: u32,
    pub max_top: u32,
    pub max_expand_depth: usize,
    /// Entity types exposed by the router.
    pub capabilities: Vec<EntityType>,
    /// Request body limit in bytes.
    pub body_limit: usize,
}

pub const DEFAULT_TOP: u32 = 100;
pub const MAX_TOP: u32 = 1000;
pub const MAX_EXPAND_DEPTH: usize = 5;

impl Default for Settings {
    fn default() -> Self {
        Settings {
            scheme: "http".into(),
            proxy_base_url: None,
            api_prefix: "sensorthings".into(),
            version: "1.1".into(),
            id_type: IdType::Integer,
            id_qualifier: String::new(),
            default_top: DEFAULT_TOP,
            max_top: MAX_TOP,
            max_expand_depth: MAX_EXPAND_DEPTH,
            capabilities: EntityType::ALL.to_vec(),
            body_limit: 2 * 1024 * 1024,
        }
    }
}

impl Settings {
    /// Mount point of the API, e.g. `/sensorthings/v1.1`.
    pub fn api_root(&self) -> String {
        format!("/{}/v{}", self.api_prefix, self.version)
    }

    pub fn is_enabled(&self, entity_type: EntityType) -> bool {
        self.capabilities.contains(&entity_type)
    }
}
