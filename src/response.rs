//! Wire shapes: entity formatting, collection envelope and the landing page.

use crate::case::to_camel_case;
use crate::config::Settings;
use crate::data_array::{selected_fields, to_data_array, DataArrayGroup};
use crate::links::LinkBuilder;
use crate::model::{find_relation, relations_of, Entity, EntityType};
use crate::query::QueryOptions;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub const ID_KEY: &str = "@iot.id";
pub const SELF_LINK_KEY: &str = "@iot.selfLink";
pub const NAVIGATION_LINK_SUFFIX: &str = "@iot.navigationLink";

/// Collection envelope.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    #[serde(rename = "@iot.count", skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    pub value: Vec<Value>,
    #[serde(rename = "@iot.nextLink", skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

/// One page of internal entities plus the paging metadata the envelope reports.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntityPage {
    pub values: Vec<Entity>,
    pub count: Option<u64>,
    pub next_link: Option<String>,
}

fn is_reference_field(key: &str) -> bool {
    EntityType::ALL
        .iter()
        .any(|t| key == t.foreign_key() || key == t.join_list())
}

/// Convert an internal entity (links and expansions already attached) to its wire form.
pub fn entity_to_wire(entity_type: EntityType, entity: Entity, select: &[String]) -> Value {
    let mut out = Map::new();
    for (key, value) in entity {
        match key.as_str() {
            "id" => {
                out.insert(ID_KEY.into(), value);
            }
            "self_link" => {
                out.insert(SELF_LINK_KEY.into(), value);
            }
            _ => {
                if let Some(rel) = key.strip_suffix("_link").and_then(|k| find_relation(entity_type, k)) {
                    out.insert(format!("{}{}", rel.name, NAVIGATION_LINK_SUFFIX), value);
                } else if let Some(rel) = key.strip_suffix("_rel").and_then(|k| find_relation(entity_type, k)) {
                    out.insert(rel.name.to_string(), value);
                } else if !is_reference_field(&key) {
                    out.insert(to_camel_case(&key), value);
                }
            }
        }
    }
    if !select.is_empty() {
        out.retain(|key, _| is_selected(entity_type, key, select));
    }
    Value::Object(out)
}

fn is_selected(entity_type: EntityType, key: &str, select: &[String]) -> bool {
    let wanted = |name: &str| select.iter().any(|s| s == name);
    match key {
        ID_KEY => wanted("id") || wanted(ID_KEY),
        SELF_LINK_KEY => wanted("selfLink") || wanted(SELF_LINK_KEY),
        _ => match key.strip_suffix(NAVIGATION_LINK_SUFFIX) {
            Some(relation) => wanted(relation),
            // expanded relations are always kept
            None => relations_of(entity_type).iter().any(|r| r.name == key) || wanted(key),
        },
    }
}

/// Format a page as a collection response. Observations in data-array mode become Datastream groups.
pub fn collection(entity_type: EntityType, page: EntityPage, options: &QueryOptions, links: &LinkBuilder) -> ListResponse {
    let value = if entity_type == EntityType::Observation && options.is_data_array() {
        let fields = selected_fields(&options.select);
        to_data_array(&page.values, &fields, links)
            .into_iter()
            .map(DataArrayGroup::into_value)
            .collect()
    } else {
        page.values
            .into_iter()
            .map(|e| entity_to_wire(entity_type, e, &options.select))
            .collect()
    };
    ListResponse {
        count: page.count,
        value,
        next_link: page.next_link,
    }
}

const CONFORMANCE: &[&str] = &[
    "http://www.opengis.net/spec/iot_sensing/1.1/req/datamodel",
    "http://www.opengis.net/spec/iot_sensing/1.1/req/resource-path/resource-path-to-entities",
    "http://www.opengis.net/spec/iot_sensing/1.1/req/request-data",
    "http://www.opengis.net/spec/iot_sensing/1.1/req/create-update-delete",
    "http://www.opengis.net/spec/iot_sensing/1.1/req/data-array/data-array",
];

/// Service root document listing the enabled collections.
pub fn landing(settings: &Settings, links: &LinkBuilder) -> Value {
    let value: Vec<Value> = EntityType::ALL
        .into_iter()
        .filter(|t| settings.is_enabled(*t))
        .map(|t| json!({"name": t.plural(), "url": links.collection_link(t)}))
        .collect();
    json!({
        "value": value,
        "serverSettings": {"conformance": CONFORMANCE},
    })
}
