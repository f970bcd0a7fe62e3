//! Reference URLs: self links, navigation links, collection links and next-page links.

use crate::config::{Settings, DEFAULT_TOP};
use crate::model::{EntityId, EntityType, Relation};

/// Builds absolute STA URLs for one request. The host comes from the request unless a proxy base URL is configured.
#[derive(Clone, Debug)]
pub struct LinkBuilder {
    base_url: String,
    id_qualifier: String,
}

impl LinkBuilder {
    pub fn new(settings: &Settings, host: &str) -> Self {
        let origin = settings
            .proxy_base_url
            .clone()
            .unwrap_or_else(|| format!("{}://{}", settings.scheme, host));
        LinkBuilder {
            base_url: format!("{}{}", origin, settings.api_root()),
            id_qualifier: settings.id_qualifier.clone(),
        }
    }

    /// `{base}/{EntityTypePlural}[({id})][/{Relation}]`. Relation names are already plural for collections.
    pub fn build_ref(&self, entity_type: EntityType, entity_id: Option<&EntityId>, related: Option<&Relation>) -> String {
        let mut url = format!("{}/{}", self.base_url, entity_type.plural());
        if let Some(id) = entity_id {
            url.push_str(&format!("({q}{id}{q})", q = self.id_qualifier, id = id));
        }
        if let Some(rel) = related {
            url.push('/');
            url.push_str(rel.name);
        }
        url
    }

    pub fn collection_link(&self, entity_type: EntityType) -> String {
        self.build_ref(entity_type, None, None)
    }

    pub fn self_link(&self, entity_type: EntityType, id: &EntityId) -> String {
        self.build_ref(entity_type, Some(id), None)
    }

    pub fn navigation_link(&self, entity_type: EntityType, id: &EntityId, relation: &Relation) -> String {
        self.build_ref(entity_type, Some(id), Some(relation))
    }

    /// Link to the next page, present only while `top + skip < count`.
    pub fn build_next_link(
        &self,
        entity_type: EntityType,
        count: u64,
        top: Option<u32>,
        skip: Option<u32>,
    ) -> Option<String> {
        let top = u64::from(top.unwrap_or(DEFAULT_TOP));
        let skip = u64::from(skip.unwrap_or(0));
        if top + skip < count {
            Some(format!(
                "{}?$top={}&$skip={}",
                self.collection_link(entity_type),
                top,
                top + skip
            ))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::find_relation;

    fn links() -> LinkBuilder {
        LinkBuilder::new(&Settings::default(), "testserver")
    }

    #[test]
    fn builds_entity_and_navigation_links() {
        let l = links();
        assert_eq!(l.collection_link(EntityType::Thing), "http://testserver/sensorthings/v1.1/Things");
        assert_eq!(
            l.self_link(EntityType::Datastream, &EntityId::Int(1)),
            "http://testserver/sensorthings/v1.1/Datastreams(1)"
        );
        let rel = find_relation(EntityType::Observation, "FeatureOfInterest").unwrap();
        assert_eq!(
            l.navigation_link(EntityType::Observation, &EntityId::Int(3), rel),
            "http://testserver/sensorthings/v1.1/Observations(3)/FeatureOfInterest"
        );
        let rel = find_relation(EntityType::Thing, "Datastreams").unwrap();
        assert_eq!(
            l.navigation_link(EntityType::Thing, &EntityId::Int(1), rel),
            "http://testserver/sensorthings/v1.1/Things(1)/Datastreams"
        );
    }

    #[test]
    fn uses_proxy_base_url_and_id_qualifier() {
        let settings = Settings {
            proxy_base_url: Some("https://proxy.example.org".into()),
            id_qualifier: "'".into(),
            ..Settings::default()
        };
        let l = LinkBuilder::new(&settings, "ignored:8000");
        assert_eq!(
            l.self_link(EntityType::Sensor, &EntityId::from("abc")),
            "https://proxy.example.org/sensorthings/v1.1/Sensors('abc')"
        );
    }

    #[test]
    fn next_link_present_iff_more_rows_remain() {
        let l = links();
        for count in 0..12u64 {
            for top in 1..5u32 {
                for skip in 0..6u32 {
                    let next = l.build_next_link(EntityType::Observation, count, Some(top), Some(skip));
                    let more = u64::from(top + skip) < count;
                    assert_eq!(next.is_some(), more, "count={count} top={top} skip={skip}");
                    if let Some(next) = next {
                        assert!(next.ends_with(&format!("?$top={}&$skip={}", top, top + skip)));
                    }
                }
            }
        }
    }

    #[test]
    fn next_link_defaults() {
        let l = links();
        assert_eq!(l.build_next_link(EntityType::Thing, 100, None, None), None);
        assert_eq!(
            l.build_next_link(EntityType::Thing, 101, None, None).as_deref(),
            Some("http://testserver/sensorthings/v1.1/Things?$top=100&$skip=100")
        );
        assert_eq!(
            l.build_next_link(EntityType::Observation, 3, Some(1), Some(1)).as_deref(),
            Some("http://testserver/sensorthings/v1.1/Observations?$top=1&$skip=2")
        );
    }
}
