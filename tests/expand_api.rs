mod common;

use axum::http::StatusCode;
use common::{app, app_with, get, ids, BASE};
use sensorthings_sdk::Settings;
use serde_json::{json, Value};

#[tokio::test]
async fn expands_many_to_many_locations() {
    let (status, body) = get(&app(), "Things(1)?$expand=Locations").await;
    assert_eq!(status, StatusCode::OK);
    let locations = &body["Locations"];
    assert_eq!(ids(locations), vec![1]);
    assert_eq!(locations[0]["name"], "LOCATION_1");
    assert_eq!(locations[0]["encodingType"], "application/geo+json");
    assert!(body.get("Locations@iot.navigationLink").is_none());
    assert_eq!(body["Datastreams@iot.navigationLink"], format!("{}/Things(1)/Datastreams", BASE));

    let (_, body) = get(&app(), "Things?$expand=Locations").await;
    assert_eq!(ids(&body["value"][1]["Locations"]), vec![2, 3]);
}

#[tokio::test]
async fn expanded_entities_keep_self_links_only() {
    let (_, body) = get(&app(), "Things(2)?$expand=Datastreams").await;
    let ds = &body["Datastreams"][0];
    assert_eq!(ds["@iot.selfLink"], format!("{}/Datastreams(2)", BASE));
    assert!(ds.get("Thing@iot.navigationLink").is_none());
    assert!(ds.get("Observations@iot.navigationLink").is_none());
    assert!(ds.get("thingId").is_none());
}

#[tokio::test]
async fn chained_and_nested_expansions() {
    let (_, body) = get(&app(), "Datastreams?$expand=Thing/Locations,Sensor($select=name)").await;
    let first = &body["value"][0];
    assert_eq!(first["Thing"]["name"], "THING_1");
    assert_eq!(ids(&first["Thing"]["Locations"]), vec![1]);
    assert_eq!(first["Sensor"], json!({"name": "SENSOR_1"}));
    assert_eq!(
        first["ObservedProperty@iot.navigationLink"],
        format!("{}/Datastreams(1)/ObservedProperty", BASE)
    );
}

#[tokio::test]
async fn to_many_expansion_attaches_fk_matches_in_order() {
    let (_, body) = get(&app(), "Datastreams?$expand=Observations($orderby=result%20desc)").await;
    assert_eq!(ids(&body["value"][0]["Observations"]), vec![2, 1]);
    assert_eq!(ids(&body["value"][1]["Observations"]), vec![4, 3]);
}

#[tokio::test]
async fn to_one_expansion_excluded_by_nested_filter_is_null() {
    let (_, body) = get(&app(), "Observations?$expand=FeatureOfInterest($filter=name%20eq%20'FEATURE_OF_INTEREST_2')").await;
    assert_eq!(body["value"][0]["FeatureOfInterest"], Value::Null);
    assert_eq!(body["value"][2]["FeatureOfInterest"]["@iot.id"], 2);
}

#[tokio::test]
async fn nested_top_applies_to_the_combined_batch() {
    let (_, body) = get(&app(), "Things?$expand=Datastreams/Observations($top=1)").await;
    assert_eq!(ids(&body["value"][0]["Datastreams"][0]["Observations"]), vec![1]);
    assert_eq!(body["value"][1]["Datastreams"][0]["Observations"], json!([]));
}

#[tokio::test]
async fn unknown_expand_names_change_nothing() {
    let (_, plain) = get(&app(), "Things").await;
    let (_, expanded) = get(&app(), "Things?$expand=Gadgets").await;
    assert_eq!(plain, expanded);
}

#[tokio::test]
async fn expansion_depth_limit() {
    let settings = Settings {
        max_expand_depth: 2,
        ..Settings::default()
    };
    let (status, _) = get(&app_with(settings.clone()), "Things?$expand=Datastreams/Sensor").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = get(&app_with(settings), "Things?$expand=Datastreams/Sensor/Datastreams").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn historical_locations_link_both_ways() {
    let (_, body) = get(&app(), "HistoricalLocations(2)?$expand=Locations,Thing").await;
    assert_eq!(ids(&body["Locations"]), vec![2, 3]);
    assert_eq!(body["Thing"]["@iot.id"], 2);
    let (_, body) = get(&app(), "Locations?$expand=HistoricalLocations").await;
    assert_eq!(ids(&body["value"][0]["HistoricalLocations"]), Vec::<i64>::new());
    assert_eq!(ids(&body["value"][1]["HistoricalLocations"]), vec![1, 2]);
    assert_eq!(ids(&body["value"][2]["HistoricalLocations"]), vec![2]);
}
