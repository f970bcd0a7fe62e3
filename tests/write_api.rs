mod common;

use axum::http::{header, Method, StatusCode};
use common::{app, get, ids, send, BASE, ROOT};
use serde_json::json;

fn url(path: &str) -> String {
    format!("{}/{}", ROOT, path)
}

#[tokio::test]
async fn create_thing_with_location_reference() {
    let app = app();
    let body = json!({
        "name": "THING_3",
        "description": "Thing 3",
        "properties": {"code": "NEW"},
        "Locations": [{"@iot.id": 1}]
    });
    let (status, headers, body) = send(&app, Method::POST, &url("Things"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers[header::LOCATION], format!("{}/Things(3)", BASE).as_str());
    assert!(body.is_null());

    let (status, body) = get(&app, "Things(3)").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["properties"], json!({"code": "NEW"}));

    let (_, body) = get(&app, "Locations(1)/Things").await;
    assert_eq!(ids(&body["value"]), vec![1, 3]);
    let (_, body) = get(&app, "Locations(1)?$expand=Things").await;
    assert_eq!(ids(&body["Things"]), vec![1, 3]);
}

#[tokio::test]
async fn create_datastream_with_to_one_references() {
    let app = app();
    let body = json!({
        "name": "DATASTREAM_3",
        "description": "Datastream 3",
        "unitOfMeasurement": {"name": "Unit 3", "symbol": "U", "definition": "https://www.example.com/units/3"},
        "observationType": "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement",
        "Thing": {"@iot.id": 1},
        "Sensor": {"@iot.id": 2},
        "ObservedProperty": {"@iot.id": 1}
    });
    let (status, _, _) = send(&app, Method::POST, &url("Datastreams"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = get(&app, "Things(1)/Datastreams").await;
    assert_eq!(ids(&body["value"]), vec![1, 3]);
    let (_, body) = get(&app, "Datastreams(3)/Sensor").await;
    assert_eq!(body["name"], "SENSOR_2");
}

#[tokio::test]
async fn create_rejects_invalid_bodies() {
    let app = app();
    let (status, _, body) = send(&app, Method::POST, &url("Things"), Some(json!({"name": "no description"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "description is required for Thing");

    let missing_thing = json!({"time": "2024-01-03T00:00:00Z", "Thing": {"@iot.id": 99}});
    let (status, _, _) = send(&app, Method::POST, &url("HistoricalLocations"), Some(missing_thing)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let bad_time = json!({"time": "yesterday", "Thing": {"@iot.id": 1}});
    let (status, _, _) = send(&app, Method::POST, &url("HistoricalLocations"), Some(bad_time)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let deep_insert = json!({"name": "t", "description": "d", "Locations": [{"name": "inline"}]});
    let (status, _, _) = send(&app, Method::POST, &url("Things"), Some(deep_insert)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let to_many = json!({"name": "t", "description": "d", "Datastreams": [{"@iot.id": 1}]});
    let (status, _, _) = send(&app, Method::POST, &url("Things"), Some(to_many)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app, Method::POST, &url("Things(1)"), Some(json!({"name": "t", "description": "d"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(&app, "Things?$count=true").await;
    assert_eq!(body["@iot.count"], 2);
}

#[tokio::test]
async fn patch_updates_only_given_properties() {
    let app = app();
    let (status, _, body) = send(&app, Method::PATCH, &url("Sensors(1)"), Some(json!({"description": "patched"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (_, body) = get(&app, "Sensors(1)").await;
    assert_eq!(body["description"], "patched");
    assert_eq!(body["name"], "SENSOR_1");

    let (status, _, _) = send(&app, Method::PATCH, &url("Things(2)"), Some(json!({"Locations": [{"@iot.id": 1}]}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = get(&app, "Things(2)/Locations").await;
    assert_eq!(ids(&body["value"]), vec![1]);
    let (_, body) = get(&app, "Locations(1)?$expand=Things").await;
    assert_eq!(ids(&body["Things"]), vec![1, 2]);

    let (status, _, _) = send(&app, Method::PATCH, &url("Sensors(9)"), Some(json!({"name": "x"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_removes_the_entity() {
    let app = app();
    let (status, _, _) = send(&app, Method::DELETE, &url("Observations(1)"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get(&app, "Observations(1)").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = get(&app, "Datastreams(1)/Observations").await;
    assert_eq!(ids(&body["value"]), vec![2]);

    let (status, _, body) = send(&app, Method::DELETE, &url("Observations(1)"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _, _) = send(&app, Method::DELETE, &url("Observations"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
