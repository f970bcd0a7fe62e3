mod common;

use axum::http::{Method, StatusCode};
use common::{app, get, ids, send, ROOT};
use serde_json::json;

fn url() -> String {
    format!("{}/DeleteObservations", ROOT)
}

#[tokio::test]
async fn deletes_observations_in_a_phenomenon_time_interval() {
    let app = app();
    let body = json!({
        "Datastream": {"@iot.id": 1},
        "phenomenonTime": "2024-01-02T00:00:00Z/2024-01-31T00:00:00Z"
    });
    let (status, _, body) = send(&app, Method::POST, &url(), Some(body)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (_, body) = get(&app, "Datastreams(1)/Observations").await;
    assert_eq!(ids(&body["value"]), vec![1]);
    let (_, body) = get(&app, "Datastreams(2)/Observations").await;
    assert_eq!(ids(&body["value"]), vec![3, 4]);
}

#[tokio::test]
async fn deletes_all_observations_of_a_datastream() {
    let app = app();
    let (status, _, _) = send(&app, Method::POST, &url(), Some(json!({"Datastream": {"@iot.id": 2}}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = get(&app, "Observations").await;
    assert_eq!(ids(&body["value"]), vec![1, 2]);
}

#[tokio::test]
async fn rejects_bad_delete_requests() {
    let app = app();
    let bad_interval = json!({"Datastream": {"@iot.id": 1}, "phenomenonTime": "January"});
    let (status, _, body) = send(&app, Method::POST, &url(), Some(bad_interval)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _, _) = send(&app, Method::POST, &url(), Some(json!({"phenomenonTime": "2024-01-01T00:00:00Z"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _, _) = send(&app, Method::POST, &url(), Some(json!({"Datastream": {"@iot.id": 9}}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&app, "Observations?$count=true").await;
    assert_eq!(body["@iot.count"], 4);
}
