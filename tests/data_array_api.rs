mod common;

use axum::http::{Method, StatusCode};
use common::{app, get, send, BASE, ROOT};
use serde_json::json;

#[tokio::test]
async fn groups_observations_by_datastream() {
    let (status, body) = get(&app(), "Observations?$resultFormat=dataArray").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["value"],
        json!([
            {
                "Datastream@iot.navigationLink": format!("{}/Datastreams(1)", BASE),
                "components": ["phenomenonTime", "result"],
                "dataArray": [["2024-01-01T00:00:00Z", 10], ["2024-01-02T00:00:00Z", 15]]
            },
            {
                "Datastream@iot.navigationLink": format!("{}/Datastreams(2)", BASE),
                "components": ["phenomenonTime", "result"],
                "dataArray": [["2024-01-01T00:00:00Z", 20], ["2024-01-02T00:00:00Z", 25]]
            }
        ])
    );
}

#[tokio::test]
async fn select_picks_components_in_catalog_order() {
    let (_, body) = get(&app(), "Observations?$resultFormat=dataArray&$select=result,id,FeatureOfInterest/id").await;
    assert_eq!(body["value"][1]["components"], json!(["@iot.id", "result", "FeatureOfInterest/id"]));
    assert_eq!(body["value"][1]["dataArray"], json!([[3, 20, 2], [4, 25, 2]]));
}

#[tokio::test]
async fn paging_applies_before_grouping() {
    let (_, body) = get(&app(), "Datastreams(1)/Observations?$resultFormat=dataArray&$skip=1&$top=1").await;
    assert_eq!(body["value"][0]["dataArray"], json!([["2024-01-02T00:00:00Z", 15]]));
    assert!(body.get("@iot.nextLink").is_none());

    let (_, body) = get(&app(), "Observations?$resultFormat=dataArray&$skip=1&$top=1&$count=true").await;
    assert_eq!(body["@iot.count"], 4);
    assert_eq!(body["value"][0]["dataArray"], json!([["2024-01-02T00:00:00Z", 15]]));
    assert_eq!(body["@iot.nextLink"], format!("{}/Observations?$top=1&$skip=2", BASE));
}

#[tokio::test]
async fn expanded_under_a_datastream_is_one_group() {
    let (_, body) = get(&app(), "Datastreams(2)?$expand=Observations($resultFormat=dataArray)").await;
    assert_eq!(
        body["Observations"],
        json!({
            "components": ["phenomenonTime", "result"],
            "dataArray": [["2024-01-01T00:00:00Z", 20], ["2024-01-02T00:00:00Z", 25]]
        })
    );
}

#[tokio::test]
async fn create_observations_from_data_array() {
    let app = app();
    let payload = json!([{
        "Datastream": {"@iot.id": 1},
        "components": ["phenomenonTime", "result", "FeatureOfInterest/id"],
        "dataArray": [
            ["2024-01-03T00:00:00Z", 30, 1],
            ["2024-01-04T00:00:00Z", 35, 1]
        ]
    }]);
    let (status, _, body) = send(&app, Method::POST, &format!("{}/CreateObservations", ROOT), Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body,
        json!([format!("{}/Observations(5)", BASE), format!("{}/Observations(6)", BASE)])
    );

    let (_, body) = get(&app, "Datastreams(1)/Observations?$count=true&$resultFormat=dataArray").await;
    assert_eq!(body["@iot.count"], 4);
    assert_eq!(body["value"][0]["dataArray"][3], json!(["2024-01-04T00:00:00Z", 35]));

    let (_, body) = get(&app, "Observations(5)?$expand=FeatureOfInterest").await;
    assert_eq!(body["FeatureOfInterest"]["@iot.id"], 1);
}

#[tokio::test]
async fn create_observations_rejects_bad_payloads() {
    let app = app();
    let ragged = json!([{
        "Datastream": {"@iot.id": 1},
        "components": ["phenomenonTime", "result"],
        "dataArray": [["2024-01-03T00:00:00Z"]]
    }]);
    let (status, _, body) = send(&app, Method::POST, &format!("{}/CreateObservations", ROOT), Some(ragged)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let unknown = json!([{
        "Datastream": {"@iot.id": 9},
        "components": ["result"],
        "dataArray": [[1]]
    }]);
    let (status, _, _) = send(&app, Method::POST, &format!("{}/CreateObservations", ROOT), Some(unknown)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, body) = get(&app, "Observations?$count=true").await;
    assert_eq!(body["@iot.count"], 4);
}

#[tokio::test]
async fn create_observations_checks_feature_of_interest_references() {
    let app = app();
    let dangling = json!([{
        "Datastream": {"@iot.id": 1},
        "components": ["result", "FeatureOfInterest/id"],
        "dataArray": [[30, 1], [31, 999]]
    }]);
    let (status, _, body) = send(&app, Method::POST, &format!("{}/CreateObservations", ROOT), Some(dangling)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "referenced FeatureOfInterest 999 does not exist");

    let (_, body) = get(&app, "Observations?$count=true").await;
    assert_eq!(body["@iot.count"], 4);
}
