//! HTTP contract of the pathways server, driven through the router with an
//! in-memory store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use pathways_core::{EnrollmentStatus, JoinTable, MemoryPathwayStore, ReconcilePolicy};
use pathways_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn seeded_store() -> Arc<MemoryPathwayStore> {
    let store = Arc::new(MemoryPathwayStore::new());
    store.add_data_field("t1", Some("Statistics")).await;
    store.add_data_field("t2", Some("Databases")).await;
    store.add_offer(1, "Intro to Data").await;
    store.add_offer(2, "Machine Learning").await;
    store
}

fn app(store: &Arc<MemoryPathwayStore>) -> axum::Router {
    let state = AppState::new(
        store.clone(),
        store.clone(),
        ReconcilePolicy::default(),
        JoinTable::pathways_datafields(),
    );
    build_router(state, "/pathways")
}

async fn send(app: axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create(store: &Arc<MemoryPathwayStore>, body: Value) -> Value {
    let (status, json) = send(app(store), Method::POST, "/pathways", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

#[tokio::test]
async fn health_is_ok() {
    let store = seeded_store().await;
    let (status, json) = send(app(&store), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn create_returns_materialized_pathway() {
    let store = seeded_store().await;
    let json = create(
        &store,
        json!({
            "name": "Data Science",
            "topics": ["t1", null, "", "t2", "t1"],
            "groups_of_offers": [{"offer_id": 1, "group_name": "A", "semester": "F24"}]
        }),
    )
    .await;

    assert_eq!(json["name"], "Data Science");
    assert_eq!(json["Providers"], json!([]));
    let topics: Vec<&str> = json["DataFields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(topics, vec!["t1", "t2"]);
    assert_eq!(json["GroupsOfOffers"][0]["Offer"]["name"], "Intro to Data");
}

#[tokio::test]
async fn create_without_name_is_rejected() {
    let store = seeded_store().await;
    let (status, json) = send(
        app(&store),
        Method::POST,
        "/pathways",
        Some(json!({"topics": ["t1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn create_with_unknown_offer_is_a_validation_error() {
    let store = seeded_store().await;
    let (status, _) = send(
        app(&store),
        Method::POST,
        "/pathways",
        Some(json!({
            "name": "Broken",
            "topics": ["t1"],
            "groups_of_offers": [{"offer_id": 99, "group_name": "A", "semester": "F24"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(app(&store), Method::GET, "/pathways", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!([]));
}

#[tokio::test]
async fn create_ignores_falsy_topic_entries() {
    let store = seeded_store().await;
    let json = create(
        &store,
        json!({"name": "Data Science", "topics": ["t1", false, 0, null]}),
    )
    .await;
    assert_eq!(json["DataFields"].as_array().unwrap().len(), 1);
    assert_eq!(json["DataFields"][0]["id"], "t1");
}

#[tokio::test]
async fn update_without_groups_keeps_existing_groups() {
    let store = seeded_store().await;
    let created = create(
        &store,
        json!({
            "name": "Data Science",
            "topics": ["t1"],
            "groups_of_offers": [{"offer_id": 2, "group_name": "B", "semester": "S25"}]
        }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, json) = send(
        app(&store),
        Method::PUT,
        &format!("/pathways/{id}"),
        Some(json!({"description": "Revised", "topics": ["t2"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Data Science");
    assert_eq!(json["description"], "Revised");
    assert_eq!(json["GroupsOfOffers"].as_array().unwrap().len(), 1);
    // topics are appended under the default policy
    assert_eq!(json["DataFields"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn update_with_empty_groups_clears_them() {
    let store = seeded_store().await;
    let created = create(
        &store,
        json!({
            "name": "Data Science",
            "groups_of_offers": [{"offer_id": 1, "group_name": "A", "semester": "F24"}]
        }),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, json) = send(
        app(&store),
        Method::PUT,
        &format!("/pathways/{id}"),
        Some(json!({"groups_of_offers": []})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["GroupsOfOffers"], json!([]));
}

#[tokio::test]
async fn missing_pathway_is_404() {
    let store = seeded_store().await;
    let (status, json) = send(app(&store), Method::GET, "/pathways/404", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "not found: pathway 404");

    let (status, _) = send(
        app(&store),
        Method::PUT,
        "/pathways/404",
        Some(json!({"name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_and_list_attach_offer_groups() {
    let store = seeded_store().await;
    let first = create(
        &store,
        json!({
            "name": "First",
            "groups_of_offers": [{"offer_id": 1, "group_name": "A", "semester": "F24"}]
        }),
    )
    .await;
    create(&store, json!({"name": "Second"})).await;

    let id = first["id"].as_i64().unwrap();
    let (status, json) = send(app(&store), Method::GET, &format!("/pathways/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["GroupsOfOffers"][0]["semester"], "F24");
    assert!(json["DataFields"].is_array());

    let (status, json) = send(app(&store), Method::GET, "/pathways", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["name"], "First");
    assert_eq!(list[0]["GroupsOfOffers"].as_array().unwrap().len(), 1);
    assert_eq!(list[0]["DataFields"], json!([]));
    assert_eq!(list[0]["Providers"], json!([]));
    assert_eq!(list[1]["GroupsOfOffers"], json!([]));

    let (_, json) = send(app(&store), Method::GET, "/pathways?limit=1&offset=1", None).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["name"], "Second");

    let (status, _) = send(app(&store), Method::GET, "/pathways?limit=-1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chart_endpoint_counts_statuses_per_semester() {
    let store = seeded_store().await;
    let created = create(
        &store,
        json!({
            "name": "Data Science",
            "groups_of_offers": [
                {"offer_id": 1, "group_name": "A", "semester": "F24"},
                {"offer_id": 2, "group_name": "A", "semester": "S25"}
            ]
        }),
    )
    .await;
    store.set_enrollment(7, 1, EnrollmentStatus::Activated).await;
    store.set_enrollment(7, 2, EnrollmentStatus::Approved).await;

    let (status, json) = send(
        app(&store),
        Method::POST,
        "/pathways/generate_userpathway_chart_data",
        Some(json!({"student_id": 7, "pathway_id": created["id"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["labels"], json!(["F24", "S25"]));
    assert_eq!(
        json["datasets"],
        json!([
            {"label": "Enrolled", "backgroundColor": "rgb(0,0,255)", "data": [1, 0]},
            {"label": "Passed", "backgroundColor": "rgb(0,255,0)", "data": [0, 1]},
            {"label": "Unenrolled", "backgroundColor": "rgba(255,255,0,0.2)", "data": [0, 0]},
            {"label": "Failed", "backgroundColor": "rgb(255,99,132)", "data": [0, 0]}
        ])
    );
}

#[tokio::test]
async fn chart_errors_map_to_status_codes() {
    let store = seeded_store().await;
    let (status, _) = send(
        app(&store),
        Method::POST,
        "/pathways/generate_userpathway_chart_data",
        Some(json!({"student_id": 7, "pathway_id": 12345})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let created = create(
        &store,
        json!({
            "name": "Data Science",
            "groups_of_offers": [{"offer_id": 1, "group_name": "A", "semester": "F24"}]
        }),
    )
    .await;
    store.fail_lookups("enrollment service timed out").await;
    let (status, json) = send(
        app(&store),
        Method::POST,
        "/pathways/generate_userpathway_chart_data",
        Some(json!({"student_id": 7, "pathway_id": created["id"], "group_name": "A"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("enrollment service timed out"));
}
