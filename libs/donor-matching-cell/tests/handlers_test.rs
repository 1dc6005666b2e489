use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use donor_matching_cell::router::donor_matching_routes;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

async fn setup_donors(donors: Vec<Value>) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/donor_profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(donors)))
        .mount(&mock_server)
        .await;
    mock_server
}

fn maharashtra_donors() -> Vec<Value> {
    vec![
        MockSupabaseResponses::donor_row("a-neg", "A-", "Nagpur", "Maharashtra", 6, false),
        MockSupabaseResponses::donor_row("o-neg", "O-", "Nashik", "Maharashtra", 1, true),
        MockSupabaseResponses::donor_row("b-pos", "B+", "Pune", "Maharashtra", 9, true),
    ]
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn match_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/match")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn match_without_scorer_uses_fallback() {
    let store = setup_donors(maharashtra_donors()).await;
    let app = donor_matching_routes(TestConfig::with_store(&store.uri()).to_arc());

    let (status, body) = send(
        app,
        match_request(json!({
            "blood_type": "a-",
            "location": { "city": "Pune", "state": "maharashtra" }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["total"], 2);
    assert_eq!(body["predictions"][0]["donor_id"], "o-neg");
    assert_eq!(body["predictions"][0]["source"], "fallback");
    assert_eq!(body["predictions"][1]["donor_id"], "a-neg");
    assert_eq!(body["predictions"][1]["factors"]["availability"], 0.5);
}

#[tokio::test]
async fn match_with_scorer_reports_external_source() {
    let store = setup_donors(maharashtra_donors()).await;
    let scorer = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [
                { "donorId": "o-neg", "compatibilityScore": 0.3 },
                { "donorId": "a-neg", "compatibilityScore": 0.8 }
            ]
        })))
        .mount(&scorer)
        .await;

    let config = TestConfig::with_store(&store.uri()).with_ranking_service(&scorer.uri());
    let (status, body) = send(
        donor_matching_routes(config.to_arc()),
        match_request(json!({
            "bloodType": "A-",
            "location": { "city": "Pune", "state": "Maharashtra" },
            "urgency": "critical"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "external");
    assert_eq!(body["predictions"][0]["donor_id"], "a-neg");
    assert_eq!(body["predictions"][0]["score"], 0.8);
}

#[tokio::test]
async fn scorer_outage_never_surfaces_as_error() {
    let store = setup_donors(maharashtra_donors()).await;
    let scorer = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&scorer)
        .await;

    let config = TestConfig::with_store(&store.uri()).with_ranking_service(&scorer.uri());
    let (status, body) = send(
        donor_matching_routes(config.to_arc()),
        match_request(json!({ "blood_type": "A-", "location": { "city": "Pune", "state": "Maharashtra" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn no_nearby_donor_is_an_empty_fallback_result() {
    let store = setup_donors(maharashtra_donors()).await;
    let app = donor_matching_routes(TestConfig::with_store(&store.uri()).to_arc());

    let (status, body) = send(
        app,
        match_request(json!({ "blood_type": "A-", "location": { "city": "Mysuru", "state": "Karnataka" } })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["predictions"], json!([]));
}

#[tokio::test]
async fn empty_donor_registry_is_not_found() {
    let store = setup_donors(vec![]).await;
    let app = donor_matching_routes(TestConfig::with_store(&store.uri()).to_arc());

    let (status, body) = send(
        app,
        match_request(json!({ "blood_type": "O+", "location": { "city": "Pune", "state": "Maharashtra" } })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
}

#[tokio::test]
async fn unknown_blood_type_is_rejected_before_store_access() {
    let store = setup_donors(maharashtra_donors()).await;
    let app = donor_matching_routes(TestConfig::with_store(&store.uri()).to_arc());

    let (status, body) = send(
        app,
        match_request(json!({ "blood_type": "Q+", "location": { "city": "Pune", "state": "Maharashtra" } })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert!(store.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn compatibility_query_answers_both_directions() {
    let app = donor_matching_routes(TestConfig::default().to_arc());

    let (status, body) = send(app.clone(), get("/compatibility?donor=O-&recipient=AB%2B")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["compatible"], true);
    assert_eq!(body["donor_can_give_to"].as_array().unwrap().len(), 8);
    assert_eq!(body["recipient_can_receive_from"].as_array().unwrap().len(), 8);

    let (_, body) = send(app.clone(), get("/compatibility?donor=A%2B&recipient=O-")).await;
    assert_eq!(body["compatible"], false);

    let (status, _) = send(app, get("/compatibility")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_online_and_offline() {
    let scorer = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "healthy", "model_loaded": true })))
        .mount(&scorer)
        .await;

    let online = donor_matching_routes(TestConfig::default().with_ranking_service(&scorer.uri()).to_arc());
    let (status, body) = send(online, get("/ranking-service/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ranking_service"], "online");
    assert_eq!(body["details"]["status"], "healthy");

    let offline = donor_matching_routes(TestConfig::default().to_arc());
    let (_, body) = send(offline, get("/ranking-service/health")).await;
    assert_eq!(body["ranking_service"], "offline");
}
