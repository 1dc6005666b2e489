use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use donor_matching_cell::models::{
    BloodType, DonorCandidate, Location, RankingSource, RequestCriteria, ScorerError, Urgency,
};
use donor_matching_cell::services::{
    DonorRankingEngine, DonorScorer, HttpDonorScorer, RankingSettings, ScoreRequest, ScoreResponse,
};

// ==============================================================================
// TEST FIXTURES
// ==============================================================================

fn criteria() -> RequestCriteria {
    RequestCriteria {
        blood_type: BloodType::ANegative,
        location: Location::new("Pune", "Maharashtra"),
        urgency: Urgency::High,
        as_of: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
    }
}

fn donor(id: &str, blood_type: BloodType, city: &str, emergency: bool, total: u32) -> DonorCandidate {
    DonorCandidate {
        donor_id: id.to_string(),
        blood_type,
        city: city.to_string(),
        state: "Maharashtra".to_string(),
        last_donation_date: None,
        next_eligible_date: None,
        total_donations: total,
        available_for_emergency: emergency,
    }
}

/// No donor in Pune; one A- and one O- elsewhere in the state.
fn state_only_pool() -> Vec<DonorCandidate> {
    vec![
        donor("a-neg", BloodType::ANegative, "Nagpur", false, 6),
        donor("o-neg", BloodType::ONegative, "Nashik", true, 1),
        donor("a-pos", BloodType::APositive, "Pune", true, 20),
    ]
}

fn engine(timeout: Duration) -> DonorRankingEngine {
    DonorRankingEngine::new(RankingSettings {
        scorer_timeout: timeout,
        ..RankingSettings::default()
    })
}

struct FailingScorer;

#[async_trait]
impl DonorScorer for FailingScorer {
    async fn score(&self, _request: &ScoreRequest) -> Result<ScoreResponse, ScorerError> {
        Err(ScorerError::Transport("connection refused".to_string()))
    }
}

// ==============================================================================
// EXTERNAL SCORER
// ==============================================================================

#[tokio::test]
async fn external_scores_are_merged_and_sorted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .and(body_partial_json(json!({ "bloodType": "A-", "urgency": "high" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [
                { "donorId": "a-neg", "compatibilityScore": 0.91 },
                {
                    "donorId": "o-neg",
                    "compatibilityScore": 0.42,
                    "factors": {
                        "bloodTypeMatch": 0.8,
                        "locationProximity": 0.6,
                        "availability": 1.0,
                        "donationHistory": 0.1
                    }
                },
                { "donorId": "stranger", "compatibilityScore": 0.99 }
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let scorer = HttpDonorScorer::new(&mock_server.uri());
    let results = engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &state_only_pool(), Some(&scorer))
        .await;

    let ids: Vec<&str> = results.iter().map(|r| r.donor_id.as_str()).collect();
    assert_eq!(ids, vec!["a-neg", "o-neg"]);
    assert!(results.iter().all(|r| r.source == RankingSource::External));
    // Missing factors are filled locally; supplied ones are kept.
    assert_eq!(results[0].factors.location_proximity, 0.7);
    assert_eq!(results[1].factors.blood_type_match, 0.8);
    assert_eq!(results[0].donor.city, "Nagpur");
}

#[tokio::test]
async fn incompatible_donors_are_never_sent_to_scorer() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "predictions": [] })))
        .mount(&mock_server)
        .await;

    let scorer = HttpDonorScorer::new(&mock_server.uri());
    engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &state_only_pool(), Some(&scorer))
        .await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let sent: Vec<&str> = body["donors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["donorId"].as_str().unwrap())
        .collect();
    assert_eq!(sent, vec!["a-neg", "o-neg"]);
}

#[tokio::test]
async fn scorer_error_status_falls_back_without_retry() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let scorer = HttpDonorScorer::new(&mock_server.uri());
    let results = engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &state_only_pool(), Some(&scorer))
        .await;

    let ids: Vec<&str> = results.iter().map(|r| r.donor_id.as_str()).collect();
    assert_eq!(ids, vec!["o-neg", "a-neg"]);
    assert!(results.iter().all(|r| r.source == RankingSource::Fallback));
}

#[tokio::test]
async fn out_of_range_score_is_treated_as_malformed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [
                { "donorId": "a-neg", "compatibilityScore": 0.5 },
                { "donorId": "o-neg", "compatibilityScore": 1.7 }
            ]
        })))
        .mount(&mock_server)
        .await;

    let scorer = HttpDonorScorer::new(&mock_server.uri());
    let results = engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &state_only_pool(), Some(&scorer))
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source == RankingSource::Fallback));
}

#[tokio::test]
async fn unexpected_schema_is_treated_as_malformed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ranking": ["a-neg"] })))
        .mount(&mock_server)
        .await;

    let scorer = HttpDonorScorer::new(&mock_server.uri());
    let err = scorer
        .score(&ScoreRequest::new(&criteria(), &[]))
        .await
        .unwrap_err();
    assert!(matches!(err, ScorerError::Malformed(_)));

    let results = engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &state_only_pool(), Some(&scorer))
        .await;
    assert!(results.iter().all(|r| r.source == RankingSource::Fallback));
}

#[tokio::test]
async fn slow_scorer_is_abandoned_at_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "predictions": [{ "donorId": "a-neg", "compatibilityScore": 0.9 }] }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let timeout = Duration::from_millis(200);
    let scorer = HttpDonorScorer::new(&mock_server.uri());
    let started = Instant::now();
    let results = engine(timeout)
        .rank_donors(&criteria(), &state_only_pool(), Some(&scorer))
        .await;

    assert!(started.elapsed() < timeout + Duration::from_secs(1));
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.source == RankingSource::Fallback));
}

#[tokio::test]
async fn unreachable_scorer_falls_back() {
    let results = engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &state_only_pool(), Some(&FailingScorer))
        .await;

    assert_eq!(results[0].donor_id, "o-neg");
    assert_eq!(results[0].score, 1.0);
    assert!(results.iter().all(|r| r.source == RankingSource::Fallback));
}

#[tokio::test]
async fn external_results_respect_cap() {
    let mock_server = MockServer::start().await;
    let pool: Vec<DonorCandidate> = (0..15)
        .map(|i| donor(&format!("d-{}", i), BloodType::ONegative, "Pune", true, i))
        .collect();
    let predictions: Vec<serde_json::Value> = (0..15)
        .map(|i| json!({ "donorId": format!("d-{}", i), "compatibilityScore": f64::from(i) / 20.0 }))
        .collect();
    Mock::given(method("POST"))
        .and(path("/predict-donor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "predictions": predictions })))
        .mount(&mock_server)
        .await;

    let scorer = HttpDonorScorer::new(&mock_server.uri());
    let results = engine(Duration::from_secs(2))
        .rank_donors(&criteria(), &pool, Some(&scorer))
        .await;

    assert_eq!(results.len(), 10);
    assert_eq!(results[0].donor_id, "d-14");
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
}
