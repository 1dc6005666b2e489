use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{BloodType, DonorCandidate, Location, RankingFactors, RequestCriteria, ScorerError, Urgency};

// ==============================================================================
// WIRE FORMAT
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub blood_type: BloodType,
    pub location: Location,
    pub urgency: Urgency,
    pub donors: Vec<ScoreCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCandidate {
    pub donor_id: String,
    pub blood_type: BloodType,
    pub city: String,
    pub state: String,
    pub last_donation_date: Option<NaiveDate>,
    pub next_eligible_date: Option<NaiveDate>,
    pub total_donations: u32,
    pub available_for_emergency: bool,
}

impl ScoreRequest {
    pub fn new(criteria: &RequestCriteria, candidates: &[&DonorCandidate]) -> Self {
        Self {
            blood_type: criteria.blood_type,
            location: criteria.location.clone(),
            urgency: criteria.urgency,
            donors: candidates
                .iter()
                .map(|donor| ScoreCandidate {
                    donor_id: donor.donor_id.clone(),
                    blood_type: donor.blood_type,
                    city: donor.city.clone(),
                    state: donor.state.clone(),
                    last_donation_date: donor.last_donation_date,
                    next_eligible_date: donor.next_eligible_date,
                    total_donations: donor.total_donations,
                    available_for_emergency: donor.available_for_emergency,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreResponse {
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub donor_id: String,
    pub compatibility_score: f64,
    #[serde(default)]
    pub factors: Option<RankingFactors>,
}

// ==============================================================================
// SCORER PORT
// ==============================================================================

/// An external source of per-donor compatibility scores.
#[async_trait]
pub trait DonorScorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScorerError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "ranking_service", rename_all = "lowercase")]
pub enum ScorerHealth {
    Online { details: Value },
    Offline { message: String },
}

/// JSON-over-HTTP client for the ranking service (`POST /predict-donor`).
#[derive(Clone)]
pub struct HttpDonorScorer {
    client: Client,
    base_url: String,
}

impl HttpDonorScorer {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `None` when no ranking service is configured.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        config.ranking_service_url.as_deref().map(Self::new)
    }

    /// `GET /health`, bounded by `timeout`. Any failure reads as offline.
    pub async fn health(&self, timeout: Duration) -> ScorerHealth {
        let url = format!("{}/health", self.base_url);
        debug!("Probing ranking service at {}", url);

        let response = match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                return ScorerHealth::Offline {
                    message: format!("Ranking service answered {}", response.status()),
                }
            }
            Err(e) => {
                return ScorerHealth::Offline {
                    message: format!("Ranking service is not available: {}", e),
                }
            }
        };

        match response.json::<Value>().await {
            Ok(details) => ScorerHealth::Online { details },
            Err(_) => ScorerHealth::Online { details: Value::Null },
        }
    }
}

#[async_trait]
impl DonorScorer for HttpDonorScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreResponse, ScorerError> {
        let url = format!("{}/predict-donor", self.base_url);
        debug!("Requesting scores for {} donors from {}", request.donors.len(), url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ScorerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScorerError::Status(status.as_u16()));
        }

        response
            .json::<ScoreResponse>()
            .await
            .map_err(|e| ScorerError::Malformed(e.to_string()))
    }
}
