use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use shared_config::{is_valid_donation_interval, is_valid_score_step, AppConfig};

use crate::models::{
    is_unit_score, DonorCandidate, RankingFactors, RankingResult, RankingSource, RequestCriteria, ScorerError,
};
use crate::services::compatibility::is_compatible;
use crate::services::scorer::{DonorScorer, ScoreRequest, ScoreResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct RankingSettings {
    pub result_cap: usize,
    pub score_step: f64,
    pub scorer_timeout: Duration,
    pub donation_interval_days: i64,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            result_cap: 10,
            score_step: 0.05,
            scorer_timeout: Duration::from_secs(5),
            donation_interval_days: 56,
        }
    }
}

impl RankingSettings {
    /// Replaces a score step or donation interval that could push scores out
    /// of [0, 1] or overflow date arithmetic with its default.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !is_valid_score_step(self.score_step) {
            warn!("Invalid fallback score step {}, using {}", self.score_step, defaults.score_step);
            self.score_step = defaults.score_step;
        }
        if !is_valid_donation_interval(self.donation_interval_days) {
            warn!(
                "Invalid donation interval {} days, using {}",
                self.donation_interval_days, defaults.donation_interval_days
            );
            self.donation_interval_days = defaults.donation_interval_days;
        }
        self
    }
}

impl From<&AppConfig> for RankingSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            result_cap: config.ranking_result_cap,
            score_step: config.fallback_score_step,
            scorer_timeout: config.ranking_timeout(),
            donation_interval_days: config.donation_interval_days,
        }
    }
}

fn same_place(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Compatible donors near the recipient: same city first, then anywhere in
/// the same state. Empty when neither tier has anyone.
pub fn select_candidates<'a>(criteria: &RequestCriteria, pool: &'a [DonorCandidate]) -> Vec<&'a DonorCandidate> {
    let compatible: Vec<&DonorCandidate> = pool
        .iter()
        .filter(|donor| is_compatible(donor.blood_type, criteria.blood_type))
        .collect();

    let in_state: Vec<&DonorCandidate> = compatible
        .into_iter()
        .filter(|donor| same_place(&donor.state, &criteria.location.state))
        .collect();

    let in_city: Vec<&DonorCandidate> = in_state
        .iter()
        .copied()
        .filter(|donor| same_place(&donor.city, &criteria.location.city))
        .collect();

    if !in_city.is_empty() {
        return in_city;
    }

    debug!(
        "No compatible donors in {}, broadening search to {}",
        criteria.location.city, criteria.location.state
    );
    in_state
}

/// Normalized signals for one donor, as used by the fallback ranking.
pub fn local_factors(criteria: &RequestCriteria, donor: &DonorCandidate) -> RankingFactors {
    RankingFactors {
        blood_type_match: 1.0,
        location_proximity: if same_place(&donor.city, &criteria.location.city) { 1.0 } else { 0.7 },
        availability: if donor.available_for_emergency { 1.0 } else { 0.5 },
        donation_history: (f64::from(donor.total_donations) / 10.0).min(1.0),
    }
}

pub struct DonorRankingEngine {
    settings: RankingSettings,
}

impl DonorRankingEngine {
    pub fn new(settings: RankingSettings) -> Self {
        Self {
            settings: settings.sanitized(),
        }
    }

    /// Rank compatible donors for `criteria`.
    ///
    /// Uses `scorer` when given; a timeout, transport error, non-success
    /// status or malformed answer switches to the local fallback for this
    /// call. The scorer is asked at most once. Never fails.
    pub async fn rank_donors(
        &self,
        criteria: &RequestCriteria,
        pool: &[DonorCandidate],
        scorer: Option<&dyn DonorScorer>,
    ) -> Vec<RankingResult> {
        let candidates = select_candidates(criteria, pool);
        if candidates.is_empty() {
            info!("No compatible donors for {} in {}", criteria.blood_type, criteria.location.state);
            return Vec::new();
        }

        if let Some(scorer) = scorer {
            match self.rank_externally(criteria, &candidates, scorer).await {
                Ok(results) => {
                    debug!("External scorer ranked {} donors", results.len());
                    return results;
                }
                Err(e) => {
                    warn!(
                        "External scorer failed for {} request, using fallback ranking: {}",
                        criteria.blood_type, e
                    );
                }
            }
        }

        self.rank_locally(criteria, &candidates)
    }

    async fn rank_externally(
        &self,
        criteria: &RequestCriteria,
        candidates: &[&DonorCandidate],
        scorer: &dyn DonorScorer,
    ) -> Result<Vec<RankingResult>, ScorerError> {
        let request = ScoreRequest::new(criteria, candidates);
        let response = tokio::time::timeout(self.settings.scorer_timeout, scorer.score(&request))
            .await
            .map_err(|_| ScorerError::Timeout(self.settings.scorer_timeout))??;

        self.merge_predictions(criteria, candidates, response)
    }

    /// Joins scores back onto the candidate records. Unknown ids are dropped;
    /// a single out-of-range value rejects the whole answer.
    fn merge_predictions(
        &self,
        criteria: &RequestCriteria,
        candidates: &[&DonorCandidate],
        response: ScoreResponse,
    ) -> Result<Vec<RankingResult>, ScorerError> {
        let mut seen = HashSet::new();
        let mut results = Vec::with_capacity(response.predictions.len());

        for prediction in response.predictions {
            if !is_unit_score(prediction.compatibility_score) {
                return Err(ScorerError::Malformed(format!(
                    "score {} for donor {} is outside [0, 1]",
                    prediction.compatibility_score, prediction.donor_id
                )));
            }
            if prediction.factors.is_some_and(|factors| !factors.is_normalized()) {
                return Err(ScorerError::Malformed(format!(
                    "factors for donor {} are outside [0, 1]",
                    prediction.donor_id
                )));
            }

            let Some(donor) = candidates.iter().find(|donor| donor.donor_id == prediction.donor_id) else {
                debug!("Ignoring score for unknown donor {}", prediction.donor_id);
                continue;
            };
            if !seen.insert(prediction.donor_id.clone()) {
                continue;
            }

            results.push(RankingResult {
                donor_id: prediction.donor_id,
                score: prediction.compatibility_score,
                factors: prediction.factors.unwrap_or_else(|| local_factors(criteria, donor)),
                source: RankingSource::External,
                donor: (*donor).clone(),
            });
        }

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(self.settings.result_cap);
        Ok(results)
    }

    /// Eligible donors ordered by emergency availability, then donation
    /// count, scored `1.0 - rank * step`.
    fn rank_locally(&self, criteria: &RequestCriteria, candidates: &[&DonorCandidate]) -> Vec<RankingResult> {
        let mut eligible: Vec<&DonorCandidate> = candidates
            .iter()
            .copied()
            .filter(|donor| donor.is_eligible_on(criteria.as_of, self.settings.donation_interval_days))
            .collect();

        eligible.sort_by(|a, b| {
            b.available_for_emergency
                .cmp(&a.available_for_emergency)
                .then_with(|| b.total_donations.cmp(&a.total_donations))
        });

        eligible
            .into_iter()
            .take(self.settings.result_cap)
            .enumerate()
            .map(|(rank, donor)| RankingResult {
                donor_id: donor.donor_id.clone(),
                score: (1.0 - rank as f64 * self.settings.score_step).clamp(0.0, 1.0),
                factors: local_factors(criteria, donor),
                source: RankingSource::Fallback,
                donor: donor.clone(),
            })
            .collect()
    }
}
