use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// BLOOD TYPES
// ==============================================================================

/// ABO/Rh blood type. Serialized in its conventional notation ("AB-").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BloodType {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

impl BloodType {
    pub const ALL: [BloodType; 8] = [
        BloodType::APositive,
        BloodType::ANegative,
        BloodType::BPositive,
        BloodType::BNegative,
        BloodType::AbPositive,
        BloodType::AbNegative,
        BloodType::OPositive,
        BloodType::ONegative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodType::APositive => "A+",
            BloodType::ANegative => "A-",
            BloodType::BPositive => "B+",
            BloodType::BNegative => "B-",
            BloodType::AbPositive => "AB+",
            BloodType::AbNegative => "AB-",
            BloodType::OPositive => "O+",
            BloodType::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodType {
    type Err = MatchingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase();
        BloodType::ALL
            .into_iter()
            .find(|blood_type| blood_type.as_str() == normalized)
            .ok_or_else(|| MatchingError::Validation(format!("Unknown blood type '{}'", raw)))
    }
}

impl TryFrom<String> for BloodType {
    type Error = MatchingError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<BloodType> for String {
    fn from(blood_type: BloodType) -> Self {
        blood_type.as_str().to_string()
    }
}

// ==============================================================================
// REQUEST CRITERIA
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
}

impl Location {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    #[serde(alias = "medium")]
    Normal,
    High,
    Critical,
}

/// What a recipient needs: validated, ready for ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestCriteria {
    pub blood_type: BloodType,
    pub location: Location,
    pub urgency: Urgency,
    /// Eligibility is judged as of this date.
    pub as_of: NaiveDate,
}

/// Body of `POST /donors/match`.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchRequest {
    #[serde(alias = "bloodType")]
    pub blood_type: String,
    pub location: Location,
    #[serde(default)]
    pub urgency: Urgency,
}

impl MatchRequest {
    pub fn into_criteria(self, as_of: NaiveDate) -> Result<RequestCriteria, MatchingError> {
        let blood_type = self.blood_type.parse()?;

        if self.location.city.trim().is_empty() || self.location.state.trim().is_empty() {
            return Err(MatchingError::Validation(
                "Location requires both city and state".to_string(),
            ));
        }

        Ok(RequestCriteria {
            blood_type,
            location: self.location,
            urgency: self.urgency,
            as_of,
        })
    }
}

// ==============================================================================
// DONOR CANDIDATES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonorCandidate {
    #[serde(alias = "id")]
    pub donor_id: String,
    pub blood_type: BloodType,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub last_donation_date: Option<NaiveDate>,
    #[serde(default)]
    pub next_eligible_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_donations: u32,
    #[serde(default)]
    pub available_for_emergency: bool,
}

impl DonorCandidate {
    /// Stored next-eligible date, or last donation plus the donation interval.
    /// `None` when the date cannot be represented.
    pub fn next_eligible(&self, interval_days: i64) -> Option<NaiveDate> {
        self.next_eligible_date.or_else(|| {
            self.last_donation_date.and_then(|last| {
                Duration::try_days(interval_days).and_then(|interval| last.checked_add_signed(interval))
            })
        })
    }

    /// Donors who never gave blood are always eligible, whatever next-eligible
    /// date the profile carries.
    pub fn is_eligible_on(&self, as_of: NaiveDate, interval_days: i64) -> bool {
        if self.last_donation_date.is_none() {
            return true;
        }
        self.next_eligible(interval_days).is_some_and(|date| date <= as_of)
    }
}

// ==============================================================================
// RANKING OUTPUT
// ==============================================================================

/// Per-signal breakdown, each value normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingFactors {
    #[serde(alias = "bloodTypeMatch")]
    pub blood_type_match: f64,
    #[serde(alias = "locationProximity")]
    pub location_proximity: f64,
    pub availability: f64,
    #[serde(alias = "donationHistory")]
    pub donation_history: f64,
}

impl RankingFactors {
    pub fn is_normalized(&self) -> bool {
        [
            self.blood_type_match,
            self.location_proximity,
            self.availability,
            self.donation_history,
        ]
        .iter()
        .all(|value| is_unit_score(*value))
    }
}

pub fn is_unit_score(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingSource {
    External,
    Fallback,
}

impl fmt::Display for RankingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingSource::External => write!(f, "external"),
            RankingSource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingResult {
    pub donor_id: String,
    pub score: f64,
    pub factors: RankingFactors,
    pub source: RankingSource,
    pub donor: DonorCandidate,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub predictions: Vec<RankingResult>,
    pub source: RankingSource,
    pub total: usize,
    pub message: String,
}

impl MatchResponse {
    pub fn new(predictions: Vec<RankingResult>) -> Self {
        // An empty ranking never reached the scorer, so it is a local answer.
        let source = predictions
            .first()
            .map(|result| result.source)
            .unwrap_or(RankingSource::Fallback);
        let message = match (source, predictions.is_empty()) {
            (_, true) => "No donors found matching the criteria",
            (RankingSource::External, false) => "Donors ranked by the external scoring service",
            (RankingSource::Fallback, false) => "Donors ranked by availability and donation history",
        };

        Self {
            total: predictions.len(),
            predictions,
            source,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CompatibilityQuery {
    pub donor: Option<String>,
    pub recipient: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompatibilityResponse {
    pub donor: Option<BloodType>,
    pub recipient: Option<BloodType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compatible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donor_can_give_to: Option<Vec<BloodType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient_can_receive_from: Option<Vec<BloodType>>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Failures of the external scorer. Always recovered by the fallback ranking.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScorerError {
    #[error("scorer did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("scorer unreachable: {0}")]
    Transport(String),

    #[error("scorer returned status {0}")]
    Status(u16),

    #[error("malformed scorer response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum MatchingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No donors available: {0}")]
    PoolUnavailable(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<StoreError> for MatchingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(detail) => MatchingError::PoolUnavailable(detail),
            other => MatchingError::Persistence(other.to_string()),
        }
    }
}

impl From<MatchingError> for AppError {
    fn from(err: MatchingError) -> Self {
        match err {
            MatchingError::Validation(msg) => AppError::ValidationError(msg),
            MatchingError::PoolUnavailable(_) => AppError::NotFound(err.to_string()),
            MatchingError::Persistence(msg) => AppError::Database(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn blood_types_parse_case_insensitively() {
        assert_eq!(" ab- ".parse::<BloodType>().unwrap(), BloodType::AbNegative);
        assert_eq!("o+".parse::<BloodType>().unwrap(), BloodType::OPositive);
        assert_matches!("C+".parse::<BloodType>(), Err(MatchingError::Validation(_)));
        assert_matches!("A".parse::<BloodType>(), Err(MatchingError::Validation(_)));
    }

    #[test]
    fn blood_types_serialize_in_notation() {
        assert_eq!(serde_json::to_value(BloodType::AbPositive).unwrap(), "AB+");
        let parsed: BloodType = serde_json::from_value(serde_json::json!("b-")).unwrap();
        assert_eq!(parsed, BloodType::BNegative);
        assert!(serde_json::from_value::<BloodType>(serde_json::json!("Z")).is_err());
    }

    #[test]
    fn urgency_defaults_to_normal() {
        let request: MatchRequest = serde_json::from_value(serde_json::json!({
            "bloodType": "A-",
            "location": { "city": "Pune", "state": "MH" }
        }))
        .unwrap();
        assert_eq!(request.urgency, Urgency::Normal);

        let medium: Urgency = serde_json::from_value(serde_json::json!("medium")).unwrap();
        assert_eq!(medium, Urgency::Normal);
    }

    #[test]
    fn criteria_require_city_and_state() {
        let request = MatchRequest {
            blood_type: "A-".to_string(),
            location: Location::new("  ", "MH"),
            urgency: Urgency::High,
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert_matches!(request.into_criteria(today), Err(MatchingError::Validation(_)));
    }

    #[test]
    fn eligibility_uses_interval_when_next_date_missing() {
        let mut donor = DonorCandidate {
            donor_id: "d-1".to_string(),
            blood_type: BloodType::ONegative,
            city: "Pune".to_string(),
            state: "MH".to_string(),
            last_donation_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            next_eligible_date: None,
            total_donations: 3,
            available_for_emergency: true,
        };

        assert_eq!(donor.next_eligible(56), NaiveDate::from_ymd_opt(2024, 2, 26));
        assert!(!donor.is_eligible_on(NaiveDate::from_ymd_opt(2024, 2, 25).unwrap(), 56));
        assert!(donor.is_eligible_on(NaiveDate::from_ymd_opt(2024, 2, 26).unwrap(), 56));

        donor.last_donation_date = None;
        assert!(donor.is_eligible_on(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), 56));
    }

    #[test]
    fn never_donated_donor_ignores_future_next_eligible_date() {
        let donor = DonorCandidate {
            donor_id: "d-2".to_string(),
            blood_type: BloodType::APositive,
            city: "Pune".to_string(),
            state: "MH".to_string(),
            last_donation_date: None,
            next_eligible_date: NaiveDate::from_ymd_opt(2024, 6, 1),
            total_donations: 0,
            available_for_emergency: false,
        };
        assert!(donor.is_eligible_on(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), 56));
    }

    #[test]
    fn unrepresentable_interval_does_not_panic() {
        let donor = DonorCandidate {
            donor_id: "d-3".to_string(),
            blood_type: BloodType::APositive,
            city: "Pune".to_string(),
            state: "MH".to_string(),
            last_donation_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            next_eligible_date: None,
            total_donations: 1,
            available_for_emergency: false,
        };
        assert_eq!(donor.next_eligible(i64::MAX), None);
        assert!(!donor.is_eligible_on(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), i64::MAX));
    }

    #[test]
    fn factors_outside_unit_interval_are_rejected() {
        let factors = RankingFactors {
            blood_type_match: 1.0,
            location_proximity: 0.7,
            availability: 1.2,
            donation_history: 0.1,
        };
        assert!(!factors.is_normalized());
        assert!(!is_unit_score(f64::NAN));
    }
}
