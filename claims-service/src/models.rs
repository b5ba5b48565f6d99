use chrono::{DateTime, Utc};
use claim_flow::ClaimData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of a persisted claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimStatus {
    Pending,
    AwaitingApproval,
    ManualReview,
    Failed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "PENDING",
            ClaimStatus::AwaitingApproval => "AWAITING_APPROVAL",
            ClaimStatus::ManualReview => "MANUAL_REVIEW",
            ClaimStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ClaimStatus::Pending),
            "AWAITING_APPROVAL" => Ok(ClaimStatus::AwaitingApproval),
            "MANUAL_REVIEW" => Ok(ClaimStatus::ManualReview),
            "FAILED" => Ok(ClaimStatus::Failed),
            other => Err(format!("unknown claim status '{other}'")),
        }
    }
}

/// A claim as stored by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredClaim {
    pub id: Uuid,
    pub claim_number: String,
    pub status: ClaimStatus,
    pub policy_number: String,
    pub claimant_name: String,
    pub incident_date: DateTime<Utc>,
    pub incident_description: String,
    pub ai_recommendation: Option<Value>,
    pub ai_reasoning: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredClaim {
    /// Fresh `PENDING` record for a newly submitted claim
    pub fn new(claim: &ClaimData) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            claim_number: generate_claim_number(),
            status: ClaimStatus::Pending,
            policy_number: claim.policy_number.clone(),
            claimant_name: claim.claimant_name.clone(),
            incident_date: claim.incident_date,
            incident_description: claim.incident_description.clone(),
            ai_recommendation: None,
            ai_reasoning: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn claim_data(&self) -> ClaimData {
        ClaimData {
            policy_number: self.policy_number.clone(),
            claimant_name: self.claimant_name.clone(),
            incident_date: self.incident_date,
            incident_description: self.incident_description.clone(),
        }
    }
}

/// `CLM-` followed by eight upper-case hex digits
pub fn generate_claim_number() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("CLM-{}", hex[..8].to_uppercase())
}

/// Fields written back once a workflow run ends
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimUpdate {
    pub status: ClaimStatus,
    pub ai_recommendation: Option<Value>,
    pub ai_reasoning: Option<String>,
}

impl ClaimUpdate {
    pub fn status_only(status: ClaimStatus) -> Self {
        Self {
            status,
            ai_recommendation: None,
            ai_reasoning: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimResponse {
    pub message: String,
    pub claim_id: Uuid,
    pub claim_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_number_format() {
        let number = generate_claim_number();
        assert_eq!(number.len(), 12);
        assert!(number.starts_with("CLM-"));
        assert!(
            number[4..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            ClaimStatus::Pending,
            ClaimStatus::AwaitingApproval,
            ClaimStatus::ManualReview,
            ClaimStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ClaimStatus>(), Ok(status));
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert!("DONE".parse::<ClaimStatus>().is_err());
    }

    #[test]
    fn test_new_claim_is_pending_and_camel_cased() {
        let claim = ClaimData {
            policy_number: "POL123".to_string(),
            claimant_name: "John Doe".to_string(),
            incident_date: Utc::now(),
            incident_description: "Dented door".to_string(),
        };
        let stored = StoredClaim::new(&claim);
        assert_eq!(stored.status, ClaimStatus::Pending);
        assert_eq!(stored.claim_data(), claim);

        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value["claimNumber"], stored.claim_number.as_str());
        assert_eq!(value["status"], "PENDING");
        assert!(value["aiRecommendation"].is_null());
    }
}
