use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

use crate::error::ValidationError;

/// Raw claim data as submitted by the claimant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    pub policy_number: String,
    pub claimant_name: String,
    #[serde(deserialize_with = "deserialize_incident_date")]
    pub incident_date: DateTime<Utc>,
    pub incident_description: String,
}

impl ClaimData {
    /// Check the required-field constraints. Blank (whitespace-only) values count as empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.policy_number.trim().is_empty() {
            return Err(ValidationError::EmptyPolicyNumber);
        }
        if self.claimant_name.trim().is_empty() {
            return Err(ValidationError::EmptyClaimantName);
        }
        Ok(())
    }

    /// Render the claim as pretty JSON for embedding in a prompt
    pub fn to_prompt_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Accepts RFC 3339, a datetime without offset, or a bare date. Values without an offset are UTC.
fn deserialize_incident_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Ok(date.and_time(NaiveTime::default()).and_utc());
    }
    Err(de::Error::custom(format!(
        "invalid incidentDate '{raw}', expected an ISO 8601 date or datetime"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn claim(policy: &str, name: &str) -> ClaimData {
        ClaimData {
            policy_number: policy.to_string(),
            claimant_name: name.to_string(),
            incident_date: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
            incident_description: "Parked car was struck in a parking lot".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_complete_claim() {
        assert!(claim("POL123", "John Doe").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_policy_number() {
        assert_eq!(
            claim("", "John Doe").validate(),
            Err(ValidationError::EmptyPolicyNumber)
        );
        assert_eq!(
            claim("   ", "John Doe").validate(),
            Err(ValidationError::EmptyPolicyNumber)
        );
    }

    #[test]
    fn test_validate_rejects_empty_claimant_name() {
        assert_eq!(
            claim("POL123", "").validate(),
            Err(ValidationError::EmptyClaimantName)
        );
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let value = serde_json::to_value(claim("POL123", "John Doe")).unwrap();
        assert_eq!(value["policyNumber"], "POL123");
        assert_eq!(value["claimantName"], "John Doe");
        assert!(value.get("incidentDate").is_some());
        assert!(value.get("incidentDescription").is_some());
    }

    fn parse_date(date: &str) -> Result<DateTime<Utc>, serde_json::Error> {
        let body = serde_json::json!({
            "policyNumber": "POL123",
            "claimantName": "John Doe",
            "incidentDate": date,
            "incidentDescription": "Hail damage"
        });
        serde_json::from_value::<ClaimData>(body).map(|claim| claim.incident_date)
    }

    #[test]
    fn test_incident_date_accepts_date_only_and_naive_datetime() {
        assert_eq!(
            parse_date("2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-01-15T09:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date("2024-01-15T11:30:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_incident_date_rejects_garbage() {
        assert!(parse_date("last tuesday").is_err());
    }
}
