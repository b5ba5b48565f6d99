use std::sync::Arc;
use tracing::{error, info};

use crate::{
    claim::ClaimData,
    completion::{StructuredCompletion, complete_as},
    error::{Stage, StepError},
    state::TriageResult,
};

const TRIAGE_PROMPT: &str = r#"You are an AI claims triage specialist for auto insurance.
Your task is to analyze the claim data and decide whether it can PROCEED to automated settlement or must be REJECTED for manual review.

Decision Criteria:
- A claim describing a minor collision (fender-bender) or a parked, stationary vehicle struck by another party is simple: PROCEED.
- If the claimant's vehicle was parked and struck, the claimant is not at fault.
- Assume the policy is active and covers property damage.
- Any claim description indicating injury or a major dispute is too complex: REJECT."#;

/// First workflow node: decides PROCEED vs REJECT
pub struct TriageStep {
    client: Arc<dyn StructuredCompletion>,
}

impl TriageStep {
    pub fn new(client: Arc<dyn StructuredCompletion>) -> Self {
        Self { client }
    }

    pub fn render_prompt(claim: &ClaimData) -> String {
        format!(
            "{TRIAGE_PROMPT}\n\nFormat Instructions:\n{}\n\nClaim Data:\n{}",
            TriageResult::SCHEMA.format_instructions(),
            claim.to_prompt_json(),
        )
    }

    pub async fn run(&self, claim: &ClaimData) -> Result<TriageResult, StepError> {
        info!(policy_number = %claim.policy_number, "running triage step");

        let prompt = Self::render_prompt(claim);
        let result: TriageResult = complete_as(self.client.as_ref(), &TriageResult::SCHEMA, &prompt)
            .await
            .map_err(|cause| {
                error!(error = %cause, "triage completion failed");
                StepError::new(Stage::Triage, cause)
            })?;

        info!(decision = ?result.decision, reason = %result.reason, "triage complete");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_prompt_embeds_claim_schema_and_policy() {
        let claim = ClaimData {
            policy_number: "POL-778".to_string(),
            claimant_name: "Ana Ruiz".to_string(),
            incident_date: Utc::now(),
            incident_description: "My parked car was hit while I was shopping".to_string(),
        };
        let prompt = TriageStep::render_prompt(&claim);

        assert!(prompt.contains("claims triage specialist"));
        assert!(prompt.contains("POL-778"));
        assert!(prompt.contains("My parked car was hit"));
        assert!(prompt.contains("\"PROCEED\""));
        assert!(prompt.contains("\"REJECT\""));
        assert!(prompt.contains("parked and struck, the claimant is not at fault"));
        assert!(prompt.contains("injury or a major dispute"));
    }
}
