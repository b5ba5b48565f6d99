use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    claim::ClaimData,
    completion::{StructuredCompletion, complete_as},
    error::{Stage, StepError},
    estimator::DamageEstimator,
    state::{Recommendation, RecommendationDecision, TriageResult},
};

const RECOMMEND_PROMPT: &str = r#"You are an AI claims adjuster. Your task is to generate a final settlement recommendation.

Instructions:
- If the triage decision was 'PROCEED', you should 'APPROVE' the claim.
- The payout should be based on the estimated damage cost.
- If you 'DENY' the claim, the payout must be 0.0.
- The payout must never be negative.
- Provide a clear reason referencing the incident type."#;

/// Second workflow node: settlement decision and payout
pub struct RecommendStep {
    client: Arc<dyn StructuredCompletion>,
    estimator: Arc<dyn DamageEstimator>,
}

impl RecommendStep {
    pub fn new(client: Arc<dyn StructuredCompletion>, estimator: Arc<dyn DamageEstimator>) -> Self {
        Self { client, estimator }
    }

    pub fn render_prompt(claim: &ClaimData, triage: &TriageResult, estimated_damage: f64) -> String {
        let triage_json = serde_json::to_string_pretty(triage)
            .unwrap_or_else(|_| format!("{:?}", triage));
        format!(
            "{RECOMMEND_PROMPT}\n\nFormat Instructions:\n{}\n\nContext:\n- Claim Data: {}\n- Triage Decision: {}\n- Estimated Damage Cost: ${:.2}",
            Recommendation::SCHEMA.format_instructions(),
            claim.to_prompt_json(),
            triage_json,
            estimated_damage,
        )
    }

    pub async fn run(
        &self,
        claim: &ClaimData,
        triage: &TriageResult,
    ) -> Result<Recommendation, StepError> {
        let estimated_damage = self.estimator.estimate_damage(claim).await;
        info!(
            triage_decision = ?triage.decision,
            estimated_damage = %format!("{:.2}", estimated_damage),
            "running recommendation step"
        );

        let prompt = Self::render_prompt(claim, triage, estimated_damage);
        let recommendation: Recommendation =
            complete_as(self.client.as_ref(), &Recommendation::SCHEMA, &prompt)
                .await
                .map_err(|cause| {
                    error!(error = %cause, "recommendation completion failed");
                    StepError::new(Stage::Recommend, cause)
                })?;

        let recommendation = normalize(recommendation);
        info!(
            decision = ?recommendation.decision,
            payout = recommendation.payout,
            "recommendation complete"
        );
        Ok(recommendation)
    }
}

/// A denial never pays out. An approval without a payout is kept but flagged.
fn normalize(mut recommendation: Recommendation) -> Recommendation {
    if recommendation.decision == RecommendationDecision::Deny && recommendation.payout != 0.0 {
        warn!(
            payout = recommendation.payout,
            "model returned a payout for a denied claim, forcing it to 0.0"
        );
        recommendation.payout = 0.0;
    }
    if is_unpaid_approval(&recommendation) {
        warn!(reason = %recommendation.reason, "model approved the claim with a zero payout");
    }
    recommendation
}

fn is_unpaid_approval(recommendation: &Recommendation) -> bool {
    recommendation.decision == RecommendationDecision::Approve && recommendation.payout == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TriageDecision;
    use chrono::Utc;

    #[test]
    fn test_prompt_embeds_triage_and_estimate() {
        let claim = ClaimData {
            policy_number: "POL-9".to_string(),
            claimant_name: "Sam Lee".to_string(),
            incident_date: Utc::now(),
            incident_description: "Side mirror clipped in traffic".to_string(),
        };
        let triage = TriageResult {
            decision: TriageDecision::Proceed,
            reason: "Minor collision".to_string(),
        };
        let prompt = RecommendStep::render_prompt(&claim, &triage, 1234.567);

        assert!(prompt.contains("claims adjuster"));
        assert!(prompt.contains("Side mirror clipped"));
        assert!(prompt.contains("\"PROCEED\""));
        assert!(prompt.contains("Minor collision"));
        assert!(prompt.contains("$1234.57"));
        assert!(prompt.contains("\"APPROVE\""));
    }

    #[test]
    fn test_normalize_zeroes_denied_payout() {
        let denied = normalize(Recommendation {
            decision: RecommendationDecision::Deny,
            payout: 500.0,
            reason: "Not covered".to_string(),
        });
        assert_eq!(denied.payout, 0.0);

        let approved = normalize(Recommendation {
            decision: RecommendationDecision::Approve,
            payout: 500.0,
            reason: "Covered".to_string(),
        });
        assert_eq!(approved.payout, 500.0);
        assert!(!is_unpaid_approval(&approved));
        assert!(!is_unpaid_approval(&denied));
    }

    #[test]
    fn test_zero_payout_approval_is_kept_and_flagged() {
        let unpaid = normalize(Recommendation {
            decision: RecommendationDecision::Approve,
            payout: 0.0,
            reason: "Covered".to_string(),
        });
        assert_eq!(unpaid.decision, RecommendationDecision::Approve);
        assert_eq!(unpaid.payout, 0.0);
        assert!(is_unpaid_approval(&unpaid));
    }
}
