use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    claim::ClaimData,
    completion::StructuredCompletion,
    estimator::{DamageEstimator, UniformDamageEstimator},
    state::{TriageDecision, WorkflowState, WorkflowStatus},
    steps::{RecommendStep, TriageStep},
};

/// What happens after triage rejects a claim
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectPolicy {
    /// End the run in `TRIAGE_REJECTED` without a recommendation
    #[default]
    Stop,
    /// Still ask for a recommendation so a human reviewer has one to work from
    Recommend,
}

impl FromStr for RejectPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(RejectPolicy::Stop),
            "recommend" => Ok(RejectPolicy::Recommend),
            other => Err(format!(
                "unknown reject policy '{other}', expected 'stop' or 'recommend'"
            )),
        }
    }
}

/// Runs a claim through triage and recommendation.
///
/// `INIT → TRIAGING → (TRIAGE_FAILED | TRIAGE_REJECTED | RECOMMENDING) → (RECOMMEND_FAILED | DONE)`
pub struct ClaimWorkflow {
    triage: TriageStep,
    recommend: RecommendStep,
    reject_policy: RejectPolicy,
}

impl ClaimWorkflow {
    /// Workflow with the uniform damage estimator and the default reject policy
    pub fn new(client: Arc<dyn StructuredCompletion>) -> Self {
        Self::builder(client).build()
    }

    pub fn builder(client: Arc<dyn StructuredCompletion>) -> ClaimWorkflowBuilder {
        ClaimWorkflowBuilder {
            client,
            estimator: Arc::new(UniformDamageEstimator::default()),
            reject_policy: RejectPolicy::default(),
        }
    }

    pub fn reject_policy(&self) -> RejectPolicy {
        self.reject_policy
    }

    /// Run the workflow to a terminal state. Step failures are recorded in the returned state.
    pub async fn run(&self, claim: ClaimData) -> WorkflowState {
        info!(policy_number = %claim.policy_number, "starting claim workflow");
        let mut state = WorkflowState::new(claim);

        state.transition(WorkflowStatus::Triaging);
        let triage = match self.triage.run(&state.claim_data).await {
            Ok(triage) => triage,
            Err(e) => {
                warn!(error = %e, "triage failed, stopping workflow");
                state.fail(e);
                return state;
            }
        };
        state.record_triage(triage.clone());

        // Rejected claims stop here unless the policy asks for a recommendation anyway
        if triage.decision == TriageDecision::Reject && self.reject_policy == RejectPolicy::Stop {
            info!(reason = %triage.reason, "claim rejected at triage");
            state.transition(WorkflowStatus::TriageRejected);
            return state;
        }

        state.transition(WorkflowStatus::Recommending);
        match self.recommend.run(&state.claim_data, &triage).await {
            Ok(recommendation) => {
                state.record_recommendation(recommendation);
                state.transition(WorkflowStatus::Done);
            }
            Err(e) => {
                warn!(error = %e, "recommendation failed, stopping workflow");
                state.fail(e);
            }
        }

        info!(status = %state.status, "claim workflow finished");
        state
    }
}

/// Builder for [`ClaimWorkflow`]
pub struct ClaimWorkflowBuilder {
    client: Arc<dyn StructuredCompletion>,
    estimator: Arc<dyn DamageEstimator>,
    reject_policy: RejectPolicy,
}

impl ClaimWorkflowBuilder {
    pub fn estimator(mut self, estimator: Arc<dyn DamageEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    pub fn build(self) -> ClaimWorkflow {
        ClaimWorkflow {
            triage: TriageStep::new(self.client.clone()),
            recommend: RecommendStep::new(self.client, self.estimator),
            reject_policy: self.reject_policy,
        }
    }
}
