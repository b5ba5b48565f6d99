use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    claim::ClaimData,
    error::{Stage, StepError},
    schema::{Field, Schema},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageDecision {
    Proceed,
    Reject,
}

/// Outcome of the triage step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageResult {
    pub decision: TriageDecision,
    pub reason: String,
}

impl TriageResult {
    pub const SCHEMA: Schema = Schema::new(
        "TriageResult",
        &[
            Field::enumeration(
                "decision",
                &["PROCEED", "REJECT"],
                "Decision if the claim is simple enough for automated handling. Either 'PROCEED' or 'REJECT'.",
            ),
            Field::string("reason", "Brief explanation for the decision."),
        ],
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendationDecision {
    Approve,
    Deny,
}

/// Final settlement recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub decision: RecommendationDecision,
    pub payout: f64,
    pub reason: String,
}

impl Recommendation {
    pub const SCHEMA: Schema = Schema::new(
        "Recommendation",
        &[
            Field::enumeration(
                "decision",
                &["APPROVE", "DENY"],
                "Final settlement decision. Either 'APPROVE' or 'DENY'.",
            ),
            Field::number(
                "payout",
                Some(0.0),
                "The recommended payout amount. Set to 0.0 if denied.",
            ),
            Field::string("reason", "Detailed reason for the recommendation."),
        ],
    );
}

/// Position of a run in the workflow state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Init,
    Triaging,
    Recommending,
    /// Triage rejected the claim and the reject policy stopped the run
    TriageRejected,
    TriageFailed,
    RecommendFailed,
    Done,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::TriageRejected
                | WorkflowStatus::TriageFailed
                | WorkflowStatus::RecommendFailed
                | WorkflowStatus::Done
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Init => "INIT",
            WorkflowStatus::Triaging => "TRIAGING",
            WorkflowStatus::Recommending => "RECOMMENDING",
            WorkflowStatus::TriageRejected => "TRIAGE_REJECTED",
            WorkflowStatus::TriageFailed => "TRIAGE_FAILED",
            WorkflowStatus::RecommendFailed => "RECOMMEND_FAILED",
            WorkflowStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State threaded through one workflow run.
///
/// Only the engine mutates it, and only through the transition methods below, so the
/// `recommendation` ⇒ `triage_result` invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub claim_data: ClaimData,
    pub triage_result: Option<TriageResult>,
    pub recommendation: Option<Recommendation>,
    pub error: Option<StepError>,
    pub status: WorkflowStatus,
    /// Every status the run has been in, oldest first
    pub transitions: Vec<WorkflowStatus>,
}

impl WorkflowState {
    pub fn new(claim_data: ClaimData) -> Self {
        Self {
            claim_data,
            triage_result: None,
            recommendation: None,
            error: None,
            status: WorkflowStatus::Init,
            transitions: vec![WorkflowStatus::Init],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Stage that failed, if the run ended in a failure state
    pub fn failed_stage(&self) -> Option<Stage> {
        self.error.as_ref().map(|e| e.stage)
    }

    pub(crate) fn transition(&mut self, next: WorkflowStatus) {
        tracing::debug!(from = %self.status, to = %next, "workflow transition");
        self.status = next;
        self.transitions.push(next);
    }

    pub(crate) fn record_triage(&mut self, result: TriageResult) {
        self.triage_result = Some(result);
    }

    pub(crate) fn record_recommendation(&mut self, recommendation: Recommendation) {
        debug_assert!(self.triage_result.is_some());
        self.recommendation = Some(recommendation);
    }

    pub(crate) fn fail(&mut self, error: StepError) {
        let next = match error.stage {
            Stage::Triage => WorkflowStatus::TriageFailed,
            Stage::Recommend => WorkflowStatus::RecommendFailed,
        };
        self.error = Some(error);
        self.transition(next);
    }
}
