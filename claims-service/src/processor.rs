use claim_flow::{ClaimData, ClaimWorkflow, Stage, ValidationError, WorkflowState, WorkflowStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    models::{ClaimStatus, ClaimUpdate, StoredClaim},
    notify::{ClaimEvent, ClaimFailure, ClaimNotifier},
    store::{ClaimStore, StoreError},
};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid claim: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Accepts claims, persists them and runs the workflow for each one in the background
#[derive(Clone)]
pub struct ClaimProcessor {
    workflow: Arc<ClaimWorkflow>,
    store: Arc<dyn ClaimStore>,
    notifier: Arc<dyn ClaimNotifier>,
    timeout: Duration,
}

impl ClaimProcessor {
    pub fn new(
        workflow: Arc<ClaimWorkflow>,
        store: Arc<dyn ClaimStore>,
        notifier: Arc<dyn ClaimNotifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            workflow,
            store,
            notifier,
            timeout,
        }
    }

    /// Validate and store the claim, announce it, and schedule its workflow run.
    ///
    /// Returns as soon as the claim is stored; the outcome arrives later as a notification.
    pub async fn submit(&self, claim: ClaimData) -> Result<StoredClaim, SubmitError> {
        claim.validate()?;

        let stored = self.store.create_claim(&claim).await?;
        info!(
            claim_id = %stored.id,
            claim_number = %stored.claim_number,
            "claim stored, scheduling workflow"
        );
        self.notifier.notify(ClaimEvent::new_claim(&stored));

        let processor = self.clone();
        let span = info_span!("claim_workflow", claim_id = %stored.id);
        let pending = stored.clone();
        tokio::spawn(
            async move {
                processor.process(&pending).await;
            }
            .instrument(span),
        );

        Ok(stored)
    }

    /// Run the workflow for a stored claim, persist the outcome and emit the final event
    pub async fn process(&self, claim: &StoredClaim) -> ClaimEvent {
        let run = self.workflow.run(claim.claim_data());
        let event = match tokio::time::timeout(self.timeout, run).await {
            Ok(state) => self.finish(claim, state).await,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "workflow timed out");
                let message = format!("workflow timed out after {}s", self.timeout.as_secs());
                self.fail(claim, None, message).await
            }
        };

        self.notifier.notify(event.clone());
        event
    }

    async fn finish(&self, claim: &StoredClaim, state: WorkflowState) -> ClaimEvent {
        match state.status {
            WorkflowStatus::Done => {
                let Some(recommendation) = state.recommendation else {
                    return self
                        .fail(claim, None, "workflow finished without a recommendation".into())
                        .await;
                };
                let payload = match serde_json::to_value(&recommendation) {
                    Ok(payload) => payload,
                    Err(e) => return self.fail(claim, None, e.to_string()).await,
                };
                let update = ClaimUpdate {
                    status: ClaimStatus::AwaitingApproval,
                    ai_recommendation: Some(payload),
                    ai_reasoning: Some(recommendation.reason),
                };
                self.store_outcome(claim, update).await
            }
            WorkflowStatus::TriageRejected => {
                let update = ClaimUpdate {
                    status: ClaimStatus::ManualReview,
                    ai_recommendation: None,
                    ai_reasoning: state.triage_result.map(|triage| triage.reason),
                };
                self.store_outcome(claim, update).await
            }
            WorkflowStatus::TriageFailed | WorkflowStatus::RecommendFailed => {
                let (stage, message) = match state.error {
                    Some(e) => (Some(e.stage), e.cause.message),
                    None => (None, format!("workflow ended in {}", state.status)),
                };
                self.fail(claim, stage, message).await
            }
            other => {
                self.fail(claim, None, format!("workflow stopped in non-terminal state {other}"))
                    .await
            }
        }
    }

    async fn store_outcome(&self, claim: &StoredClaim, update: ClaimUpdate) -> ClaimEvent {
        let status = update.status;
        match self.store.update_claim(claim.id, update).await {
            Ok(updated) => {
                info!(%status, "claim updated with workflow result");
                ClaimEvent::ClaimUpdated(updated)
            }
            Err(e) => {
                error!(error = %e, "failed to persist workflow result");
                self.fail(claim, None, format!("failed to persist workflow result: {e}"))
                    .await
            }
        }
    }

    async fn fail(&self, claim: &StoredClaim, stage: Option<Stage>, message: String) -> ClaimEvent {
        warn!(stage = ?stage, error = %message, "claim workflow failed");
        if let Err(e) = self
            .store
            .update_claim(claim.id, ClaimUpdate::status_only(ClaimStatus::Failed))
            .await
        {
            error!(error = %e, "failed to mark claim as failed");
        }

        ClaimEvent::ClaimFailed(ClaimFailure {
            id: claim.id,
            claim_number: claim.claim_number.clone(),
            stage,
            error: message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{notify::BroadcastNotifier, store::InMemoryClaimStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use claim_flow::{
        CompletionError, FixedDamageEstimator, Schema, StructuredCompletion,
        testing::{RuleBasedCompletion, ScriptedCompletion},
    };
    use serde_json::{Value, json};

    struct Harness {
        processor: ClaimProcessor,
        store: Arc<InMemoryClaimStore>,
        notifier: BroadcastNotifier,
    }

    fn harness(client: Arc<dyn StructuredCompletion>, timeout: Duration) -> Harness {
        let workflow = ClaimWorkflow::builder(client)
            .estimator(Arc::new(FixedDamageEstimator(2000.0)))
            .build();
        let store = Arc::new(InMemoryClaimStore::new());
        let notifier = BroadcastNotifier::new(16);
        let processor = ClaimProcessor::new(
            Arc::new(workflow),
            store.clone(),
            Arc::new(notifier.clone()),
            timeout,
        );
        Harness {
            processor,
            store,
            notifier,
        }
    }

    fn claim(description: &str) -> ClaimData {
        ClaimData {
            policy_number: "POL123".to_string(),
            claimant_name: "John Doe".to_string(),
            incident_date: Utc::now(),
            incident_description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_claim_before_storing() {
        let h = harness(Arc::new(ScriptedCompletion::new()), Duration::from_secs(5));
        let mut events = h.notifier.subscribe();

        let mut invalid = claim("Parked car hit");
        invalid.claimant_name = String::new();
        let result = h.processor.submit(invalid).await;

        assert!(matches!(
            result,
            Err(SubmitError::Validation(ValidationError::EmptyClaimantName))
        ));
        assert!(h.store.list_claims().await.unwrap().is_empty());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_submit_acknowledges_then_reports_update() {
        let h = harness(Arc::new(RuleBasedCompletion::new()), Duration::from_secs(5));
        let mut events = h.notifier.subscribe();

        let stored = h
            .processor
            .submit(claim("My parked car was struck by a delivery van."))
            .await
            .unwrap();
        assert_eq!(stored.status, ClaimStatus::Pending);

        let first = events.recv().await.unwrap();
        assert_eq!(first.name(), "new_claim");
        assert_eq!(first.claim_id(), stored.id);

        let second = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        let ClaimEvent::ClaimUpdated(updated) = second else {
            panic!("expected claim_updated, got {second:?}");
        };
        assert_eq!(updated.id, stored.id);
        assert_eq!(updated.status, ClaimStatus::AwaitingApproval);
        let recommendation = updated.ai_recommendation.as_ref().unwrap();
        assert_eq!(recommendation["decision"], "APPROVE");
        assert_eq!(recommendation["payout"], 2000.0);
        assert!(updated.ai_reasoning.is_some());

        let persisted = h.store.get_claim(stored.id).await.unwrap().unwrap();
        assert_eq!(persisted, updated);
    }

    #[tokio::test]
    async fn test_rejected_claim_goes_to_manual_review() {
        let h = harness(Arc::new(RuleBasedCompletion::new()), Duration::from_secs(5));
        let stored = h
            .store
            .create_claim(&claim("The driver was injured and disputes fault."))
            .await
            .unwrap();

        let event = h.processor.process(&stored).await;

        let ClaimEvent::ClaimUpdated(updated) = event else {
            panic!("expected claim_updated, got {event:?}");
        };
        assert_eq!(updated.status, ClaimStatus::ManualReview);
        assert!(updated.ai_recommendation.is_none());
        assert!(updated.ai_reasoning.is_some());
    }

    #[tokio::test]
    async fn test_step_failure_marks_claim_failed_and_notifies() {
        let client = ScriptedCompletion::new()
            .reply_json(json!({"decision": "PROCEED", "reason": "simple"}))
            .fail("quota exceeded");
        let h = harness(Arc::new(client), Duration::from_secs(5));
        let mut events = h.notifier.subscribe();
        let stored = h.store.create_claim(&claim("Parked car hit")).await.unwrap();

        let event = h.processor.process(&stored).await;

        let ClaimEvent::ClaimFailed(failure) = &event else {
            panic!("expected claim_failed, got {event:?}");
        };
        assert_eq!(failure.id, stored.id);
        assert_eq!(failure.stage, Some(Stage::Recommend));
        assert_eq!(failure.error, "quota exceeded");
        assert_eq!(events.recv().await.unwrap(), event);

        let persisted = h.store.get_claim(stored.id).await.unwrap().unwrap();
        assert_eq!(persisted.status, ClaimStatus::Failed);
        assert!(persisted.ai_recommendation.is_none());
        assert!(persisted.ai_reasoning.is_none());
    }

    struct StalledCompletion;

    #[async_trait]
    impl StructuredCompletion for StalledCompletion {
        async fn complete(&self, _: &Schema, _: &str) -> Result<Value, CompletionError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_timeout_marks_claim_failed_without_stage() {
        let h = harness(Arc::new(StalledCompletion), Duration::from_millis(50));
        let stored = h.store.create_claim(&claim("Parked car hit")).await.unwrap();

        let event = h.processor.process(&stored).await;

        let ClaimEvent::ClaimFailed(failure) = event else {
            panic!("expected claim_failed, got {event:?}");
        };
        assert_eq!(failure.stage, None);
        assert!(failure.error.contains("timed out"));
        assert_eq!(
            h.store.get_claim(stored.id).await.unwrap().unwrap().status,
            ClaimStatus::Failed
        );
    }
}
