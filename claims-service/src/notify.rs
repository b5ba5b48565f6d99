//! Claim lifecycle events pushed to connected clients.

use claim_flow::{ClaimData, Stage};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::StoredClaim;

/// Status reported to clients while a workflow run is in flight
pub const IN_REVIEW: &str = "IN_REVIEW";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaimPayload {
    pub id: Uuid,
    pub claim_number: String,
    pub status: String,
    #[serde(flatten)]
    pub claim: ClaimData,
}

/// Sent when a run ends without a result. `stage` is `None` when the run timed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimFailure {
    pub id: Uuid,
    pub claim_number: String,
    pub stage: Option<Stage>,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClaimEvent {
    NewClaim(NewClaimPayload),
    ClaimUpdated(StoredClaim),
    ClaimFailed(ClaimFailure),
}

impl ClaimEvent {
    pub fn new_claim(stored: &StoredClaim) -> Self {
        ClaimEvent::NewClaim(NewClaimPayload {
            id: stored.id,
            claim_number: stored.claim_number.clone(),
            status: IN_REVIEW.to_string(),
            claim: stored.claim_data(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClaimEvent::NewClaim(_) => "new_claim",
            ClaimEvent::ClaimUpdated(_) => "claim_updated",
            ClaimEvent::ClaimFailed(_) => "claim_failed",
        }
    }

    pub fn claim_id(&self) -> Uuid {
        match self {
            ClaimEvent::NewClaim(payload) => payload.id,
            ClaimEvent::ClaimUpdated(claim) => claim.id,
            ClaimEvent::ClaimFailed(failure) => failure.id,
        }
    }
}

/// Outbound notification channel
pub trait ClaimNotifier: Send + Sync {
    fn notify(&self, event: ClaimEvent);
}

/// Fans events out to every subscriber over a tokio broadcast channel
#[derive(Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ClaimEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClaimEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl ClaimNotifier for BroadcastNotifier {
    fn notify(&self, event: ClaimEvent) {
        let name = event.name();
        let claim_id = event.claim_id();
        match self.sender.send(event) {
            Ok(receivers) => debug!(event = name, %claim_id, receivers, "emitted claim event"),
            Err(_) => debug!(event = name, %claim_id, "no subscribers for claim event"),
        }
    }
}
