use async_trait::async_trait;
use chrono::Utc;
use claim_flow::ClaimData;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ClaimUpdate, StoredClaim};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Claim not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt claim record: {0}")]
    Corrupt(String),
}

/// Trait for storing and retrieving claims
#[async_trait]
pub trait ClaimStore: Send + Sync {
    /// Persist a newly submitted claim with status `PENDING`
    async fn create_claim(&self, claim: &ClaimData) -> Result<StoredClaim, StoreError>;
    async fn update_claim(&self, id: Uuid, update: ClaimUpdate) -> Result<StoredClaim, StoreError>;
    async fn get_claim(&self, id: Uuid) -> Result<Option<StoredClaim>, StoreError>;
    /// All claims, newest first
    async fn list_claims(&self) -> Result<Vec<StoredClaim>, StoreError>;
}

/// In-memory implementation of ClaimStore
#[derive(Default)]
pub struct InMemoryClaimStore {
    claims: Arc<DashMap<Uuid, (u64, StoredClaim)>>,
    sequence: AtomicU64,
}

impl InMemoryClaimStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClaimStore for InMemoryClaimStore {
    async fn create_claim(&self, claim: &ClaimData) -> Result<StoredClaim, StoreError> {
        let stored = StoredClaim::new(claim);
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        self.claims.insert(stored.id, (seq, stored.clone()));
        Ok(stored)
    }

    async fn update_claim(&self, id: Uuid, update: ClaimUpdate) -> Result<StoredClaim, StoreError> {
        let mut entry = self.claims.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        let claim = &mut entry.value_mut().1;
        claim.status = update.status;
        claim.ai_recommendation = update.ai_recommendation;
        claim.ai_reasoning = update.ai_reasoning;
        claim.updated_at = Utc::now();
        Ok(claim.clone())
    }

    async fn get_claim(&self, id: Uuid) -> Result<Option<StoredClaim>, StoreError> {
        Ok(self.claims.get(&id).map(|entry| entry.value().1.clone()))
    }

    async fn list_claims(&self) -> Result<Vec<StoredClaim>, StoreError> {
        let mut claims: Vec<(u64, StoredClaim)> = self
            .claims
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        claims.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });
        Ok(claims.into_iter().map(|(_, claim)| claim).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ClaimStatus;
    use serde_json::json;

    fn claim(name: &str) -> ClaimData {
        ClaimData {
            policy_number: "POL123".to_string(),
            claimant_name: name.to_string(),
            incident_date: Utc::now(),
            incident_description: "Scratched bumper".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryClaimStore::new();
        let created = store.create_claim(&claim("John Doe")).await.unwrap();

        assert_eq!(created.status, ClaimStatus::Pending);
        let fetched = store.get_claim(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert!(store.get_claim(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_writes_recommendation() {
        let store = InMemoryClaimStore::new();
        let created = store.create_claim(&claim("John Doe")).await.unwrap();

        let updated = store
            .update_claim(
                created.id,
                ClaimUpdate {
                    status: ClaimStatus::AwaitingApproval,
                    ai_recommendation: Some(json!({"decision": "APPROVE", "payout": 900.0})),
                    ai_reasoning: Some("Parked car".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, ClaimStatus::AwaitingApproval);
        assert_eq!(updated.ai_reasoning.as_deref(), Some("Parked car"));
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(store.get_claim(created.id).await.unwrap().unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_unknown_claim_is_not_found() {
        let store = InMemoryClaimStore::new();
        let result = store
            .update_claim(Uuid::new_v4(), ClaimUpdate::status_only(ClaimStatus::Failed))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let store = InMemoryClaimStore::new();
        let first = store.create_claim(&claim("First")).await.unwrap();
        let second = store.create_claim(&claim("Second")).await.unwrap();
        let third = store.create_claim(&claim("Third")).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_claims()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }
}
