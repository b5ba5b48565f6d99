use async_trait::async_trait;
use claim_flow::ClaimData;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{ClaimStatus, ClaimUpdate, StoredClaim},
    store::{ClaimStore, StoreError},
};

const CREATE_CLAIMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS claims (
    id UUID PRIMARY KEY,
    claim_number TEXT NOT NULL UNIQUE,
    status TEXT NOT NULL,
    policy_number TEXT NOT NULL,
    claimant_name TEXT NOT NULL,
    incident_date TIMESTAMPTZ NOT NULL,
    incident_description TEXT NOT NULL,
    ai_recommendation JSONB,
    ai_reasoning TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
)
"#;

const CLAIM_COLUMNS: &str = "id, claim_number, status, policy_number, claimant_name, \
     incident_date, incident_description, ai_recommendation, ai_reasoning, created_at, updated_at";

/// PostgreSQL-backed claim store
#[derive(Clone)]
pub struct PostgresClaimStore {
    pool: PgPool,
}

impl PostgresClaimStore {
    /// Connect and make sure the claims table exists
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        sqlx::query(CREATE_CLAIMS_TABLE).execute(&pool).await?;
        info!("claims table ready");

        Ok(Self { pool })
    }
}

fn claim_from_row(row: &PgRow) -> Result<StoredClaim, StoreError> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ClaimStatus>().map_err(StoreError::Corrupt)?;

    Ok(StoredClaim {
        id: row.try_get("id")?,
        claim_number: row.try_get("claim_number")?,
        status,
        policy_number: row.try_get("policy_number")?,
        claimant_name: row.try_get("claimant_name")?,
        incident_date: row.try_get("incident_date")?,
        incident_description: row.try_get("incident_description")?,
        ai_recommendation: row.try_get("ai_recommendation")?,
        ai_reasoning: row.try_get("ai_reasoning")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ClaimStore for PostgresClaimStore {
    async fn create_claim(&self, claim: &ClaimData) -> Result<StoredClaim, StoreError> {
        let new_claim = StoredClaim::new(claim);
        let query = format!(
            "INSERT INTO claims ({CLAIM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {CLAIM_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(new_claim.id)
            .bind(&new_claim.claim_number)
            .bind(new_claim.status.as_str())
            .bind(&new_claim.policy_number)
            .bind(&new_claim.claimant_name)
            .bind(new_claim.incident_date)
            .bind(&new_claim.incident_description)
            .bind(&new_claim.ai_recommendation)
            .bind(&new_claim.ai_reasoning)
            .bind(new_claim.created_at)
            .bind(new_claim.updated_at)
            .fetch_one(&self.pool)
            .await?;

        claim_from_row(&row)
    }

    async fn update_claim(&self, id: Uuid, update: ClaimUpdate) -> Result<StoredClaim, StoreError> {
        let query = format!(
            "UPDATE claims \
             SET status = $2, ai_recommendation = $3, ai_reasoning = $4, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {CLAIM_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(update.status.as_str())
            .bind(&update.ai_recommendation)
            .bind(&update.ai_reasoning)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))?;

        claim_from_row(&row)
    }

    async fn get_claim(&self, id: Uuid) -> Result<Option<StoredClaim>, StoreError> {
        let query = format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(claim_from_row).transpose()
    }

    async fn list_claims(&self) -> Result<Vec<StoredClaim>, StoreError> {
        let query = format!("SELECT {CLAIM_COLUMNS} FROM claims ORDER BY created_at DESC");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter().map(claim_from_row).collect()
    }
}
