use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::get,
};
use claim_flow::{ClaimData, ClaimWorkflow, OpenRouterCompletion, RetryPolicy};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{StoredClaim, SubmitClaimResponse},
    notify::BroadcastNotifier,
    processor::{ClaimProcessor, SubmitError},
    store::{ClaimStore, InMemoryClaimStore, StoreError},
    store_postgres::PostgresClaimStore,
    ws::ws_handler,
};

type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;
type ApiError = (StatusCode, Json<Value>);

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

fn validation_error(message: &str) -> ApiError {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "error": message })),
    )
}

fn not_found_error(id: Uuid) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Claim not found",
            "claimId": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClaimStore>,
    pub processor: ClaimProcessor,
    pub notifier: BroadcastNotifier,
}

impl AppState {
    pub fn new(store: Arc<dyn ClaimStore>, workflow: ClaimWorkflow, timeout: Duration) -> Self {
        let notifier = BroadcastNotifier::default();
        let processor = ClaimProcessor::new(
            Arc::new(workflow),
            store.clone(),
            Arc::new(notifier.clone()),
            timeout,
        );
        Self {
            store,
            processor,
            notifier,
        }
    }
}

pub async fn create_app(config: &ServiceConfig) -> Router {
    build_router(create_app_state(config).await)
}

pub async fn create_app_state(config: &ServiceConfig) -> AppState {
    let store = create_claim_store(config.database_url.as_deref()).await;

    // Completion client shared by both workflow steps
    let client = OpenRouterCompletion::new(&config.openrouter_api_key, &config.completion_model)
        .with_retry(RetryPolicy::new(
            config.completion_max_attempts,
            RETRY_BACKOFF,
        ));
    info!(
        model = %client.model(),
        max_attempts = config.completion_max_attempts,
        reject_policy = ?config.reject_policy,
        "completion client ready"
    );

    let workflow = ClaimWorkflow::builder(Arc::new(client))
        .reject_policy(config.reject_policy)
        .build();

    AppState::new(store, workflow, config.workflow_timeout)
}

/// PostgreSQL when a database URL is configured and reachable, in-memory otherwise
async fn create_claim_store(database_url: Option<&str>) -> Arc<dyn ClaimStore> {
    let Some(database_url) = database_url else {
        info!("Using in-memory claim store (set DATABASE_URL to use PostgreSQL)");
        return Arc::new(InMemoryClaimStore::new());
    };

    // Use PostgreSQL if reachable, otherwise keep serving from memory
    info!("Using PostgreSQL claim store");
    match PostgresClaimStore::connect(database_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(
                error = %e,
                "Failed to connect to PostgreSQL, falling back to in-memory storage"
            );
            Arc::new(InMemoryClaimStore::new())
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/v1/claims", get(list_claims).post(submit_claim))
        .route("/api/v1/claims/{id}", get(get_claim))
        .route("/ws", get(ws_handler))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Tag every request with a correlation ID and run it inside a matching span
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    // Generate a correlation ID for this request
    let correlation_id = Uuid::new_v4().to_string();

    // Add correlation ID to request headers for downstream use
    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    // Run the rest of the stack inside a span carrying the correlation ID
    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Insurance Claims Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "AI-assisted claim triage and settlement recommendation",
        "endpoints": {
            "POST /api/v1/claims": "Submit a claim for processing",
            "GET /api/v1/claims": "List claims, newest first",
            "GET /api/v1/claims/{id}": "Get a claim and its recommendation",
            "GET /ws": "Live claim events",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn submit_claim(
    State(state): State<AppState>,
    body: Result<Json<ClaimData>, JsonRejection>,
) -> ApiResult<SubmitClaimResponse> {
    let Json(claim) = body.map_err(|rejection| {
        info!(error = %rejection.body_text(), "Rejected malformed claim submission");
        validation_error(&rejection.body_text())
    })?;

    info!(policy_number = %claim.policy_number, "Received claim submission");

    match state.processor.submit(claim).await {
        Ok(stored) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitClaimResponse {
                message: "Claim received and is being processed".to_string(),
                claim_id: stored.id,
                claim_number: stored.claim_number,
            }),
        )),
        Err(SubmitError::Validation(e)) => Err(validation_error(&e.to_string())),
        Err(SubmitError::Store(e)) => {
            error!(error = %e, "Failed to store claim");
            Err(internal_error("Failed to store claim", &e.to_string()))
        }
    }
}

async fn list_claims(State(state): State<AppState>) -> ApiResult<Vec<StoredClaim>> {
    let claims = state.store.list_claims().await.map_err(|e| {
        error!(error = %e, "Failed to list claims");
        internal_error("Failed to list claims", &e.to_string())
    })?;
    Ok((StatusCode::OK, Json(claims)))
}

async fn get_claim(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<StoredClaim> {
    match state.store.get_claim(id).await {
        Ok(Some(claim)) => Ok((StatusCode::OK, Json(claim))),
        Ok(None) | Err(StoreError::NotFound(_)) => Err(not_found_error(id)),
        Err(e) => {
            error!(claim_id = %id, error = %e, "Failed to load claim");
            Err(internal_error("Failed to load claim", &e.to_string()))
        }
    }
}
