pub mod config;
pub mod models;
pub mod notify;
pub mod processor;
pub mod service;
pub mod store;
pub mod store_postgres;
pub mod ws;

pub use config::ServiceConfig;
pub use models::{ClaimStatus, StoredClaim, SubmitClaimResponse};
pub use notify::{BroadcastNotifier, ClaimEvent, ClaimNotifier};
pub use processor::{ClaimProcessor, SubmitError};
pub use service::{AppState, build_router, create_app, create_app_state};
pub use store::{ClaimStore, InMemoryClaimStore, StoreError};
pub use store_postgres::PostgresClaimStore;
