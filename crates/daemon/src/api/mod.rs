//! HTTP/JSON request surface over the `Registry` (SPEC_FULL.md §4.3, §6).

mod dto;
mod error;
mod handlers;

pub use error::ApiError;

use axum::routing::{delete, get, post};
use axum::Router;
use claimd_core::Registry;
use std::sync::Arc;

/// Shared application state. `Uninit` only exists so the error-mapping rule
/// for "registry invoked before initialization" (SPEC_FULL.md §4.3) has a
/// concrete, testable shape; production `main()` never constructs it.
#[derive(Clone)]
pub enum AppState {
    Ready(Arc<Registry>),
    Uninit,
}

impl AppState {
    fn registry(&self) -> Result<&Arc<Registry>, ApiError> {
        match self {
            AppState::Ready(registry) => Ok(registry),
            AppState::Uninit => Err(ApiError::Internal("registry not initialized".to_string())),
        }
    }
}

/// Build the full claimd router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/work-units/claim", post(handlers::claim))
        .route("/work-units/release", post(handlers::release))
        .route("/work-units/leave-queue", post(handlers::leave_queue))
        .route("/work-units", get(handlers::list_work_units))
        .route("/work-units/by-path", get(handlers::work_unit_by_path))
        .route("/work-units/by-agent/{agent_id}", get(handlers::work_units_by_agent))
        .route("/work-units/queue-position", get(handlers::queue_position))
        .route("/work-units/available", get(handlers::is_available))
        .route("/work-units/state", get(handlers::get_state))
        .route("/agents/register", post(handlers::register_agent))
        .route("/agents/{agent_id}/heartbeat", post(handlers::heartbeat))
        .route("/agents", get(handlers::list_agents))
        .route("/agents/{agent_id}", get(handlers::get_agent))
        .route("/agents/{agent_id}", delete(handlers::remove_agent))
        .route("/health", get(handlers::health))
        .with_state(state)
}
