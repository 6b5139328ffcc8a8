//! Handler bodies: parse input, call one `Registry` operation, map the
//! result to a response (SPEC_FULL.md §4.3).

use super::dto::{
    AvailableQuery, AvailableResponse, ByPathQuery, ClaimRequest, ClaimResponse, HealthResponse,
    LeaveQueueRequest, QueuePositionQuery, QueuePositionResponse, RegisterRequest, ReleaseRequest,
    StateResponse,
};
use super::{ApiError, AppState};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use claimd_core::{Agent, RegistryError, ResourceKind, WorkUnit};
use serde_json::json;

pub async fn claim(
    State(state): State<AppState>,
    Json(req): Json<ClaimRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let registry = state.registry()?;
    let resource_kind = match req.resource_kind {
        Some(raw) => Some(
            raw.parse::<ResourceKind>()
                .map_err(|_| RegistryError::InvalidResourceKind)?,
        ),
        None => None,
    };
    let result = registry.claim(&req.agent_id, &req.path, resource_kind, req.ttl_seconds)?;
    Ok(Json(result))
}

pub async fn release(
    State(state): State<AppState>,
    Json(req): Json<ReleaseRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let registry = state.registry()?;
    if registry.release(&req.agent_id, &req.path) {
        Ok(Json(json!({"success": true})))
    } else {
        Err(ApiError::release_precondition())
    }
}

pub async fn leave_queue(
    State(state): State<AppState>,
    Json(req): Json<LeaveQueueRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let registry = state.registry()?;
    if registry.leave_queue(&req.agent_id, &req.path) {
        Ok(Json(json!({"success": true})))
    } else {
        Err(ApiError::leave_queue_precondition())
    }
}

pub async fn list_work_units(State(state): State<AppState>) -> Result<Json<Vec<WorkUnit>>, ApiError> {
    let registry = state.registry()?;
    Ok(Json(registry.list_work_units()))
}

pub async fn work_unit_by_path(
    State(state): State<AppState>,
    Query(q): Query<ByPathQuery>,
) -> Result<Json<WorkUnit>, ApiError> {
    let registry = state.registry()?;
    registry
        .get_work_unit(&q.path)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no work unit at path {}", q.path)))
}

pub async fn work_units_by_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Vec<WorkUnit>>, ApiError> {
    let registry = state.registry()?;
    Ok(Json(registry.work_units_owned_by(&agent_id)))
}

pub async fn queue_position(
    State(state): State<AppState>,
    Query(q): Query<QueuePositionQuery>,
) -> Result<Json<QueuePositionResponse>, ApiError> {
    let registry = state.registry()?;
    let position = registry.queue_position_of(&q.agent_id, &q.path);
    Ok(Json(QueuePositionResponse {
        in_queue: position.is_some(),
        queue_position: position,
    }))
}

pub async fn is_available(
    State(state): State<AppState>,
    Query(q): Query<AvailableQuery>,
) -> Result<Json<AvailableResponse>, ApiError> {
    let registry = state.registry()?;
    Ok(Json(AvailableResponse {
        available: registry.is_available(&q.path),
    }))
}

pub async fn get_state(State(state): State<AppState>) -> Result<Json<StateResponse>, ApiError> {
    let registry = state.registry()?;
    let snapshot = registry.get_state();
    Ok(Json(StateResponse {
        agents: snapshot.agents,
        work_units: snapshot.work_units,
    }))
}

pub async fn register_agent(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<Agent>, ApiError> {
    let registry = state.registry()?;
    if req.agent_type == "sub" {
        let (spawn_call_id, parent_agent_id) = match (req.spawn_call_id, req.parent_agent_id) {
            (Some(spawn_call_id), Some(parent_agent_id)) => (spawn_call_id, parent_agent_id),
            _ => return Err(RegistryError::IncompleteSubAgent.into()),
        };
        Ok(Json(registry.register_sub_agent(
            &req.session_id,
            &spawn_call_id,
            &parent_agent_id,
        )))
    } else {
        Ok(Json(registry.register_main_agent(&req.session_id)))
    }
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let registry = state.registry()?;
    if registry.heartbeat(&agent_id) {
        Ok(Json(json!({"success": true})))
    } else {
        Err(ApiError::NotFound(format!("unknown agent {agent_id}")))
    }
}

pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Vec<Agent>>, ApiError> {
    let registry = state.registry()?;
    Ok(Json(registry.list_agents()))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let registry = state.registry()?;
    registry
        .get_agent(&agent_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown agent {agent_id}")))
}

pub async fn remove_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let registry = state.registry()?;
    if registry.remove_agent(&agent_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("unknown agent {agent_id}")))
    }
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let registry = state.registry()?;
    let snapshot = registry.get_state();
    Ok(Json(HealthResponse {
        status: "ok",
        agents_count: snapshot.agents.len(),
        work_units_count: snapshot.work_units.len(),
    }))
}
