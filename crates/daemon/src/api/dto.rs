//! Request and response bodies for the HTTP surface. These are the only
//! place the wire format is allowed to diverge from `claimd-core`'s types
//! (e.g. `type` arriving as a raw string that must still be validated).

use claimd_core::{Agent, ClaimResult, WorkUnit};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub agent_id: String,
    pub path: String,
    #[serde(rename = "type")]
    pub resource_kind: Option<String>,
    pub ttl_seconds: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReleaseRequest {
    pub agent_id: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaveQueueRequest {
    pub agent_id: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub session_id: String,
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    pub spawn_call_id: Option<String>,
    pub parent_agent_id: Option<String>,
}

fn default_agent_type() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ByPathQuery {
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct QueuePositionQuery {
    pub agent_id: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct QueuePositionResponse {
    pub queue_position: Option<usize>,
    pub in_queue: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailableQuery {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct AvailableResponse {
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub agents: Vec<Agent>,
    pub work_units: Vec<WorkUnit>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub agents_count: usize,
    pub work_units_count: usize,
}

pub type ClaimResponse = ClaimResult;
