//! The coordination registry: claim/release/queue/promote/TTL state machine.
//!
//! A single `std::sync::Mutex<RegistryState>` is the one source of truth.
//! Every public method locks it for the duration of the call and never
//! performs I/O or awaits while holding it — see SPEC_FULL.md §5. Sinks are
//! invoked synchronously, still under the lock, after the mutation and
//! before the method returns (SPEC_FULL.md §4.1).

use crate::agent::Agent;
use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;
use crate::events::{ChangeEvent, ChangeSink};
use crate::work_unit::{ClaimResult, QueueEntry, QueueEntryView, ResourceKind, WorkUnit, WorkUnitStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Full snapshot of registry state, as returned by `get_state`.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub agents: Vec<Agent>,
    pub work_units: Vec<WorkUnit>,
}

/// Internal (non-positioned) representation of a work unit. `status` is
/// derived, never stored, so it cannot drift from the ownership fields.
#[derive(Debug, Clone)]
struct WorkUnitRecord {
    id: String,
    path: String,
    resource_kind: ResourceKind,
    owner_agent_id: Option<String>,
    claimed_at: Option<DateTime<Utc>>,
    queue: Vec<QueueEntry>,
    ttl_seconds: u64,
    expires_at: Option<DateTime<Utc>>,
}

impl WorkUnitRecord {
    fn status(&self) -> WorkUnitStatus {
        if self.owner_agent_id.is_some() {
            WorkUnitStatus::Claimed
        } else {
            WorkUnitStatus::Available
        }
    }

    fn to_view(&self) -> WorkUnit {
        let queue = self
            .queue
            .iter()
            .enumerate()
            .map(|(i, e)| QueueEntryView {
                agent_id: e.agent_id.clone(),
                requested_at: e.requested_at,
                position: i + 1,
            })
            .collect();
        WorkUnit {
            id: self.id.clone(),
            path: self.path.clone(),
            resource_kind: self.resource_kind,
            owner_agent_id: self.owner_agent_id.clone(),
            claimed_at: self.claimed_at,
            queue,
            status: self.status(),
            ttl_seconds: self.ttl_seconds,
            expires_at: self.expires_at,
        }
    }

    fn queue_position_of(&self, agent_id: &str) -> Option<usize> {
        self.queue.iter().position(|e| e.agent_id == agent_id).map(|i| i + 1)
    }
}

/// Checks invariants that the single-lock discipline should make
/// unreachable to violate from correct code. `debug_assert!` compiles
/// this out entirely in release builds (SPEC_FULL.md §4.4).
fn debug_check_record_invariants(record: &WorkUnitRecord) {
    debug_assert_eq!(
        record.owner_agent_id.is_some(),
        record.claimed_at.is_some(),
        "owner_agent_id and claimed_at must be set or cleared together"
    );
    debug_assert_eq!(
        record.owner_agent_id.is_some(),
        record.expires_at.is_some(),
        "owner_agent_id and expires_at must be set or cleared together"
    );
    if let Some(owner) = &record.owner_agent_id {
        debug_assert!(
            !record.queue.iter().any(|e| &e.agent_id == owner),
            "the current owner must not also be queued"
        );
    }
    let mut seen = std::collections::HashSet::new();
    debug_assert!(
        record.queue.iter().all(|e| seen.insert(e.agent_id.as_str())),
        "a work unit's queue must not contain the same agent twice"
    );
}

#[derive(Default)]
struct RegistryState {
    agents: HashMap<String, Agent>,
    work_units: HashMap<String, WorkUnitRecord>,
}

/// The coordination registry.
pub struct Registry {
    clock: Box<dyn Clock>,
    state: Mutex<RegistryState>,
    sinks: Mutex<Vec<Box<dyn ChangeSink>>>,
    default_work_unit_ttl_secs: u64,
    default_agent_ttl_secs: u64,
}

impl Registry {
    /// Build a registry backed by the real system clock.
    pub fn new(default_work_unit_ttl_secs: u64, default_agent_ttl_secs: u64) -> Self {
        Self::with_clock(
            Box::new(SystemClock),
            default_work_unit_ttl_secs,
            default_agent_ttl_secs,
        )
    }

    /// Build a registry backed by a caller-supplied clock (tests use this
    /// with a `FakeClock` to make TTL expiry deterministic).
    pub fn with_clock(
        clock: Box<dyn Clock>,
        default_work_unit_ttl_secs: u64,
        default_agent_ttl_secs: u64,
    ) -> Self {
        Self {
            clock,
            state: Mutex::new(RegistryState::default()),
            sinks: Mutex::new(Vec::new()),
            default_work_unit_ttl_secs,
            default_agent_ttl_secs,
        }
    }

    /// Register a change-notification sink. Sinks fire in registration order.
    pub fn add_sink(&self, sink: Box<dyn ChangeSink>) {
        self.sinks.lock().unwrap().push(sink);
    }

    /// Invokes every registered sink with `name`/`payload`. Called while
    /// `state` is still locked (SPEC_FULL.md §4.1), so a panicking sink must
    /// not be allowed to unwind through here and poison `self.state` — a
    /// panic is caught and logged, never propagated (SPEC_FULL.md §4.4).
    fn emit(&self, name: &'static str, payload: impl Serialize) {
        let event = ChangeEvent::new(name, payload);
        let sinks = self.sinks.lock().unwrap();
        for sink in sinks.iter() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sink.on_event(&event)));
            if result.is_err() {
                tracing::warn!(event = event.name, "change-notification sink panicked; ignoring");
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Ensure an agent record exists for `agent_id`, implicitly creating one
    /// (per SPEC_FULL.md §4.1) if it does not. Either way, refresh
    /// `last_seen`.
    fn touch_or_create_agent(&self, state: &mut RegistryState, agent_id: &str, now: DateTime<Utc>) {
        match state.agents.get_mut(agent_id) {
            Some(agent) => agent.touch(now),
            None => {
                let agent = Agent::implicit(agent_id, now, self.default_agent_ttl_secs);
                state.agents.insert(agent_id.to_string(), agent);
            }
        }
    }

    // ---- claim / release / queue -----------------------------------------

    /// See SPEC_FULL.md §4.1 cases C1–C4.
    pub fn claim(
        &self,
        agent_id: &str,
        path: &str,
        resource_kind: Option<ResourceKind>,
        ttl_seconds: Option<i64>,
    ) -> Result<ClaimResult, RegistryError> {
        if path.is_empty() {
            return Err(RegistryError::EmptyPath);
        }
        if let Some(ttl) = ttl_seconds {
            if ttl < 0 {
                return Err(RegistryError::NegativeTtl);
            }
        }
        let resource_kind = resource_kind.unwrap_or_default();
        let ttl = ttl_seconds
            .map(|t| t as u64)
            .unwrap_or(self.default_work_unit_ttl_secs);
        let now = self.now();

        let mut state = self.state.lock().unwrap();
        self.touch_or_create_agent(&mut state, agent_id, now);

        if !state.work_units.contains_key(path) {
            // C1: no record for path.
            let record = WorkUnitRecord {
                id: Uuid::new_v4().to_string(),
                path: path.to_string(),
                resource_kind,
                owner_agent_id: Some(agent_id.to_string()),
                claimed_at: Some(now),
                queue: Vec::new(),
                ttl_seconds: ttl,
                expires_at: Some(now + Duration::seconds(ttl as i64)),
            };
            debug_check_record_invariants(&record);
            let view = record.to_view();
            state.work_units.insert(path.to_string(), record);
            self.emit("work_unit_claimed", &view);
            drop(state);
            return Ok(ClaimResult {
                success: true,
                work_unit: view,
                queue_position: None,
                owner_agent_id: None,
                message: "Work unit claimed".to_string(),
            });
        }

        let record = state.work_units.get_mut(path).expect("checked above");

        if record.owner_agent_id.as_deref() == Some(agent_id) {
            // C2: idempotent refresh.
            record.expires_at = Some(now + Duration::seconds(record.ttl_seconds as i64));
            debug_check_record_invariants(record);
            let view = record.to_view();
            return Ok(ClaimResult {
                success: true,
                work_unit: view,
                queue_position: None,
                owner_agent_id: None,
                message: "Ownership refreshed".to_string(),
            });
        }

        if let Some(position) = record.queue_position_of(agent_id) {
            // C3: already queued, no reorder.
            debug_check_record_invariants(record);
            let owner = record.owner_agent_id.clone();
            let view = record.to_view();
            return Ok(ClaimResult {
                success: false,
                work_unit: view,
                queue_position: Some(position),
                owner_agent_id: owner,
                message: "Work unit is owned by another agent".to_string(),
            });
        }

        // C4: owned by someone else, not yet queued.
        record.queue.push(QueueEntry {
            agent_id: agent_id.to_string(),
            requested_at: now,
        });
        let position = record.queue.len();
        debug_check_record_invariants(record);
        let owner = record.owner_agent_id.clone();
        let view = record.to_view();
        let path_owned = path.to_string();
        let agent_owned = agent_id.to_string();
        self.emit(
            "agent_queued",
            serde_json::json!({"path": path_owned, "agent_id": agent_owned, "position": position}),
        );
        drop(state);
        Ok(ClaimResult {
            success: false,
            work_unit: view,
            queue_position: Some(position),
            owner_agent_id: owner,
            message: "Work unit is owned by another agent".to_string(),
        })
    }

    /// See SPEC_FULL.md §4.1. Returns `false` if there's no record for
    /// `path`, or if `agent_id` does not own it.
    pub fn release(&self, agent_id: &str, path: &str) -> bool {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        let is_owner = state
            .work_units
            .get(path)
            .is_some_and(|r| r.owner_agent_id.as_deref() == Some(agent_id));
        if !is_owner {
            return false;
        }
        self.touch_or_create_agent(&mut state, agent_id, now);
        self.promote_or_clear(&mut state, path, now);
        true
    }

    /// Promote the queue head into ownership, or clear ownership if the
    /// queue is empty. Assumes the work unit at `path` exists and is owned.
    fn promote_or_clear(&self, state: &mut RegistryState, path: &str, now: DateTime<Utc>) {
        let record = state
            .work_units
            .get_mut(path)
            .expect("promote_or_clear called on an existing owned work unit");

        if record.queue.is_empty() {
            record.owner_agent_id = None;
            record.claimed_at = None;
            record.expires_at = None;
            debug_check_record_invariants(record);
            let path_owned = record.path.clone();
            self.emit("work_unit_released", serde_json::json!({"path": path_owned}));
            return;
        }

        let promoted = record.queue.remove(0);
        record.owner_agent_id = Some(promoted.agent_id.clone());
        record.claimed_at = Some(now);
        record.expires_at = Some(now + Duration::seconds(record.ttl_seconds as i64));
        debug_check_record_invariants(record);
        let path_owned = record.path.clone();

        // Decided in DESIGN.md: promotion counts as activity for the new
        // owner, so its last_seen is refreshed here too.
        if let Some(agent) = state.agents.get_mut(&promoted.agent_id) {
            agent.touch(now);
        } else {
            let agent = Agent::implicit(&promoted.agent_id, now, self.default_agent_ttl_secs);
            state.agents.insert(promoted.agent_id.clone(), agent);
        }

        self.emit(
            "work_unit_transferred",
            serde_json::json!({"path": path_owned, "new_owner": promoted.agent_id}),
        );
    }

    /// Remove `agent_id` from the queue for `path`. Returns `true` iff the
    /// queue changed. Does not affect ownership.
    pub fn leave_queue(&self, agent_id: &str, path: &str) -> bool {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        let Some(record) = state.work_units.get_mut(path) else {
            return false;
        };
        let before = record.queue.len();
        record.queue.retain(|e| e.agent_id != agent_id);
        let changed = record.queue.len() != before;
        if changed {
            if let Some(agent) = state.agents.get_mut(agent_id) {
                agent.touch(now);
            }
            self.emit(
                "agent_left_queue",
                serde_json::json!({"path": path, "agent_id": agent_id}),
            );
        }
        changed
    }

    // ---- agents -------------------------------------------------------

    /// Explicitly register a top-level agent. Upserts if already present.
    pub fn register_main_agent(&self, session_id: &str) -> Agent {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        let agent = match state.agents.get(session_id) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.registered_at = now;
                updated.last_seen = now;
                updated
            }
            None => Agent::new_main(session_id.to_string(), now, self.default_agent_ttl_secs),
        };
        state.agents.insert(session_id.to_string(), agent.clone());
        self.emit("agent_registered", &agent);
        drop(state);
        agent
    }

    /// Explicitly register a sub-agent. `spawn_call_id` and
    /// `parent_agent_id` are both required (SPEC_FULL.md §4.1.8).
    pub fn register_sub_agent(
        &self,
        session_id: &str,
        spawn_call_id: &str,
        parent_agent_id: &str,
    ) -> Agent {
        let now = self.now();
        let agent_id = format!("{session_id}:{spawn_call_id}");
        let mut state = self.state.lock().unwrap();
        let agent = match state.agents.get(&agent_id) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.registered_at = now;
                updated.last_seen = now;
                updated
            }
            None => Agent::new_sub(
                session_id.to_string(),
                spawn_call_id.to_string(),
                parent_agent_id.to_string(),
                now,
                self.default_agent_ttl_secs,
            ),
        };
        state.agents.insert(agent_id, agent.clone());
        self.emit("agent_registered", &agent);
        drop(state);
        agent
    }

    /// Refresh `last_seen` for a known agent. Returns whether it was known.
    pub fn heartbeat(&self, agent_id: &str) -> bool {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        match state.agents.get_mut(agent_id) {
            Some(agent) => {
                agent.touch(now);
                true
            }
            None => false,
        }
    }

    /// Release every work unit `agent_id` owns (with promotion), remove it
    /// from every queue, then delete its record. Returns whether the agent
    /// existed. A no-op (returns `false`) if the agent is unknown.
    pub fn remove_agent(&self, agent_id: &str) -> bool {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        if !state.agents.contains_key(agent_id) {
            return false;
        }

        let owned_paths: Vec<String> = state
            .work_units
            .iter()
            .filter(|(_, r)| r.owner_agent_id.as_deref() == Some(agent_id))
            .map(|(p, _)| p.clone())
            .collect();
        for path in owned_paths {
            self.promote_or_clear(&mut state, &path, now);
        }

        for record in state.work_units.values_mut() {
            let before = record.queue.len();
            record.queue.retain(|e| e.agent_id != agent_id);
            if record.queue.len() != before {
                // Leaving a queue via cascade is still an agent_left_queue
                // event from the queue's point of view.
                let path = record.path.clone();
                self.emit(
                    "agent_left_queue",
                    serde_json::json!({"path": path, "agent_id": agent_id}),
                );
            }
        }

        state.agents.remove(agent_id);
        debug_assert!(
            state.work_units.values().all(|r| {
                r.owner_agent_id.as_deref() != Some(agent_id)
                    && !r.queue.iter().any(|e| e.agent_id == agent_id)
            }),
            "a removed agent must not remain an owner or queue entry anywhere"
        );
        self.emit("agent_removed", serde_json::json!({"agent_id": agent_id}));
        drop(state);
        true
    }

    // ---- reaper ---------------------------------------------------------

    /// Expire stale ownership and remove stale agents. Work units are swept
    /// first so a simultaneously-expiring owner is observed as a direct
    /// release, not a cascade from its own agent removal (SPEC_FULL.md
    /// §4.1). Returns the paths that were directly expired here (cascades
    /// triggered by agent removal are not included).
    pub fn cleanup_expired(&self) -> Vec<String> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();

        let expired_paths: Vec<String> = state
            .work_units
            .iter()
            .filter(|(_, r)| r.expires_at.is_some_and(|exp| exp < now) && r.owner_agent_id.is_some())
            .map(|(p, _)| p.clone())
            .collect();
        for path in &expired_paths {
            self.promote_or_clear(&mut state, path, now);
        }

        let expired_agents: Vec<String> = state
            .agents
            .iter()
            .filter(|(_, a)| a.is_expired(now))
            .map(|(id, _)| id.clone())
            .collect();
        drop(state);
        for agent_id in expired_agents {
            self.remove_agent(&agent_id);
        }

        expired_paths
    }

    // ---- reads ------------------------------------------------------------

    pub fn get_work_unit(&self, path: &str) -> Option<WorkUnit> {
        let state = self.state.lock().unwrap();
        state.work_units.get(path).map(|r| r.to_view())
    }

    pub fn list_work_units(&self) -> Vec<WorkUnit> {
        let state = self.state.lock().unwrap();
        state.work_units.values().map(|r| r.to_view()).collect()
    }

    pub fn work_units_owned_by(&self, agent_id: &str) -> Vec<WorkUnit> {
        let state = self.state.lock().unwrap();
        state
            .work_units
            .values()
            .filter(|r| r.owner_agent_id.as_deref() == Some(agent_id))
            .map(|r| r.to_view())
            .collect()
    }

    pub fn queue_position_of(&self, agent_id: &str, path: &str) -> Option<usize> {
        let state = self.state.lock().unwrap();
        state.work_units.get(path).and_then(|r| r.queue_position_of(agent_id))
    }

    /// `true` if the path has no record, or is currently unowned.
    pub fn is_available(&self, path: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .work_units
            .get(path)
            .map_or(true, |r| r.owner_agent_id.is_none())
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<Agent> {
        let state = self.state.lock().unwrap();
        state.agents.get(agent_id).cloned()
    }

    pub fn list_agents(&self) -> Vec<Agent> {
        let state = self.state.lock().unwrap();
        state.agents.values().cloned().collect()
    }

    pub fn get_state(&self) -> StateSnapshot {
        let state = self.state.lock().unwrap();
        StateSnapshot {
            agents: state.agents.values().cloned().collect(),
            work_units: state.work_units.values().map(|r| r.to_view()).collect(),
        }
    }
}
