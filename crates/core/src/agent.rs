//! Agent identity and lifecycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether an agent is a top-level session or a spawned sub-agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Main,
    Sub,
}

/// A coordinated client tracked by the registry.
///
/// For a top-level agent `agent_id == session_id`. For a spawned sub-agent,
/// `agent_id` is `"{session_id}:{spawn_call_id}"`; callers must never parse
/// past the first colon, since session ids themselves may be arbitrary
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub session_id: String,
    pub kind: AgentKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawn_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_agent_id: Option<String>,
    pub registered_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub ttl_seconds: u64,
}

/// Default agent TTL per SPEC_FULL.md §3 (10 minutes).
pub const DEFAULT_AGENT_TTL_SECS: u64 = 600;

impl Agent {
    /// Build a top-level agent record, `agent_id == session_id`.
    pub fn new_main(session_id: String, now: DateTime<Utc>, ttl_seconds: u64) -> Self {
        Self {
            agent_id: session_id.clone(),
            session_id,
            kind: AgentKind::Main,
            spawn_call_id: None,
            parent_agent_id: None,
            registered_at: now,
            last_seen: now,
            ttl_seconds,
        }
    }

    /// Build a sub-agent record; `agent_id` is the `session:spawn_call` composite.
    pub fn new_sub(
        session_id: String,
        spawn_call_id: String,
        parent_agent_id: String,
        now: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Self {
        let agent_id = format!("{session_id}:{spawn_call_id}");
        Self {
            agent_id,
            session_id,
            kind: AgentKind::Sub,
            spawn_call_id: Some(spawn_call_id),
            parent_agent_id: Some(parent_agent_id),
            registered_at: now,
            last_seen: now,
            ttl_seconds,
        }
    }

    /// Implicitly create a main agent from a bare `agent_id` seen on first
    /// `claim`. The session portion is everything before the first colon.
    pub fn implicit(agent_id: &str, now: DateTime<Utc>, ttl_seconds: u64) -> Self {
        let session_id = agent_id
            .split_once(':')
            .map(|(session, _)| session.to_string())
            .unwrap_or_else(|| agent_id.to_string());
        Self {
            agent_id: agent_id.to_string(),
            session_id,
            kind: AgentKind::Main,
            spawn_call_id: None,
            parent_agent_id: None,
            registered_at: now,
            last_seen: now,
            ttl_seconds,
        }
    }

    /// `true` iff `now - last_seen > ttl_seconds`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now - self.last_seen;
        age > chrono::Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_seen = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn main_agent_id_equals_session_id() {
        let a = Agent::new_main("sess-1".into(), t("2026-01-01T00:00:00Z"), 600);
        assert_eq!(a.agent_id, "sess-1");
        assert_eq!(a.kind, AgentKind::Main);
    }

    #[test]
    fn sub_agent_id_is_composite() {
        let a = Agent::new_sub(
            "sess-1".into(),
            "call-7".into(),
            "sess-1".into(),
            t("2026-01-01T00:00:00Z"),
            600,
        );
        assert_eq!(a.agent_id, "sess-1:call-7");
        assert_eq!(a.kind, AgentKind::Sub);
        assert_eq!(a.spawn_call_id.as_deref(), Some("call-7"));
    }

    #[test]
    fn implicit_agent_recovers_session_before_first_colon() {
        let a = Agent::implicit("sess-1:call-7:extra", t("2026-01-01T00:00:00Z"), 600);
        assert_eq!(a.session_id, "sess-1");
        assert_eq!(a.agent_id, "sess-1:call-7:extra");
    }

    #[test]
    fn implicit_agent_without_colon_uses_whole_id() {
        let a = Agent::implicit("solo", t("2026-01-01T00:00:00Z"), 600);
        assert_eq!(a.session_id, "solo");
    }

    #[test]
    fn expiry_boundary_is_strict_greater_than() {
        let mut a = Agent::new_main("s".into(), t("2026-01-01T00:00:00Z"), 10);
        assert!(!a.is_expired(t("2026-01-01T00:00:10Z")));
        assert!(a.is_expired(t("2026-01-01T00:00:11Z")));
        a.touch(t("2026-01-01T00:00:10Z"));
        assert!(!a.is_expired(t("2026-01-01T00:00:19Z")));
    }

    #[test]
    fn serializes_kind_lowercase() {
        let a = Agent::new_main("s".into(), t("2026-01-01T00:00:00Z"), 600);
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["kind"], "main");
    }
}
