//! Change-notification fan-out.
//!
//! Sinks are invoked synchronously, under the registry lock, after a
//! mutation completes and before the operation returns. Sinks must be fast
//! and non-blocking; a sink that panics or wants to do I/O is a bug in the
//! sink, not something the registry protects against beyond catching panics
//! at the call site (see [`Registry::emit`](crate::registry::Registry)).

use serde::Serialize;
use serde_json::Value;

/// One change-notification, paired with its event name for sinks that match
/// on it. `to_value` never fails: every payload here is built from types that
/// already derive `Serialize`.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub name: &'static str,
    pub payload: Value,
}

impl ChangeEvent {
    pub fn new(name: &'static str, payload: impl Serialize) -> Self {
        let payload = serde_json::to_value(payload)
            .expect("event payload types are always representable as JSON");
        Self { name, payload }
    }
}

/// An in-process observer of registry change events.
///
/// Implementors must not call back into the registry synchronously and must
/// not block; queue onto your own buffer and return.
pub trait ChangeSink: Send + Sync {
    fn on_event(&self, event: &ChangeEvent);
}

impl<F> ChangeSink for F
where
    F: Fn(&ChangeEvent) + Send + Sync,
{
    fn on_event(&self, event: &ChangeEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_carries_serialized_payload() {
        let ev = ChangeEvent::new("agent_removed", serde_json::json!({"agent_id": "a-1"}));
        assert_eq!(ev.name, "agent_removed");
        assert_eq!(ev.payload["agent_id"], "a-1");
    }

    #[test]
    fn closure_sink_is_invoked() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let sink: Box<dyn ChangeSink> = Box::new(move |_event: &ChangeEvent| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        sink.on_event(&ChangeEvent::new("x", serde_json::json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
