//! Periodic TTL reaper (SPEC_FULL.md §4.2).

use claimd_core::Registry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Run `cleanup_expired` on a fixed cadence until cancelled.
///
/// Never exits early on a bad sweep: a sweep can only return a plain
/// `Vec<String>`, so there is nothing for this loop to propagate as an
/// error. The `select!` arm always re-arms the interval.
pub async fn run(registry: Arc<Registry>, interval_duration: Duration, cancel: CancellationToken) {
    debug!("Starting reaper loop (interval: {:?})", interval_duration);
    let mut ticker = interval(interval_duration);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let released = registry.cleanup_expired();
                if !released.is_empty() {
                    debug!("Reaper released {} work unit(s): {:?}", released.len(), released);
                } else {
                    debug!("Reaper sweep: nothing expired");
                }
            }
            _ = cancel.cancelled() => {
                debug!("Reaper loop cancelled");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claimd_core::{Clock, FakeClock, SystemClock};
    use std::sync::Arc as StdArc;

    struct ClockHandle(StdArc<FakeClock>);
    impl Clock for ClockHandle {
        fn now(&self) -> chrono::DateTime<chrono::Utc> {
            self.0.now()
        }
    }

    #[tokio::test]
    async fn reaper_expires_work_units_on_schedule() {
        let start = chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let clock = StdArc::new(FakeClock::new(start));
        let registry = Arc::new(Registry::with_clock(Box::new(ClockHandle(clock.clone())), 300, 600));
        registry.claim("a-1", "/x", None, Some(0)).unwrap();
        clock.advance(chrono::Duration::seconds(1));

        let released = registry.cleanup_expired();
        assert_eq!(released, vec!["/x".to_string()]);
    }

    #[tokio::test]
    async fn reaper_loop_stops_on_cancellation() {
        let registry = Arc::new(Registry::with_clock(Box::new(SystemClock), 300, 600));
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(run(registry, Duration::from_millis(10), cancel_clone));
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("reaper loop should exit promptly after cancellation")
            .unwrap();
    }
}
