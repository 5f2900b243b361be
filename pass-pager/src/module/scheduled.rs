//! Watch mode: run cycles on a fixed cadence inside one process
//!
//! Cycles run back to back on a single task, so two of them never
//! overlap. Every cycle reloads the state file; the loop keeps nothing in
//! memory between them.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

use super::dapnet::Notifier;
use super::geometry::GeometryProvider;
use super::tracker::PassTracker;

/// Next multiple of `interval_secs` after `now`, counted from the Unix
/// epoch, so cycles land on round wall-clock instants. The interval is
/// clamped to 1 s..=1 day.
pub fn calculate_next_trigger(now: DateTime<Utc>, interval_secs: u64) -> DateTime<Utc> {
    let interval_ms = (interval_secs.clamp(1, 86_400) * 1000) as i64;
    let now_ms = now.timestamp_millis();
    let next_ms = (now_ms.div_euclid(interval_ms) + 1) * interval_ms;
    now + ChronoDuration::milliseconds(next_ms - now_ms)
}

/// Run cycles until Ctrl-C. The first cycle starts immediately.
pub async fn watch<P, N>(tracker: &PassTracker<P, N>, interval_secs: u64)
where
    P: GeometryProvider,
    N: Notifier,
{
    tracing::info!("Watch mode started (cycle every {} s)", interval_secs);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        tracing::info!("============= CYCLE {} =============", cycle);

        tokio::select! {
            _ = tracker.run_cycle(Utc::now()) => {}
            _ = &mut shutdown => {
                tracing::info!("Interrupted during cycle {}, stopping", cycle);
                break;
            }
        }

        let now = Utc::now();
        let next_trigger = calculate_next_trigger(now, interval_secs);
        let sleep_duration = (next_trigger - now)
            .to_std()
            .unwrap_or(Duration::from_secs(interval_secs));

        tracing::debug!(
            "Next cycle at: {} (in {:.1} s)",
            next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
            sleep_duration.as_secs_f64()
        );

        tokio::select! {
            _ = tokio::time::sleep(sleep_duration) => {}
            _ = &mut shutdown => {
                tracing::info!("Interrupted, stopping after {} cycles", cycle);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_calculate_next_trigger() {
        // 20:00:10 with a 30 s cadence -> 20:00:30
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 10).unwrap();
        let next = calculate_next_trigger(now, 30);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 30).unwrap());

        // Exactly on a boundary -> the following one
        let next = calculate_next_trigger(next, 30);
        assert_eq!(next.second(), 0);
        assert_eq!(next.minute(), 1);

        // Sub-second remainders are rounded up to the boundary
        let now = now + ChronoDuration::milliseconds(250);
        assert_eq!(calculate_next_trigger(now, 45).second(), 45);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 10).unwrap();
        assert_eq!(calculate_next_trigger(now, 0), now + ChronoDuration::seconds(1));
    }
}
