//! Tracked pass window and its four milestones

use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Notable instants of a pass, in firing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    Prealert,
    Start,
    Peak,
    End,
}

impl Milestone {
    pub const ALL: [Milestone; 4] = [
        Milestone::Prealert,
        Milestone::Start,
        Milestone::Peak,
        Milestone::End,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Milestone::Prealert => "PREALERT",
            Milestone::Start => "START",
            Milestone::Peak => "PEAK",
            Milestone::End => "END",
        }
    }
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One predicted visibility event plus per-milestone delivery flags.
///
/// Instants never change after construction. Flags only ever go from
/// unsent to sent; there is no way to clear one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassWindow {
    pub prealert_at: DateTime<Utc>,
    pub start_at: DateTime<Utc>,
    pub peak_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    sent_prealert: bool,
    sent_start: bool,
    sent_peak: bool,
    sent_end: bool,
}

impl PassWindow {
    pub fn new(
        prealert_at: DateTime<Utc>,
        start_at: DateTime<Utc>,
        peak_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) -> Self {
        Self {
            prealert_at,
            start_at,
            peak_at,
            end_at,
            sent_prealert: false,
            sent_start: false,
            sent_peak: false,
            sent_end: false,
        }
    }

    /// Scheduled instant of `milestone`.
    pub fn instant(&self, milestone: Milestone) -> DateTime<Utc> {
        match milestone {
            Milestone::Prealert => self.prealert_at,
            Milestone::Start => self.start_at,
            Milestone::Peak => self.peak_at,
            Milestone::End => self.end_at,
        }
    }

    /// Instant whose geometry the notification describes. The pre-alert
    /// previews the upcoming rise, so it uses the start instant.
    pub fn reference_instant(&self, milestone: Milestone) -> DateTime<Utc> {
        match milestone {
            Milestone::Prealert => self.start_at,
            other => self.instant(other),
        }
    }

    pub fn is_sent(&self, milestone: Milestone) -> bool {
        match milestone {
            Milestone::Prealert => self.sent_prealert,
            Milestone::Start => self.sent_start,
            Milestone::Peak => self.sent_peak,
            Milestone::End => self.sent_end,
        }
    }

    pub fn mark_sent(&mut self, milestone: Milestone) {
        match milestone {
            Milestone::Prealert => self.sent_prealert = true,
            Milestone::Start => self.sent_start = true,
            Milestone::Peak => self.sent_peak = true,
            Milestone::End => self.sent_end = true,
        }
    }

    /// Builder form of [`mark_sent`](Self::mark_sent).
    pub fn with_sent(mut self, milestone: Milestone) -> Self {
        self.mark_sent(milestone);
        self
    }

    /// Signed distance from the scheduled instant to `now`.
    pub fn offset_from(&self, milestone: Milestone, now: DateTime<Utc>) -> Duration {
        now - self.instant(milestone)
    }

    /// Unsent and within `tolerance` of its instant, either side.
    pub fn is_due(&self, milestone: Milestone, now: DateTime<Utc>, tolerance: Duration) -> bool {
        !self.is_sent(milestone) && self.offset_from(milestone, now).abs() <= tolerance
    }

    pub fn due_milestones(&self, now: DateTime<Utc>, tolerance: Duration) -> Vec<Milestone> {
        Milestone::ALL
            .into_iter()
            .filter(|&m| self.is_due(m, now, tolerance))
            .collect()
    }

    /// End notified and `grace` elapsed past the end instant.
    pub fn is_expired(&self, now: DateTime<Utc>, grace: Duration) -> bool {
        self.sent_end && now > self.end_at + grace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> PassWindow {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        PassWindow::new(
            start - Duration::minutes(15),
            start,
            start + Duration::minutes(5),
            start + Duration::minutes(10),
        )
    }

    #[test]
    fn test_tolerance_is_symmetric_and_inclusive() {
        let w = window();
        let tol = Duration::seconds(45);

        assert!(w.is_due(Milestone::Start, w.start_at - tol, tol));
        assert!(w.is_due(Milestone::Start, w.start_at + tol, tol));
        assert!(!w.is_due(Milestone::Start, w.start_at - tol - Duration::seconds(1), tol));
        assert!(!w.is_due(Milestone::Start, w.start_at + tol + Duration::seconds(1), tol));
    }

    #[test]
    fn test_sent_milestone_never_due() {
        let w = window().with_sent(Milestone::Peak);
        assert!(!w.is_due(Milestone::Peak, w.peak_at, Duration::seconds(45)));
        assert!(w.is_sent(Milestone::Peak));
    }

    #[test]
    fn test_due_milestones_in_order() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap();
        // Degenerate geometry: everything at the same instant.
        let w = PassWindow::new(start - Duration::seconds(10), start, start, start);
        let due = w.due_milestones(start, Duration::seconds(45));
        assert_eq!(due, Milestone::ALL.to_vec());
    }

    #[test]
    fn test_prealert_references_start_geometry() {
        let w = window();
        assert_eq!(w.reference_instant(Milestone::Prealert), w.start_at);
        assert_eq!(w.reference_instant(Milestone::Peak), w.peak_at);
    }

    #[test]
    fn test_expiry_requires_end_sent_and_grace_elapsed() {
        let w = window();
        let grace = Duration::minutes(10);
        let after = w.end_at + grace + Duration::seconds(1);

        assert!(!w.is_expired(after, grace));

        let w = w.with_sent(Milestone::End);
        assert!(!w.is_expired(w.end_at + grace, grace));
        assert!(w.is_expired(after, grace));
    }
}
