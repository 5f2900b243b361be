//! Pass lifecycle state machine
//!
//! There is no stored "current milestone": every invocation re-evaluates
//! `now` against the four instants of the window. A milestone fires when
//! it is unsent and `now` lies within the tolerance of its instant; once
//! that window has passed, the milestone is skipped for good. After the
//! end has been notified and the grace period elapsed, the window is
//! retired so the next cycle can predict a new pass.
//!
//! Delivery does not gate the flags: a milestone whose geometry is
//! available is marked sent here, before dispatch, whatever the dispatch
//! outcome. A milestone whose geometry could not be computed stays unsent
//! and is retried on the next cycle.

use chrono::{DateTime, Duration, Utc};

use super::composer::Composer;
use super::window::{Milestone, PassWindow};
use crate::config::TrackingConfig;
use crate::error::PassError;
use crate::module::geometry::Geometry;

/// A message due for dispatch. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub milestone: Milestone,
    pub text: String,
}

/// Result of evaluating one window at one instant.
#[derive(Debug, Clone)]
pub struct Advance {
    /// Updated window, `None` once retired.
    pub window: Option<PassWindow>,
    pub notifications: Vec<Notification>,
    /// Due milestones left unsent because their geometry failed.
    pub skipped: Vec<(Milestone, PassError)>,
    pub retired: bool,
}

impl Advance {
    /// Whether persisted state needs rewriting.
    pub fn changed(&self) -> bool {
        self.retired || !self.notifications.is_empty()
    }
}

pub struct PassLifecycle {
    object_id: String,
    tolerance: Duration,
    expire_grace: Duration,
    composer: Composer,
}

impl PassLifecycle {
    pub fn new(tracking: &TrackingConfig, composer: Composer) -> Self {
        Self {
            object_id: tracking.object_id.clone(),
            tolerance: tracking.tolerance(),
            expire_grace: tracking.expire_grace(),
            composer,
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Milestones that would fire at `now`.
    pub fn due(&self, window: &PassWindow, now: DateTime<Utc>) -> Vec<Milestone> {
        window.due_milestones(now, self.tolerance)
    }

    /// Fire every due milestone in order, then retire the window if it has
    /// fully elapsed.
    pub fn advance(&self, mut window: PassWindow, now: DateTime<Utc>, geometry: &dyn Geometry) -> Advance {
        let mut notifications = Vec::new();
        let mut skipped = Vec::new();

        for milestone in Milestone::ALL {
            if window.is_sent(milestone) {
                continue;
            }

            self.trace_timing(&window, milestone, now);

            if !window.is_due(milestone, now, self.tolerance) {
                continue;
            }

            let reference = window.reference_instant(milestone);
            match geometry.look_angles(reference) {
                Ok(look) => {
                    let text = self.composer.compose(milestone, reference, look);
                    window.mark_sent(milestone);
                    tracing::info!(
                        "[{}] {} milestone due at {} (az {:.1}, el {:.1}): '{}'",
                        self.object_id,
                        milestone,
                        window.instant(milestone).to_rfc3339(),
                        look.azimuth_deg,
                        look.elevation_deg,
                        text
                    );
                    notifications.push(Notification { milestone, text });
                }
                Err(e) => {
                    tracing::warn!(
                        "[{}] {} milestone due at {} skipped this cycle, geometry unavailable: {}",
                        self.object_id,
                        milestone,
                        window.instant(milestone).to_rfc3339(),
                        e
                    );
                    skipped.push((milestone, e));
                }
            }
        }

        if window.is_expired(now, self.expire_grace) {
            tracing::info!(
                "[{}] Pass ended at {}, grace elapsed -> reset",
                self.object_id,
                window.end_at.to_rfc3339()
            );
            return Advance {
                window: None,
                notifications,
                skipped,
                retired: true,
            };
        }

        Advance {
            window: Some(window),
            notifications,
            skipped,
            retired: false,
        }
    }

    fn trace_timing(&self, window: &PassWindow, milestone: Milestone, now: DateTime<Utc>) {
        tracing::debug!("{}", self.timing_line(window, milestone, now));
    }

    /// Scheduled vs. current time of one milestone, in UTC and local time.
    fn timing_line(&self, window: &PassWindow, milestone: Milestone, now: DateTime<Utc>) -> String {
        let event = window.instant(milestone);
        let zone = self.composer.zone();
        let diff = window.offset_from(milestone, now).num_milliseconds() as f64 / 1000.0;

        format!(
            "[{}] {} now_local={} now_utc={} evt_local={} evt_utc={} diff={:.1}s window={}s",
            self.object_id,
            milestone,
            zone.format(now, "%H:%M:%S"),
            now.format("%H:%M:%S"),
            zone.format(event, "%H:%M:%S"),
            event.format("%H:%M:%S"),
            diff,
            self.tolerance.num_seconds()
        )
    }
}
