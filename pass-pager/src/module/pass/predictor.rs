//! Next-pass prediction
//!
//! Asks the geometry for events over the look-ahead horizon and keeps the
//! first complete rise -> culminate -> set run.

use chrono::{DateTime, Duration, Utc};

use super::window::PassWindow;
use crate::config::TrackingConfig;
use crate::error::PassResult;
use crate::module::geometry::{EventKind, Geometry, PassEvent};

pub struct PassPredictor {
    horizon: Duration,
    min_elevation_deg: f64,
    prealert_offset: Duration,
}

impl PassPredictor {
    pub fn new(tracking: &TrackingConfig) -> Self {
        Self {
            horizon: tracking.horizon(),
            min_elevation_deg: tracking.min_elevation_deg,
            prealert_offset: tracking.prealert_offset(),
        }
    }

    /// Window of the first complete pass starting the search at `now`.
    ///
    /// `Ok(None)` means no complete pass inside the horizon; geometry
    /// failures are returned as-is for the caller to log.
    pub fn predict(&self, geometry: &dyn Geometry, now: DateTime<Utc>) -> PassResult<Option<PassWindow>> {
        let events = geometry.find_passes(now, now + self.horizon, self.min_elevation_deg)?;

        tracing::debug!("[PASS] {} events within {} h", events.len(), self.horizon.num_hours());

        let Some((rise, peak, set)) = first_complete_pass(&events) else {
            tracing::info!("[PASS] No complete pass within the horizon");
            return Ok(None);
        };

        let window = PassWindow::new(rise - self.prealert_offset, rise, peak, set);

        tracing::info!("[PASS] New pass found (UTC):");
        tracing::info!("       prealert : {}", window.prealert_at);
        tracing::info!("       start    : {}", window.start_at);
        tracing::info!("       peak     : {}", window.peak_at);
        tracing::info!("       end      : {}", window.end_at);

        Ok(Some(window))
    }
}

/// Instants of the first `Rise, Culminate, Set` appearing consecutively.
///
/// A pass cut by either edge of the search span never forms such a run,
/// so it is skipped rather than partially used.
pub fn first_complete_pass(
    events: &[PassEvent],
) -> Option<(DateTime<Utc>, DateTime<Utc>, DateTime<Utc>)> {
    events.windows(3).find_map(|w| match (w[0].kind, w[1].kind, w[2].kind) {
        (EventKind::Rise, EventKind::Culminate, EventKind::Set) => Some((w[0].at, w[1].at, w[2].at)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PassError;
    use crate::module::pass::window::Milestone;
    use crate::module::geometry::{LookAngles, UnavailableGeometry};
    use chrono::TimeZone;

    struct FixedEvents(Vec<PassEvent>);

    impl Geometry for FixedEvents {
        fn look_angles(&self, _at: DateTime<Utc>) -> PassResult<LookAngles> {
            Ok(LookAngles { elevation_deg: 10.0, azimuth_deg: 180.0 })
        }

        fn find_passes(&self, from: DateTime<Utc>, to: DateTime<Utc>, _min: f64) -> PassResult<Vec<PassEvent>> {
            Ok(self.0.iter().copied().filter(|e| e.at >= from && e.at <= to).collect())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 18, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        now() + Duration::minutes(minutes)
    }

    fn predictor() -> PassPredictor {
        PassPredictor::new(&TrackingConfig::default())
    }

    #[test]
    fn test_first_complete_pass_skips_truncated_leading_pass() {
        let geometry = FixedEvents(vec![
            PassEvent::new(EventKind::Culminate, at(1)),
            PassEvent::new(EventKind::Set, at(4)),
            PassEvent::new(EventKind::Rise, at(60)),
            PassEvent::new(EventKind::Culminate, at(65)),
            PassEvent::new(EventKind::Set, at(70)),
        ]);

        let window = predictor().predict(&geometry, now()).unwrap().unwrap();
        assert_eq!(window.start_at, at(60));
        assert_eq!(window.peak_at, at(65));
        assert_eq!(window.end_at, at(70));
        assert_eq!(window.prealert_at, at(45));
        assert!(Milestone::ALL.iter().all(|&m| !window.is_sent(m)));
    }

    #[test]
    fn test_truncated_trailing_pass_yields_none() {
        // Set falls outside the two hour horizon.
        let geometry = FixedEvents(vec![
            PassEvent::new(EventKind::Rise, at(115)),
            PassEvent::new(EventKind::Culminate, at(119)),
            PassEvent::new(EventKind::Set, at(125)),
        ]);
        assert_eq!(predictor().predict(&geometry, now()).unwrap(), None);
    }

    #[test]
    fn test_non_consecutive_triple_rejected() {
        let events = vec![
            PassEvent::new(EventKind::Rise, at(10)),
            PassEvent::new(EventKind::Set, at(12)),
            PassEvent::new(EventKind::Culminate, at(13)),
            PassEvent::new(EventKind::Set, at(14)),
        ];
        assert_eq!(first_complete_pass(&events), None);
    }

    #[test]
    fn test_degenerate_geometry_accepted() {
        let events = vec![
            PassEvent::new(EventKind::Rise, at(10)),
            PassEvent::new(EventKind::Culminate, at(10)),
            PassEvent::new(EventKind::Set, at(10)),
        ];
        assert_eq!(first_complete_pass(&events), Some((at(10), at(10), at(10))));
    }

    #[test]
    fn test_geometry_failure_surfaces() {
        let geometry = UnavailableGeometry(PassError::Propagation("decayed".to_string()));
        assert_eq!(
            predictor().predict(&geometry, now()),
            Err(PassError::Propagation("decayed".to_string()))
        );
    }
}
