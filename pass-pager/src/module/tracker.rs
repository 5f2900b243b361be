//! One tracking cycle: load -> compute -> persist -> dispatch
//!
//! Nothing survives between cycles except the state file. The updated
//! state is written before any notification leaves the process; if that
//! write fails the cycle sends nothing.

use chrono::{DateTime, Utc};

use crate::config::AppConfig;
use crate::error::PassError;
use crate::module::dapnet::Notifier;
use crate::module::geometry::{Geometry, GeometryProvider, UnavailableGeometry};
use crate::module::pass::{
    Composer, Milestone, PassLifecycle, PassPredictor, PassWindow, StateStore, TrackerState,
};

/// What a cycle did. Domain failures end up here instead of as errors.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Window created by this cycle
    pub predicted: Option<PassWindow>,
    /// Milestones accepted by the gateway
    pub sent: Vec<Milestone>,
    /// Milestones marked sent whose delivery failed
    pub failed: Vec<(Milestone, PassError)>,
    /// Due milestones left unsent because geometry was unavailable
    pub skipped: Vec<(Milestone, PassError)>,
    pub retired: bool,
    /// The tracked record was unreadable and has been reset
    pub recovered: bool,
    /// Whether the state file was rewritten
    pub persisted: bool,
    /// Prediction failure, or the state write failure that cancelled dispatch
    pub error: Option<String>,
}

impl CycleReport {
    /// Milestones marked sent this cycle, whatever the delivery outcome.
    pub fn notified(&self) -> usize {
        self.sent.len() + self.failed.len()
    }
}

pub struct PassTracker<P, N> {
    object_id: String,
    store: StateStore,
    provider: P,
    notifier: N,
    predictor: PassPredictor,
    lifecycle: PassLifecycle,
}

impl<P: GeometryProvider, N: Notifier> PassTracker<P, N> {
    pub fn new(config: &AppConfig, provider: P, notifier: N) -> Self {
        Self {
            object_id: config.tracking.object_id.clone(),
            store: StateStore::new(&config.state_file, config.tracking.object_id.clone()),
            provider,
            notifier,
            predictor: PassPredictor::new(&config.tracking),
            lifecycle: PassLifecycle::new(&config.tracking, Composer::from_config(config)),
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run one full cycle as of `now`. Never fails: problems are logged
    /// and reported.
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();
        let mut state = self.store.load().await;

        let window = match state.window(&self.object_id) {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!("[{}] {}, resetting record", self.object_id, e);
                state.reset(&self.object_id);
                report.recovered = true;
                None
            }
        };

        match window {
            None => self.predict(&mut state, now, &mut report).await,
            Some(window) => self.track(&mut state, window, now, &mut report).await,
        }

        tracing::info!(
            "[{}] Cycle done: predicted={} sent={} failed={} skipped={} retired={}",
            self.object_id,
            report.predicted.is_some(),
            report.sent.len(),
            report.failed.len(),
            report.skipped.len(),
            report.retired
        );

        report
    }

    async fn predict(&self, state: &mut TrackerState, now: DateTime<Utc>, report: &mut CycleReport) {
        tracing::info!("[{}] No pass tracked -> predicting", self.object_id);

        let prediction = match self.provider.geometry().await {
            Ok(geometry) => self.predictor.predict(geometry.as_ref(), now),
            Err(e) => Err(e),
        };

        match prediction {
            Ok(Some(window)) => {
                state.set_window(&self.object_id, Some(&window));
                report.predicted = Some(window);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("[{}] Prediction failed, retrying next cycle: {}", self.object_id, e);
                report.error = Some(e.to_string());
            }
        }

        if report.predicted.is_some() || report.recovered {
            self.persist(state, report).await;
        }
    }

    async fn track(
        &self,
        state: &mut TrackerState,
        window: PassWindow,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        tracing::info!(
            "[{}] Active pass (UTC): prealert={} start={} peak={} end={}",
            self.object_id,
            window.prealert_at,
            window.start_at,
            window.peak_at,
            window.end_at
        );

        let due = self.lifecycle.due(&window, now);
        let geometry: Box<dyn Geometry> = if due.is_empty() {
            // Never queried: nothing is due.
            Box::new(UnavailableGeometry(PassError::DataUnavailable(
                "elements not fetched".to_string(),
            )))
        } else {
            tracing::debug!("[{}] Due: {:?}", self.object_id, due);
            match self.provider.geometry().await {
                Ok(geometry) => geometry,
                Err(e) => {
                    tracing::error!("[{}] No elements for due milestones: {}", self.object_id, e);
                    Box::new(UnavailableGeometry(e))
                }
            }
        };

        let advance = self.lifecycle.advance(window, now, geometry.as_ref());
        report.retired = advance.retired;
        report.skipped = advance.skipped.clone();

        if !advance.changed() {
            return;
        }

        state.set_window(&self.object_id, advance.window.as_ref());
        if !self.persist(state, report).await {
            tracing::error!(
                "[{}] State not saved, dropping {} notifications",
                self.object_id,
                advance.notifications.len()
            );
            return;
        }

        for notification in advance.notifications {
            match self.notifier.send(&notification.text).await {
                Ok(()) => report.sent.push(notification.milestone),
                Err(e) => {
                    tracing::error!(
                        "[{}] {} notification not delivered, kept as sent: {}",
                        self.object_id,
                        notification.milestone,
                        e
                    );
                    report.failed.push((notification.milestone, e));
                }
            }
        }
    }

    async fn persist(&self, state: &TrackerState, report: &mut CycleReport) -> bool {
        match self.store.save(state).await {
            Ok(()) => {
                report.persisted = true;
                true
            }
            Err(e) => {
                tracing::error!("[{}] Failed to save state to {:?}: {:#}", self.object_id, self.store.path(), e);
                report.error = Some(format!("{:#}", e));
                false
            }
        }
    }
}
