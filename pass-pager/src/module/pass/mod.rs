//! Pass tracking core
//!
//! A predicted window, the rules deciding when each of its milestones
//! fires, the pager text for each milestone and the JSON file the window
//! survives in between invocations.

pub mod window;
pub mod predictor;
pub mod lifecycle;
pub mod composer;
pub mod store;

pub use window::{Milestone, PassWindow};
pub use predictor::PassPredictor;
pub use lifecycle::{Advance, Notification, PassLifecycle};
pub use composer::{Composer, LocalZone};
pub use store::{PassRecord, StateStore, TrackerState};
