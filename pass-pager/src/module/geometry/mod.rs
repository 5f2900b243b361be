//! Geometry adapter
//!
//! Thin boundary over the SGP4 propagator: look angles at an instant and
//! rise/culminate/set events over a span. Everything else in the crate
//! talks to the [`Geometry`] trait only.

pub mod frames;
pub mod propagator;
pub mod provider;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PassError, PassResult};

pub use propagator::Sgp4Geometry;
pub use provider::{GeometryProvider, TleGeometryProvider};

/// Geodetic ground station position (WGS-84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Latitude, in degrees.
    pub latitude: f64,
    /// Longitude, in degrees, east positive.
    pub longitude: f64,
    /// Altitude above the ellipsoid, in meters.
    pub altitude_m: f64,
}

impl Observer {
    pub fn new(latitude: f64, longitude: f64, altitude_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude_m,
        }
    }
}

/// Topocentric direction to the object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookAngles {
    pub elevation_deg: f64,
    /// Clockwise from true north, in [0, 360).
    pub azimuth_deg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Rise,
    Culminate,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassEvent {
    pub kind: EventKind,
    pub at: DateTime<Utc>,
}

impl PassEvent {
    pub fn new(kind: EventKind, at: DateTime<Utc>) -> Self {
        Self { kind, at }
    }
}

/// Pure geometry queries for one object as seen from one observer.
pub trait Geometry: Send + Sync {
    fn look_angles(&self, at: DateTime<Utc>) -> PassResult<LookAngles>;

    /// Events between `from` and `to` above `min_elevation_deg`, ordered by time.
    fn find_passes(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        min_elevation_deg: f64,
    ) -> PassResult<Vec<PassEvent>>;
}

/// Stand-in used when no elements could be obtained this cycle; every
/// query reports the fetch failure.
#[derive(Debug, Clone)]
pub struct UnavailableGeometry(pub PassError);

impl Geometry for UnavailableGeometry {
    fn look_angles(&self, _at: DateTime<Utc>) -> PassResult<LookAngles> {
        Err(self.0.clone())
    }

    fn find_passes(
        &self,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
        _min_elevation_deg: f64,
    ) -> PassResult<Vec<PassEvent>> {
        Err(self.0.clone())
    }
}
