//! Per-cycle geometry from freshly fetched elements

use async_trait::async_trait;

use super::{Geometry, Observer, Sgp4Geometry};
use crate::error::PassResult;
use crate::module::tle::TleFetcher;

/// Source of a ready-to-query [`Geometry`]. Called at most once per cycle,
/// and only when the cycle actually needs positions.
#[async_trait]
pub trait GeometryProvider: Send + Sync {
    async fn geometry(&self) -> PassResult<Box<dyn Geometry>>;
}

/// Fetches the element set over HTTP and builds an SGP4 propagator.
pub struct TleGeometryProvider {
    fetcher: TleFetcher,
    observer: Observer,
}

impl TleGeometryProvider {
    pub fn new(fetcher: TleFetcher, observer: Observer) -> Self {
        Self { fetcher, observer }
    }
}

#[async_trait]
impl GeometryProvider for TleGeometryProvider {
    async fn geometry(&self) -> PassResult<Box<dyn Geometry>> {
        let record = self.fetcher.fetch().await?;
        let geometry = Sgp4Geometry::from_record(&record, self.observer)?;
        Ok(Box::new(geometry))
    }
}
