//! Element set fetcher
//!
//! Walks the configured sources in priority order and returns the first
//! record matching the tracked object.

use reqwest::Client;
use std::time::Duration;

use super::parser::{parse_records, select_record};
use super::types::TleRecord;
use crate::config::{TleConfig, TrackingConfig};
use crate::error::{PassError, PassResult};

pub struct TleFetcher {
    client: Client,
    sources: Vec<String>,
    source_delay: Duration,
    object_name: String,
    catalog_number: u64,
}

impl TleFetcher {
    pub fn new(tle: &TleConfig, tracking: &TrackingConfig) -> PassResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(tle.timeout_secs))
            .user_agent(concat!("pass-pager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PassError::DataUnavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            sources: tle.sources.clone(),
            source_delay: Duration::from_millis(tle.source_delay_ms),
            object_name: tracking.object_name.clone(),
            catalog_number: tracking.catalog_number,
        })
    }

    /// Fetch the tracked object's record, falling through sources on failure.
    pub async fn fetch(&self) -> PassResult<TleRecord> {
        let mut failures = Vec::new();

        for (index, url) in self.sources.iter().enumerate() {
            if index > 0 && !self.source_delay.is_zero() {
                tokio::time::sleep(self.source_delay).await;
            }

            tracing::info!("[TLE] Downloading from {}", url);

            match self.fetch_source(url).await {
                Ok(record) => {
                    tracing::info!("[TLE] Found {} ({:?}) in {}", record.name, record.catalog_number(), url);
                    return Ok(record);
                }
                Err(e) => {
                    tracing::warn!("[TLE] Source {} failed: {}", url, e);
                    failures.push(format!("{}: {}", url, e));
                }
            }
        }

        tracing::error!("[TLE] No source provided elements for {}", self.object_name);
        Err(PassError::DataUnavailable(format!(
            "no element set for {} (catalog {}): {}",
            self.object_name,
            self.catalog_number,
            failures.join("; ")
        )))
    }

    async fn fetch_source(&self, url: &str) -> PassResult<TleRecord> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PassError::DataUnavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PassError::DataUnavailable(format!("HTTP error {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PassError::DataUnavailable(format!("failed to read body: {}", e)))?;

        let records = parse_records(&body);
        tracing::debug!("[TLE] {} records parsed from {}", records.len(), url);

        select_record(&records, &self.object_name, self.catalog_number)
            .cloned()
            .ok_or_else(|| PassError::DataUnavailable("no matching record".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_sources_yield_data_unavailable() {
        let tle = TleConfig {
            sources: vec![
                "http://127.0.0.1:9/nasa.all".to_string(),
                "http://127.0.0.1:9/stations.txt".to_string(),
            ],
            timeout_secs: 2,
            source_delay_ms: 0,
        };
        let fetcher = TleFetcher::new(&tle, &TrackingConfig::default()).unwrap();

        match fetcher.fetch().await {
            Err(PassError::DataUnavailable(message)) => {
                assert!(message.contains("nasa.all"));
                assert!(message.contains("stations.txt"));
            }
            other => panic!("expected DataUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    #[ignore] // Requires network connection
    async fn test_fetch_iss() {
        let fetcher = TleFetcher::new(&TleConfig::default(), &TrackingConfig::default()).unwrap();
        let record = fetcher.fetch().await.unwrap();
        assert_eq!(record.catalog_number(), Some(25544));
    }
}
