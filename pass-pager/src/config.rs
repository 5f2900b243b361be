use anyhow::Context;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::module::geometry::Observer;

/// Top-level configuration, read once per process and handed to each
/// component by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// JSON file holding the tracked windows
    #[serde(default = "default_state_file")]
    pub state_file: String,

    #[serde(default)]
    pub observer: ObserverConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    #[serde(default)]
    pub tle: TleConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub messages: MessageTemplates,
}

/// Ground station position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserverConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,

    #[serde(default = "default_longitude")]
    pub longitude: f64,

    #[serde(default = "default_altitude_m")]
    pub altitude_m: f64,

    /// Fixed local zone for message times. Falls back to the system zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

/// Pass prediction and notification timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Key of the object in the state file
    #[serde(default = "default_object_id")]
    pub object_id: String,

    /// Matched against the name line of TLE records
    #[serde(default = "default_object_name")]
    pub object_name: String,

    #[serde(default = "default_catalog_number")]
    pub catalog_number: u64,

    #[serde(default = "default_min_elevation_deg")]
    pub min_elevation_deg: f64,

    /// Half-width of the window around a milestone in which it may fire
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: u64,

    #[serde(default = "default_prealert_minutes")]
    pub prealert_minutes: u64,

    /// Delay after the end of a pass before the window is retired
    #[serde(default = "default_expire_grace_minutes")]
    pub expire_grace_minutes: u64,

    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: u64,
}

/// Orbital element sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TleConfig {
    /// Tried in order until one yields a matching record
    #[serde(default = "default_tle_sources")]
    pub sources: Vec<String>,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_source_delay_ms")]
    pub source_delay_ms: u64,
}

/// DAPNET gateway credentials and recipients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub call_signs: Vec<String>,

    #[serde(default)]
    pub transmitter_groups: Vec<String>,

    #[serde(default)]
    pub emergency: bool,

    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

/// Message templates. Placeholders: `{object}`, `{lead}`, `{time}`,
/// `{az}` and, except for the pre-alert, `{el}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplates {
    #[serde(default = "default_prealert_template")]
    pub prealert: String,

    #[serde(default = "default_start_template")]
    pub start: String,

    #[serde(default = "default_peak_template")]
    pub peak: String,

    #[serde(default = "default_end_template")]
    pub end: String,
}

const MAX_TOLERANCE_SECS: u64 = 3600;
const MAX_PREALERT_MINUTES: u64 = 24 * 60;
const MAX_EXPIRE_GRACE_MINUTES: u64 = 24 * 60;
const MAX_HORIZON_HOURS: u64 = 7 * 24;

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_state_file() -> String {
    "pass_state.json".to_string()
}

fn default_latitude() -> f64 {
    48.1173
}

fn default_longitude() -> f64 {
    -1.6778
}

fn default_altitude_m() -> f64 {
    60.0
}

fn default_object_id() -> String {
    "ISS".to_string()
}

fn default_object_name() -> String {
    "ISS".to_string()
}

fn default_catalog_number() -> u64 {
    25544
}

fn default_min_elevation_deg() -> f64 {
    5.0
}

fn default_tolerance_secs() -> u64 {
    45
}

fn default_prealert_minutes() -> u64 {
    15
}

fn default_expire_grace_minutes() -> u64 {
    10
}

fn default_horizon_hours() -> u64 {
    2
}

fn default_tle_sources() -> Vec<String> {
    vec![
        "https://www.amsat.org/amsat/ftp/keps/current/nasa.all".to_string(),
        "https://celestrak.org/NORAD/elements/stations.txt".to_string(),
    ]
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_source_delay_ms() -> u64 {
    1000
}

fn default_gateway_url() -> String {
    "https://hampager.de/api/calls".to_string()
}

fn default_prealert_template() -> String {
    "{object} in {lead} min {time} - Azimuth {az}".to_string()
}

fn default_start_template() -> String {
    "{object} visible {time} - Azimuth {az} Elevation {el}".to_string()
}

fn default_peak_template() -> String {
    "{object} peak {time} - Azimuth {az} Elevation {el}".to_string()
}

fn default_end_template() -> String {
    "{object} end {time} - Azimuth {az} Elevation {el}".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            state_file: default_state_file(),
            observer: ObserverConfig::default(),
            tracking: TrackingConfig::default(),
            tle: TleConfig::default(),
            gateway: GatewayConfig::default(),
            messages: MessageTemplates::default(),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            altitude_m: default_altitude_m(),
            utc_offset_minutes: None,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            object_id: default_object_id(),
            object_name: default_object_name(),
            catalog_number: default_catalog_number(),
            min_elevation_deg: default_min_elevation_deg(),
            tolerance_secs: default_tolerance_secs(),
            prealert_minutes: default_prealert_minutes(),
            expire_grace_minutes: default_expire_grace_minutes(),
            horizon_hours: default_horizon_hours(),
        }
    }
}

impl Default for TleConfig {
    fn default() -> Self {
        Self {
            sources: default_tle_sources(),
            timeout_secs: default_http_timeout_secs(),
            source_delay_ms: default_source_delay_ms(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            username: String::new(),
            password: String::new(),
            call_signs: Vec::new(),
            transmitter_groups: Vec::new(),
            emergency: false,
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            prealert: default_prealert_template(),
            start: default_start_template(),
            peak: default_peak_template(),
            end: default_end_template(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config file '{}'", path))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Range checks that serde cannot express. All problems are reported
    /// at once.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut problems = Vec::new();

        if !(-90.0..=90.0).contains(&self.observer.latitude) {
            problems.push(format!("observer.latitude {} outside [-90, 90]", self.observer.latitude));
        }
        if !(-180.0..=180.0).contains(&self.observer.longitude) {
            problems.push(format!("observer.longitude {} outside [-180, 180]", self.observer.longitude));
        }
        if !(-90.0..=90.0).contains(&self.tracking.min_elevation_deg) {
            problems.push(format!(
                "tracking.min_elevation_deg {} outside [-90, 90]",
                self.tracking.min_elevation_deg
            ));
        }
        let timings = [
            ("tracking.tolerance_secs", self.tracking.tolerance_secs, 1, MAX_TOLERANCE_SECS),
            ("tracking.prealert_minutes", self.tracking.prealert_minutes, 1, MAX_PREALERT_MINUTES),
            ("tracking.expire_grace_minutes", self.tracking.expire_grace_minutes, 0, MAX_EXPIRE_GRACE_MINUTES),
            ("tracking.horizon_hours", self.tracking.horizon_hours, 1, MAX_HORIZON_HOURS),
        ];
        for (name, value, min, max) in timings {
            if !(min..=max).contains(&value) {
                problems.push(format!("{} {} outside [{}, {}]", name, value, min, max));
            }
        }
        if self.tracking.object_id.trim().is_empty() {
            problems.push("tracking.object_id must not be empty".to_string());
        }
        if self.tle.sources.is_empty() {
            problems.push("tle.sources must list at least one URL".to_string());
        }
        if self.gateway.call_signs.is_empty() {
            problems.push("gateway.call_signs must list at least one recipient".to_string());
        }
        if self.gateway.transmitter_groups.is_empty() {
            problems.push("gateway.transmitter_groups must list at least one group".to_string());
        }
        if self.messages.prealert.contains("{el}") {
            problems.push("messages.prealert must not use {el}".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("{}", problems.join("; "))
        }
    }
}

impl ObserverConfig {
    pub fn observer(&self) -> Observer {
        Observer::new(self.latitude, self.longitude, self.altitude_m)
    }

    /// Fixed offset for message times, `None` for the system zone.
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|minutes| FixedOffset::east_opt(minutes * 60))
    }
}

impl TrackingConfig {
    pub fn tolerance(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tolerance_secs as i64)
    }

    pub fn prealert_offset(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.prealert_minutes as i64)
    }

    pub fn expire_grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.expire_grace_minutes as i64)
    }

    pub fn horizon(&self) -> chrono::Duration {
        chrono::Duration::hours(self.horizon_hours as i64)
    }
}
