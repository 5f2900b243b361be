//! Pager message text
//!
//! Receivers are narrowband POCSAG pagers, so output is restricted to
//! ASCII: accented Latin letters are transliterated and anything else
//! becomes `?`.

use chrono::{DateTime, FixedOffset, Local, Utc};

use super::window::Milestone;
use crate::config::{AppConfig, MessageTemplates};
use crate::module::geometry::LookAngles;

/// Zone in which message times are shown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalZone {
    System,
    Fixed(FixedOffset),
}

impl LocalZone {
    pub fn from_offset(offset: Option<FixedOffset>) -> Self {
        offset.map_or(LocalZone::System, LocalZone::Fixed)
    }

    /// Hour and minute of `at` in this zone, e.g. "21:07".
    pub fn format_hm(&self, at: DateTime<Utc>) -> String {
        self.format(at, "%H:%M")
    }

    pub fn format(&self, at: DateTime<Utc>, pattern: &str) -> String {
        match self {
            LocalZone::System => at.with_timezone(&Local).format(pattern).to_string(),
            LocalZone::Fixed(offset) => at.with_timezone(offset).format(pattern).to_string(),
        }
    }
}

pub struct Composer {
    object_name: String,
    lead_minutes: u64,
    templates: MessageTemplates,
    zone: LocalZone,
}

impl Composer {
    pub fn new(object_name: impl Into<String>, lead_minutes: u64, templates: MessageTemplates, zone: LocalZone) -> Self {
        Self {
            object_name: object_name.into(),
            lead_minutes,
            templates,
            zone,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.tracking.object_name.clone(),
            config.tracking.prealert_minutes,
            config.messages.clone(),
            LocalZone::from_offset(config.observer.fixed_offset()),
        )
    }

    pub fn zone(&self) -> LocalZone {
        self.zone
    }

    /// Message for `milestone`, describing the object at `at`.
    ///
    /// The pre-alert carries azimuth only; the others add elevation.
    /// Angles are rounded to whole degrees.
    pub fn compose(&self, milestone: Milestone, at: DateTime<Utc>, look: LookAngles) -> String {
        let azimuth = (look.azimuth_deg.round() as i64).rem_euclid(360);
        let template = match milestone {
            Milestone::Prealert => &self.templates.prealert,
            Milestone::Start => &self.templates.start,
            Milestone::Peak => &self.templates.peak,
            Milestone::End => &self.templates.end,
        };

        let mut text = template
            .replace("{object}", &self.object_name)
            .replace("{lead}", &self.lead_minutes.to_string())
            .replace("{time}", &self.zone.format_hm(at))
            .replace("{az}", &azimuth.to_string());

        if milestone != Milestone::Prealert {
            let elevation = look.elevation_deg.round() as i64;
            text = text.replace("{el}", &elevation.to_string());
        }

        to_pager_ascii(&text)
    }
}

/// Force `text` into the pager character set.
pub fn to_pager_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
            continue;
        }
        let replacement = match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
            'è' | 'é' | 'ê' | 'ë' => "e",
            'È' | 'É' | 'Ê' | 'Ë' => "E",
            'ì' | 'í' | 'î' | 'ï' => "i",
            'Ì' | 'Í' | 'Î' | 'Ï' => "I",
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' => "o",
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "O",
            'ù' | 'ú' | 'û' | 'ü' => "u",
            'Ù' | 'Ú' | 'Û' | 'Ü' => "U",
            'ý' | 'ÿ' => "y",
            'Ý' => "Y",
            'ç' => "c",
            'Ç' => "C",
            'ñ' => "n",
            'Ñ' => "N",
            'œ' => "oe",
            'Œ' => "OE",
            'æ' => "ae",
            'Æ' => "AE",
            'ß' => "ss",
            '°' => " deg",
            '\u{2013}' | '\u{2014}' => "-",
            '\u{2018}' | '\u{2019}' => "'",
            '\u{201C}' | '\u{201D}' => "\"",
            '\u{00A0}' => " ",
            _ => "?",
        };
        out.push_str(replacement);
    }

    out
}
