//! Orbital element record types

use serde::{Deserialize, Serialize};

/// One three-line element set: name line plus the two data lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TleRecord {
    /// Identifier line, e.g. "ISS (ZARYA)"
    pub name: String,
    pub line1: String,
    pub line2: String,
}

impl TleRecord {
    pub fn new(name: impl Into<String>, line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            line1: line1.into(),
            line2: line2.into(),
        }
    }

    /// Catalog number from columns 3-7 of line 1.
    pub fn catalog_number(&self) -> Option<u64> {
        self.line1.get(2..7)?.trim().parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_number() {
        let record = TleRecord::new(
            "ISS (ZARYA)",
            "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927",
            "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537",
        );
        assert_eq!(record.catalog_number(), Some(25544));

        let short = TleRecord::new("X", "1 2", "2 2");
        assert_eq!(short.catalog_number(), None);
    }
}
