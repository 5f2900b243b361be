//! Two-line orbital element records
//!
//! Fetches element sets from plain-text sources in priority order and
//! picks the record of the tracked object.

pub mod types;
pub mod parser;
pub mod fetcher;

pub use types::TleRecord;
pub use parser::{parse_records, select_record};
pub use fetcher::TleFetcher;
