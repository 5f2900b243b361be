//! Plain-text element set parser
//!
//! Sources such as the AMSAT `nasa.all` bulletin or CelesTrak group files
//! carry three-line records, sometimes surrounded by free-form text.

use super::types::TleRecord;

fn is_data_line(line: &str, number: char) -> bool {
    let mut chars = line.chars();
    chars.next() == Some(number) && chars.next() == Some(' ')
}

/// Extract every `(name, line 1, line 2)` triple from `text`.
///
/// Lines that do not belong to a complete triple are skipped.
pub fn parse_records(text: &str) -> Vec<TleRecord> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut records = Vec::new();
    let mut i = 0;

    while i + 2 < lines.len() {
        let name = lines[i];
        let line1 = lines[i + 1];
        let line2 = lines[i + 2];

        let name_ok = !name.is_empty() && !is_data_line(name, '1') && !is_data_line(name, '2');
        if name_ok && is_data_line(line1, '1') && is_data_line(line2, '2') {
            records.push(TleRecord::new(name, line1, line2));
            i += 3;
        } else {
            i += 1;
        }
    }

    records
}

/// First record whose name line contains `object_name` (case-insensitive)
/// or whose catalog number is `catalog_number`.
pub fn select_record<'a>(
    records: &'a [TleRecord],
    object_name: &str,
    catalog_number: u64,
) -> Option<&'a TleRecord> {
    let wanted = object_name.trim().to_uppercase();

    records.iter().find(|record| {
        (!wanted.is_empty() && record.name.to_uppercase().contains(&wanted))
            || record.catalog_number() == Some(catalog_number)
    })
}
