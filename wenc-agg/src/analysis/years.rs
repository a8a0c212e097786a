//! Year extraction for the timeline histogram
//!
//! Approximate: any run of exactly four ASCII digits counts, whether or not
//! it is really a year ("1500 metres" yields 1500).

use std::ops::RangeInclusive;

/// Four-digit numbers in `text` that fall inside `plausible`
///
/// A candidate must be a maximal run of exactly four ASCII digits, i.e.
/// bounded on both sides by a non-digit or the text edge. Years are returned
/// in order of appearance; duplicates are kept so a histogram can count them.
pub fn extract_years(text: &str, plausible: RangeInclusive<i32>) -> Vec<i32> {
    let bytes = text.as_bytes();
    let mut years = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i - start != 4 {
            continue;
        }
        // ASCII digits are single bytes, so this slice is on char boundaries
        if let Ok(year) = text[start..i].parse::<i32>() {
            if plausible.contains(&year) {
                years.push(year);
            }
        }
    }
    years
}

/// Plausible range relative to `current_year`: from year 1 to next year
pub fn plausible_range(current_year: i32) -> RangeInclusive<i32> {
    1..=current_year.saturating_add(1)
}
