//! Fixed-width TLE text parser.
//!
//! Input is the catalog's `format/tle` output: two lines per object, no name
//! line and no blank separators. Parsing never fails as a whole; a malformed
//! pair is logged and skipped.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use sentinel_common::{NoradId, TleRecord};

/// Parse raw catalog text into at most `limit` records in source order.
///
/// `now` replaces any epoch that cannot be decoded.
pub fn parse_tle_text(text: &str, limit: usize, now: DateTime<Utc>) -> Vec<TleRecord> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut records = Vec::with_capacity(limit.min(lines.len() / 2));
    let mut skipped = 0usize;

    for pair in lines.chunks_exact(2) {
        if records.len() >= limit {
            break;
        }
        match parse_pair(pair[0], pair[1], now) {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} malformed TLE pairs", skipped);
    }
    tracing::info!("Parsed {} satellites from TLE data", records.len());
    records
}

fn parse_pair(line1: &str, line2: &str, now: DateTime<Utc>) -> Option<TleRecord> {
    if !line1.starts_with("1 ") || !line2.starts_with("2 ") {
        tracing::warn!("Invalid TLE line prefixes: {:?} / {:?}", prefix(line1), prefix(line2));
        return None;
    }

    let Some(norad_id) = parse_norad_id(line1) else {
        tracing::warn!("Could not parse NORAD ID from line: {}", line1);
        return None;
    };

    let epoch = match line1.get(18..32).and_then(parse_tle_epoch) {
        Some(epoch) => epoch,
        None => {
            tracing::warn!("Could not parse epoch for NORAD {}, using current time", norad_id);
            now
        }
    };

    let mut record = TleRecord {
        norad_id,
        name: String::new(),
        line1: line1.to_string(),
        line2: line2.to_string(),
        epoch,
    };
    record.name = synthesize_name(&record);
    Some(record)
}

fn prefix(line: &str) -> String {
    line.chars().take(8).collect()
}

/// NORAD catalog number, line 1 columns 3-7
fn parse_norad_id(line1: &str) -> Option<NoradId> {
    line1.get(2..7)?.trim().parse().ok()
}

/// Decode a `YYDDD.DDDDDDDD` epoch.
///
/// Two-digit years below 57 are 20xx, the rest 19xx. Day-of-year is 1-based.
pub fn parse_tle_epoch(field: &str) -> Option<DateTime<Utc>> {
    let field = field.trim();
    let year: i32 = field.get(..2)?.parse().ok()?;
    let day: f64 = field.get(2..)?.trim().parse().ok()?;

    let year = if year < 57 { 2000 + year } else { 1900 + year };
    let days_in_year = NaiveDate::from_ymd_opt(year, 12, 31)?.ordinal();
    if !(1.0..f64::from(days_in_year) + 1.0).contains(&day) {
        return None;
    }

    let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single()?;
    let offset_us = ((day - 1.0) * 86_400_000_000.0).round() as i64;

    start.checked_add_signed(Duration::microseconds(offset_us))
}

/// Name for records delivered without a name line, bucketed by orbit shape.
fn synthesize_name(record: &TleRecord) -> String {
    let id = record.norad_id;
    let inclination = record.inclination_deg();
    let mean_motion = record.mean_motion();

    match (inclination, mean_motion) {
        (Some(inc), Some(mm)) if (51.0..=52.0).contains(&inc) && (15.2..=15.8).contains(&mm) => {
            format!("CREW-ORBIT-{}", id)
        }
        (Some(inc), _) if (80.0..=110.0).contains(&inc) => format!("POLAR-{}", id),
        (Some(inc), _) if inc < 5.0 => format!("EQUATORIAL-{}", id),
        _ => format!("SATELLITE-{}", id),
    }
}
