//! Per-user sustainability ledger arithmetic.
//!
//! [`apply_scan`] is the only transition. It is pure; stores are responsible
//! for running it under per-user serialization so two concurrent scans never
//! start from the same prior state.

use chrono::{DateTime, Duration, Utc};

use crate::types::{CarbonFootprint, UserLedger};

/// Share of an item's footprint counted as saved by not wasting it.
pub const WASTE_AVOIDED_FRACTION: f64 = 0.1;
pub const MAX_SCORE: u32 = 100;
const BASE_SCORE: u32 = 50;
const POINTS_PER_SCAN: u32 = 2;
const POINTS_PER_STREAK_DAY: u32 = 3;

/// Fold one successful scan at `now` into `ledger`.
///
/// A missing ledger starts from zero. A scan less than two whole days after
/// the previous one extends the streak, including repeat scans on the same
/// day; anything later restarts it at 1.
pub fn apply_scan(
    ledger: Option<UserLedger>,
    carbon: Option<&CarbonFootprint>,
    now: DateTime<Utc>,
) -> UserLedger {
    let mut ledger = ledger.unwrap_or_default();

    ledger.total_scans = ledger.total_scans.saturating_add(1);
    if let Some(fp) = carbon {
        ledger.total_carbon_saved += fp.co2e_per_kg * WASTE_AVOIDED_FRACTION;
    }

    ledger.current_streak = match ledger.last_scan_date {
        Some(last) if days_between(last, now) <= 1 => ledger.current_streak.saturating_add(1),
        _ => 1,
    };
    ledger.best_streak = ledger.best_streak.max(ledger.current_streak);
    ledger.last_scan_date = Some(now);
    ledger.sustainability_score = score(ledger.total_scans, ledger.current_streak);

    ledger
}

/// Whole days elapsed from `earlier` to `later`, rounded toward negative infinity.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier)
        .num_milliseconds()
        .div_euclid(Duration::days(1).num_milliseconds())
}

/// `min(100, 50 + 2 * total_scans + 3 * current_streak)`.
pub fn score(total_scans: u32, current_streak: u32) -> u32 {
    BASE_SCORE
        .saturating_add(total_scans.saturating_mul(POINTS_PER_SCAN))
        .saturating_add(current_streak.saturating_mul(POINTS_PER_STREAK_DAY))
        .min(MAX_SCORE)
}
