//! Pure enrichment step: analyzer output + carbon match → unsaved scan record.

use chrono::{DateTime, Utc};

use crate::carbon::CarbonTable;
use crate::types::{Analysis, ScanRecord};

/// Build the in-memory scan record for `analysis`. No I/O; `id` is left unset.
pub fn enrich(analysis: Analysis, table: &CarbonTable, now: DateTime<Utc>) -> ScanRecord {
    let carbon_footprint = table.match_item(&analysis.item_name);
    ScanRecord {
        id: None,
        item_name: analysis.item_name,
        category: analysis.category,
        freshness_score: analysis.freshness_score,
        freshness_description: analysis.freshness_description,
        estimated_days_remaining: analysis.estimated_days_remaining,
        storage_tips: analysis.storage_tips,
        visual_indicators: analysis.visual_indicators,
        sustainable_alternative: analysis.sustainable_alternative,
        carbon_footprint,
        created_at: now,
    }
}
