//! Shared scan types exchanged between the analyzer, lookup, store and host crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AnalysisError;

/// Owner of a ledger and a scan history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier assigned by the store when a scan is appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(Uuid);

impl ScanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ── Analyzer output ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainableAlternative {
    pub name: String,
    pub reason: String,
    pub carbon_savings_percent: f64,
}

/// Freshness assessment of a single item, as returned by the image analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub item_name: String,
    pub category: String,
    /// 1-10, 10 is perfectly fresh.
    #[serde(deserialize_with = "lenient::score")]
    pub freshness_score: u8,
    pub freshness_description: String,
    #[serde(deserialize_with = "lenient::days")]
    pub estimated_days_remaining: i32,
    #[serde(default)]
    pub storage_tips: Vec<String>,
    #[serde(default)]
    pub visual_indicators: Vec<String>,
    #[serde(default)]
    pub sustainable_alternative: Option<SustainableAlternative>,
}

impl Analysis {
    /// Reject output that does not identify an item.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.item_name.trim().is_empty() {
            return Err(AnalysisError::NoItem);
        }
        if !(1..=10).contains(&self.freshness_score) {
            return Err(AnalysisError::FreshnessOutOfRange(self.freshness_score));
        }
        Ok(())
    }
}

/// One produce item found by live detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub item_name: String,
    pub category: String,
    #[serde(deserialize_with = "lenient::score")]
    pub freshness_score: u8,
    pub freshness_description: String,
    #[serde(deserialize_with = "lenient::days")]
    pub estimated_days_remaining: i32,
    /// `[y_min, x_min, y_max, x_max]`, normalised to 0-1000.
    #[serde(rename = "box", deserialize_with = "lenient::bbox")]
    pub bbox: [u16; 4],
}

// ── Enriched scan ──

/// Carbon estimate attached to a scan. Only exists inside a [`ScanRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonFootprint {
    pub item: String,
    pub co2e_per_kg: f64,
    pub category: String,
    pub comparison: String,
    pub driving_equivalent_km: f64,
}

/// An enriched scan. `id` stays `None` when the scan was never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Option<ScanId>,
    pub item_name: String,
    pub category: String,
    pub freshness_score: u8,
    pub freshness_description: String,
    pub estimated_days_remaining: i32,
    pub storage_tips: Vec<String>,
    pub visual_indicators: Vec<String>,
    pub sustainable_alternative: Option<SustainableAlternative>,
    pub carbon_footprint: Option<CarbonFootprint>,
    pub created_at: DateTime<Utc>,
}

/// Running sustainability profile of one user.
///
/// Only [`crate::ledger::apply_scan`] mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserLedger {
    pub total_scans: u32,
    pub total_carbon_saved: f64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub last_scan_date: Option<DateTime<Utc>>,
    pub sustainability_score: u32,
}

// ── Product lookup ──

/// Lifecycle CO2 breakdown (kg CO2e per kg of product), rounded to 2 decimals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCarbon {
    pub co2_total: Option<f64>,
    pub co2_agriculture: Option<f64>,
    pub co2_processing: Option<f64>,
    pub co2_packaging: Option<f64>,
    pub co2_transportation: Option<f64>,
    pub co2_distribution: Option<f64>,
    pub co2_consumption: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub barcode: String,
    pub name: String,
    pub brand: String,
    pub eco_score: String,
    pub eco_score_value: Option<f64>,
    pub nutri_score: String,
    pub ingredients: String,
    pub origin: String,
    pub packaging: String,
    pub image_url: Option<String>,
    pub categories: String,
    pub carbon_footprint: Option<ProductCarbon>,
}

// ── Recipes ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub carbon_savings: String,
    #[serde(default)]
    pub prep_time: String,
}

/// Model replies are loose with numbers: fractions, negatives and values
/// just outside the documented range all show up. These round and clamp
/// instead of rejecting the whole reply.
mod lenient {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;

    const BOX_MAX: f64 = 1000.0;

    fn finite<'de, D: Deserializer<'de>>(value: f64) -> Result<f64, D::Error> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(D::Error::custom("expected a finite number"))
        }
    }

    pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        let v = finite::<D>(f64::deserialize(d)?)?;
        Ok(v.round().clamp(1.0, 10.0) as u8)
    }

    pub fn days<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
        let v = finite::<D>(f64::deserialize(d)?)?;
        Ok(v.round().clamp(i32::MIN as f64, i32::MAX as f64) as i32)
    }

    pub fn bbox<'de, D: Deserializer<'de>>(d: D) -> Result<[u16; 4], D::Error> {
        let raw = <[f64; 4]>::deserialize(d)?;
        let mut out = [0u16; 4];
        for (slot, v) in out.iter_mut().zip(raw) {
            *slot = finite::<D>(v)?.round().clamp(0.0, BOX_MAX) as u16;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> Analysis {
        Analysis {
            item_name: "Banana".into(),
            category: "fruit".into(),
            freshness_score: 7,
            freshness_description: "Yellow with a few brown spots".into(),
            estimated_days_remaining: 3,
            storage_tips: vec!["Keep at room temperature".into()],
            visual_indicators: vec!["brown speckles".into()],
            sustainable_alternative: None,
        }
    }

    #[test]
    fn analysis_missing_lists_default_empty() {
        let json = r#"{
            "item_name": "Tomato",
            "category": "vegetable",
            "freshness_score": 8,
            "freshness_description": "Firm and red",
            "estimated_days_remaining": 5
        }"#;
        let parsed: Analysis = serde_json::from_str(json).unwrap();
        assert!(parsed.storage_tips.is_empty());
        assert!(parsed.visual_indicators.is_empty());
        assert!(parsed.sustainable_alternative.is_none());
    }

    #[test]
    fn validate_accepts_normal_analysis() {
        assert_eq!(analysis().validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_blank_item() {
        let mut a = analysis();
        a.item_name = "   ".into();
        assert_eq!(a.validate(), Err(AnalysisError::NoItem));
    }

    #[test]
    fn validate_rejects_out_of_range_score() {
        let mut a = analysis();
        a.freshness_score = 0;
        assert_eq!(a.validate(), Err(AnalysisError::FreshnessOutOfRange(0)));
        a.freshness_score = 11;
        assert_eq!(a.validate(), Err(AnalysisError::FreshnessOutOfRange(11)));
    }

    #[test]
    fn detection_uses_box_key() {
        let json = r#"{
            "item_name": "Red Apple",
            "category": "fruit",
            "freshness_score": 9,
            "freshness_description": "Crisp, shiny skin",
            "estimated_days_remaining": 10,
            "box": [200, 300, 600, 700]
        }"#;
        let parsed: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.bbox, [200, 300, 600, 700]);
        let back = serde_json::to_value(&parsed).unwrap();
        assert!(back.get("box").is_some());
    }

    #[test]
    fn fractional_and_out_of_range_numbers_are_rounded_and_clamped() {
        let json = r#"{
            "item_name": "Spinach",
            "category": "vegetable",
            "freshness_score": 10.6,
            "freshness_description": "Slightly wilted",
            "estimated_days_remaining": 2.5
        }"#;
        let parsed: Analysis = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.freshness_score, 10);
        assert_eq!(parsed.estimated_days_remaining, 3);
        assert_eq!(parsed.validate(), Ok(()));

        let low: Analysis =
            serde_json::from_str(&json.replace("10.6", "0").replace("2.5", "-1.4")).unwrap();
        assert_eq!(low.freshness_score, 1);
        assert_eq!(low.estimated_days_remaining, -1);
    }

    #[test]
    fn detection_box_is_clamped_to_grid() {
        let json = r#"{
            "item_name": "Tomato",
            "category": "vegetable",
            "freshness_score": 8,
            "freshness_description": "Firm",
            "estimated_days_remaining": 5,
            "box": [-3, 300, 600.5, 1200]
        }"#;
        let parsed: Detection = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.bbox, [0, 300, 601, 1000]);
    }

    #[test]
    fn non_numeric_score_is_rejected() {
        let json = r#"{
            "item_name": "Tomato",
            "category": "vegetable",
            "freshness_score": "very fresh",
            "freshness_description": "Firm",
            "estimated_days_remaining": 5
        }"#;
        assert!(serde_json::from_str::<Analysis>(json).is_err());
    }

    #[test]
    fn scan_id_serializes_as_uuid_string() {
        let id = ScanId::new();
        assert_eq!(serde_json::to_value(id).unwrap(), id.to_string());
    }

    #[test]
    fn user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }
}
