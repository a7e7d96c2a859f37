//! Carbon reference table and item matcher.
//!
//! Maps a free-text item name onto a per-kilogram CO2e factor using a
//! permissive substring test in both directions. The first entry in table
//! order wins, so the table order is part of the matching contract:
//!
//! - "Bananas " → `banana` (input contains the canonical name)
//! - "egg" → `eggs` (canonical name contains the input)

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CarbonTableError;
use crate::types::CarbonFootprint;

const BUILTIN_TABLE: &str = include_str!("../data/carbon-footprints.json");

/// Average passenger car, km driven per kg CO2e.
const KM_PER_KG_CO2E: f64 = 6.2;
/// Smartphone full charges per kg CO2e.
const PHONE_CHARGES_PER_KG_CO2E: f64 = 130.0;
const LOW_IMPACT_BELOW: f64 = 1.0;
const MEDIUM_IMPACT_BELOW: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonEntry {
    /// Lowercase canonical name.
    pub item: String,
    pub co2e_per_kg: f64,
    pub category: String,
}

/// Immutable, ordered set of reference entries.
#[derive(Debug, Clone, Default)]
pub struct CarbonTable {
    entries: Vec<CarbonEntry>,
}

impl CarbonTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, CarbonTableError> {
        Self::from_json(BUILTIN_TABLE)
    }

    /// A table that matches nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON array of `{item, co2e_per_kg, category}` objects.
    pub fn from_json(json: &str) -> Result<Self, CarbonTableError> {
        let entries: Vec<CarbonEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    pub fn from_path(path: &Path) -> Result<Self, CarbonTableError> {
        let json = std::fs::read_to_string(path).map_err(|source| CarbonTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build a table, normalising names and rejecting unusable factors.
    ///
    /// Entries keep their given order.
    pub fn from_entries(entries: Vec<CarbonEntry>) -> Result<Self, CarbonTableError> {
        let mut normalized = Vec::with_capacity(entries.len());
        for (pos, mut entry) in entries.into_iter().enumerate() {
            entry.item = normalize(&entry.item);
            if entry.item.is_empty() {
                return Err(CarbonTableError::EmptyItem(pos));
            }
            if !entry.co2e_per_kg.is_finite() || entry.co2e_per_kg < 0.0 {
                return Err(CarbonTableError::InvalidFactor {
                    item: entry.item,
                    value: entry.co2e_per_kg,
                });
            }
            normalized.push(entry);
        }

        let table = Self {
            entries: normalized,
        };
        for (earlier, later) in table.shadowed() {
            warn!(earlier = %earlier, later = %later, "carbon entry can never match by exact name");
        }
        Ok(table)
    }

    pub fn entries(&self) -> &[CarbonEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs `(earlier, later)` where looking up `later` by its exact name
    /// returns `earlier` because of first-match ordering.
    pub fn shadowed(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (i, later) in self.entries.iter().enumerate() {
            if let Some(earlier) = self.entries[..i]
                .iter()
                .find(|e| names_overlap(&later.item, &e.item))
            {
                pairs.push((earlier.item.clone(), later.item.clone()));
            }
        }
        pairs
    }

    /// First entry, in table order, whose name overlaps `item_name`.
    pub fn lookup(&self, item_name: &str) -> Option<&CarbonEntry> {
        let needle = normalize(item_name);
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| names_overlap(&needle, &entry.item))
    }

    /// Match `item_name` and derive its footprint. `None` means unknown.
    pub fn match_item(&self, item_name: &str) -> Option<CarbonFootprint> {
        match self.lookup(item_name) {
            Some(entry) => Some(footprint(entry)),
            None => {
                debug!(item = item_name, "no carbon reference entry");
                None
            }
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn names_overlap(needle: &str, canonical: &str) -> bool {
    needle.contains(canonical) || canonical.contains(needle)
}

/// Derive the footprint, with comparison text, for a matched entry.
pub fn footprint(entry: &CarbonEntry) -> CarbonFootprint {
    CarbonFootprint {
        item: entry.item.clone(),
        co2e_per_kg: entry.co2e_per_kg,
        category: entry.category.clone(),
        comparison: comparison(entry.co2e_per_kg),
        driving_equivalent_km: driving_equivalent_km(entry.co2e_per_kg),
    }
}

/// Kilometres driven in an average car for the same emissions, 1 decimal.
pub fn driving_equivalent_km(co2e_per_kg: f64) -> f64 {
    (co2e_per_kg * KM_PER_KG_CO2E * 10.0).round() / 10.0
}

/// Human-readable impact band for a per-kg factor.
pub fn comparison(co2e_per_kg: f64) -> String {
    let km = driving_equivalent_km(co2e_per_kg);
    if co2e_per_kg < LOW_IMPACT_BELOW {
        let charges = (co2e_per_kg * PHONE_CHARGES_PER_KG_CO2E).round() as i64;
        format!("Low impact: equivalent to charging your phone {charges} times")
    } else if co2e_per_kg < MEDIUM_IMPACT_BELOW {
        format!("Medium impact: equivalent to driving {km} km")
    } else {
        format!("High impact: equivalent to driving {km} km")
    }
}
