//! Open Food Facts v2 product JSON → [`Product`].
//!
//! Blank or missing text fields fall back to placeholder strings; lifecycle
//! carbon comes from `ecoscore_data.agribalyse` when present.

use lunchbox_core::{Product, ProductCarbon};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct OffResponse {
    #[serde(default)]
    status: Value,
    product: Option<OffProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct OffProduct {
    product_name: Option<String>,
    brands: Option<String>,
    ecoscore_grade: Option<String>,
    ecoscore_score: Option<f64>,
    nutrition_grades: Option<String>,
    ingredients_text: Option<String>,
    origins: Option<String>,
    manufacturing_places: Option<String>,
    packaging: Option<String>,
    image_url: Option<String>,
    categories: Option<String>,
    ecoscore_data: Option<EcoscoreData>,
}

#[derive(Debug, Default, Deserialize)]
struct EcoscoreData {
    agribalyse: Option<Agribalyse>,
}

#[derive(Debug, Default, Deserialize)]
struct Agribalyse {
    co2_total: Option<f64>,
    ef_total: Option<f64>,
    co2_agriculture: Option<f64>,
    co2_processing: Option<f64>,
    co2_packaging: Option<f64>,
    co2_transportation: Option<f64>,
    co2_distribution: Option<f64>,
    co2_consumption: Option<f64>,
}

impl OffResponse {
    /// `None` when Open Food Facts reports the product as unknown.
    pub fn into_product(self, barcode: &str) -> Option<Product> {
        if status_is_failure(&self.status) {
            return None;
        }
        self.product.map(|p| to_product(barcode, p))
    }
}

fn status_is_failure(status: &Value) -> bool {
    match status {
        Value::Number(n) => n.as_i64() == Some(0),
        Value::String(s) => s == "failure",
        _ => false,
    }
}

fn to_product(barcode: &str, p: OffProduct) -> Product {
    let carbon_footprint = p
        .ecoscore_data
        .and_then(|d| d.agribalyse)
        .map(|a| ProductCarbon {
            co2_total: round2(a.co2_total.or(a.ef_total)),
            co2_agriculture: round2(a.co2_agriculture),
            co2_processing: round2(a.co2_processing),
            co2_packaging: round2(a.co2_packaging),
            co2_transportation: round2(a.co2_transportation),
            co2_distribution: round2(a.co2_distribution),
            co2_consumption: round2(a.co2_consumption),
        });

    Product {
        barcode: barcode.to_string(),
        name: text_or(p.product_name, "Unknown Product"),
        brand: text_or(p.brands, "Unknown Brand"),
        eco_score: text_or(p.ecoscore_grade, "unknown"),
        eco_score_value: p.ecoscore_score,
        nutri_score: text_or(p.nutrition_grades, "unknown"),
        ingredients: text_or(p.ingredients_text, "Not available"),
        origin: text_or(non_blank(p.origins).or(p.manufacturing_places), "Unknown"),
        packaging: text_or(p.packaging, "Not specified"),
        image_url: non_blank(p.image_url),
        categories: text_or(p.categories, "Not categorized"),
        carbon_footprint,
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

fn text_or(s: Option<String>, fallback: &str) -> String {
    non_blank(s).unwrap_or_else(|| fallback.to_string())
}

fn round2(v: Option<f64>) -> Option<f64> {
    v.map(|x| (x * 100.0).round() / 100.0)
}
