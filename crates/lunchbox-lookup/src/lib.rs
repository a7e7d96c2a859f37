//! Product lookup: barcode → product facts, eco grades and lifecycle CO2.

use async_trait::async_trait;
use lunchbox_core::Product;
use thiserror::Error;

pub mod off;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::OpenFoodFactsClient;

#[derive(Error, Debug)]
pub enum LookupError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid barcode '{0}': expected 1-32 digits")]
    InvalidBarcode(String),
}

/// Outcome of a lookup. An unknown barcode is a normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Product),
    NotFound,
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup(&self, barcode: &str) -> Result<Lookup, LookupError>;
}

/// Trimmed barcode if it is 1-32 ASCII digits.
pub fn validate_barcode(barcode: &str) -> Result<&str, LookupError> {
    let code = barcode.trim();
    if code.is_empty() || code.len() > 32 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LookupError::InvalidBarcode(barcode.to_string()));
    }
    Ok(code)
}
