//! HTTP client for the Open Food Facts product API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;

use crate::off::OffResponse;
use crate::{Lookup, LookupError, ProductLookup, validate_barcode};

const USER_AGENT: &str = concat!("lunchbox/", env!("CARGO_PKG_VERSION"));

/// Product lookup against `{base_url}/api/v2/product/{barcode}.json`.
pub struct OpenFoodFactsClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenFoodFactsClient {
    /// `base_url` should be like `https://world.openfoodfacts.org` (no trailing slash).
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn product_url(&self, barcode: &str) -> String {
        format!("{}/api/v2/product/{barcode}.json", self.base_url)
    }
}

#[async_trait]
impl ProductLookup for OpenFoodFactsClient {
    async fn lookup(&self, barcode: &str) -> Result<Lookup, LookupError> {
        let code = validate_barcode(barcode)?;
        let url = self.product_url(code);

        info!(url = %url, "looking up product");
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            info!(barcode = code, "product not found");
            return Ok(Lookup::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LookupError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let reply: OffResponse = resp.json().await?;
        match reply.into_product(code) {
            Some(product) => {
                info!(barcode = code, name = %product.name, "product found");
                Ok(Lookup::Found(product))
            }
            None => {
                info!(barcode = code, "product not in database");
                Ok(Lookup::NotFound)
            }
        }
    }
}
