//! AI layer: image freshness analysis, live produce detection and
//! waste-reducing recipe suggestions.
//!
//! The traits are always available; the HTTP clients are behind the `http`
//! feature.

use async_trait::async_trait;
use lunchbox_core::{Analysis, AnalysisError, Detection, Recipe};
use thiserror::Error;

pub mod parse;
#[cfg_attr(not(feature = "http"), allow(dead_code))]
mod prompts;

#[cfg(feature = "http")]
mod gemini;
#[cfg(feature = "http")]
pub use gemini::GeminiClient;

#[cfg(feature = "http")]
mod openrouter;
#[cfg(feature = "http")]
pub use openrouter::OpenRouterClient;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model returned no text")]
    EmptyResponse,
    #[error("analysis failed: {0}")]
    AnalysisFailed(#[from] AnalysisError),
}

/// Turns a photo into a freshness assessment.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Assess the single most prominent item in a base64 JPEG.
    async fn analyze(&self, image_base64: &str) -> Result<Analysis, AnalyzerError>;

    /// Locate up to five produce items with bounding boxes.
    async fn analyze_live(&self, image_base64: &str) -> Result<Vec<Detection>, AnalyzerError>;
}

/// Suggests recipes that use up items close to expiry.
#[async_trait]
pub trait RecipeGenerator: Send + Sync {
    async fn generate_recipes(&self, items: &[String]) -> Result<Vec<Recipe>, AnalyzerError>;
}
