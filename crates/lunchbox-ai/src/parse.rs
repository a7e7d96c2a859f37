//! Decoding of model replies.
//!
//! Models are told to answer with bare JSON but regularly wrap it in
//! markdown fences anyway, so every reply goes through [`strip_code_fences`].

use lunchbox_core::{Analysis, Detection, Recipe};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::AnalyzerError;

/// Trim `text` and remove one leading ```` ```json ```` / ```` ``` ```` fence
/// and one trailing ```` ``` ```` fence, if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .trim_end()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Parse and validate a single-item analysis.
pub fn parse_analysis(text: &str) -> Result<Analysis, AnalyzerError> {
    let body = non_empty(text)?;
    let analysis: Analysis = serde_json::from_str(body)?;
    analysis.validate()?;
    Ok(analysis)
}

#[derive(Deserialize)]
struct LiveReply {
    #[serde(default)]
    detections: Vec<Value>,
}

/// Parse a live-detection reply. A missing `detections` key means none.
///
/// Entries are decoded one at a time; a malformed entry is skipped without
/// discarding the rest.
pub fn parse_detections(text: &str) -> Result<Vec<Detection>, AnalyzerError> {
    let body = non_empty(text)?;
    let reply: LiveReply = serde_json::from_str(body)?;
    let detections = reply
        .detections
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Detection>(entry) {
            Ok(detection) => Some(detection),
            Err(e) => {
                debug!(error = %e, "skipping malformed detection");
                None
            }
        })
        .collect();
    Ok(detections)
}

pub fn parse_recipes(text: &str) -> Result<Vec<Recipe>, AnalyzerError> {
    let body = non_empty(text)?;
    Ok(serde_json::from_str(body)?)
}

fn non_empty(text: &str) -> Result<&str, AnalyzerError> {
    let body = strip_code_fences(text);
    if body.is_empty() {
        Err(AnalyzerError::EmptyResponse)
    } else {
        Ok(body)
    }
}
