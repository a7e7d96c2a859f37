//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use lunchbox_core::{Analysis, Detection, Recipe};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prompts::{ANALYZE_PROMPT, LIVE_PROMPT, RECIPES_SYSTEM_PROMPT, recipes_prompt};
use crate::{Analyzer, AnalyzerError, RecipeGenerator, parse};

const IMAGE_MIME: &str = "image/jpeg";

/// Analyzer and recipe generator backed by Google's Gemini REST API.
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

// ── Wire types ──

#[derive(Serialize)]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Image { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

impl GeminiClient {
    /// `base_url` is the API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, AnalyzerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, request: &GenerateRequest<'_>) -> Result<String, AnalyzerError> {
        let url = self.endpoint();
        info!(model = %self.model, "calling gemini");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalyzerError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let reply: GenerateResponse = resp.json().await?;
        reply.text().ok_or(AnalyzerError::EmptyResponse)
    }

    async fn generate_with_image(
        &self,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, AnalyzerError> {
        let request = GenerateRequest {
            system_instruction: None,
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::Image {
                        inline_data: InlineData {
                            mime_type: IMAGE_MIME,
                            data: image_base64,
                        },
                    },
                ],
            }],
        };
        self.generate(&request).await
    }
}

#[async_trait]
impl Analyzer for GeminiClient {
    async fn analyze(&self, image_base64: &str) -> Result<Analysis, AnalyzerError> {
        let text = self.generate_with_image(ANALYZE_PROMPT, image_base64).await?;
        let analysis = parse::parse_analysis(&text)?;
        info!(item = %analysis.item_name, score = analysis.freshness_score, "image analysed");
        Ok(analysis)
    }

    async fn analyze_live(&self, image_base64: &str) -> Result<Vec<Detection>, AnalyzerError> {
        let text = self.generate_with_image(LIVE_PROMPT, image_base64).await?;
        parse::parse_detections(&text)
    }
}

#[async_trait]
impl RecipeGenerator for GeminiClient {
    async fn generate_recipes(&self, items: &[String]) -> Result<Vec<Recipe>, AnalyzerError> {
        let prompt = recipes_prompt(items);
        let request = GenerateRequest {
            system_instruction: Some(Content {
                parts: vec![Part::Text {
                    text: RECIPES_SYSTEM_PROMPT,
                }],
            }),
            contents: vec![Content {
                parts: vec![Part::Text { text: &prompt }],
            }],
        };
        let text = self.generate(&request).await?;
        let recipes = parse::parse_recipes(&text)?;
        info!(count = recipes.len(), "recipes generated");
        Ok(recipes)
    }
}
