//! OpenRouter chat-completions client, used as the recipe fallback.

use std::time::Duration;

use async_trait::async_trait;
use lunchbox_core::Recipe;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prompts::{RECIPES_SYSTEM_PROMPT, recipes_prompt};
use crate::{AnalyzerError, RecipeGenerator, parse};

const REFERER: &str = "https://lunchbox-app.com";
const APP_TITLE: &str = "LunchBox";

pub struct OpenRouterClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenRouterClient {
    /// `base_url` should be like `https://openrouter.ai/api/v1` (no trailing slash needed).
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

    /// Send one system + user exchange and return the reply text.
    pub async fn chat(&self, system: Option<&str>, prompt: &str) -> Result<String, AnalyzerError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(Message {
                role: "system",
                content: system,
            });
        }
        messages.push(Message {
            role: "user",
            content: prompt,
        });

        let url = format!("{}/chat/completions", self.base_url);
        info!(model = %self.model, "calling openrouter");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .json(&ChatRequest {
                model: &self.model,
                messages,
            })
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
        let reply: ChatResponse = resp.json().await?;
        first_choice_text(reply).ok_or(AnalyzerError::EmptyResponse)
    }
}

fn first_choice_text(reply: ChatResponse) -> Option<String> {
    reply.choices.into_iter().next()?.message.content
}

#[async_trait]
impl RecipeGenerator for OpenRouterClient {
    async fn generate_recipes(&self, items: &[String]) -> Result<Vec<Recipe>, AnalyzerError> {
        let text = self
            .chat(Some(RECIPES_SYSTEM_PROMPT), &recipes_prompt(items))
            .await?;
        parse::parse_recipes(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_trims_trailing_slash() {
        let client = OpenRouterClient::new(
            "https://openrouter.ai/api/v1/".into(),
            "m".into(),
            "k".into(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn request_shape() {
        let req = ChatRequest {
            model: "google/gemini-2.5-flash-preview",
            messages: vec![
                Message {
                    role: "system",
                    content: "be brief",
                },
                Message {
                    role: "user",
                    content: "hi",
                },
            ],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn first_choice_extracted() {
        let reply: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "[]"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(reply).as_deref(), Some("[]"));
    }

    #[test]
    fn no_choices_is_none() {
        let reply: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(first_choice_text(reply).is_none());
    }
}
