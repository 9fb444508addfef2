//! Offline model. Answers every task with canned heuristics unless a raw
//! response has been scripted for the task's shape, and records every call.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use ny_core::{CompletionOptions, Error, LanguageModel, ModelTier, Result};
use serde_json::json;

/// 1x1 RGBA PNG.
pub const PLACEHOLDER_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

const SWEDISH_MARKERS: &[&str] = &[
    "sweden", "swedish", "sverige", "svensk", "stockholm", "göteborg", "gothenburg", "malmö",
    "uppsala", "riksdag", "skåne", "norrland",
];

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub shape: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub tier: ModelTier,
}

pub struct DummyModel {
    scripted: Mutex<HashMap<String, VecDeque<String>>>,
    image: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
    image_prompts: Mutex<Vec<String>>,
}

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl Default for DummyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self {
            scripted: Mutex::new(HashMap::new()),
            image: Some(PLACEHOLDER_PNG_BASE64.to_string()),
            calls: Mutex::new(Vec::new()),
            image_prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a raw response for the next call requesting `shape`.
    pub fn with_response(self, shape: &str, raw: impl Into<String>) -> Self {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(shape.to_string())
            .or_default()
            .push_back(raw.into());
        self
    }

    /// Payload returned by `generate_image`; `None` simulates an empty response.
    pub fn with_image(mut self, payload: Option<String>) -> Self {
        self.image = payload;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn calls_for(&self, shape: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.shape == shape).collect()
    }

    pub fn image_prompts(&self) -> Vec<String> {
        self.image_prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn scripted_response(&self, shape: &str) -> Option<String> {
        self.scripted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(shape)
            .and_then(|queue| queue.pop_front())
    }

    fn canned_response(&self, shape: &str, user_prompt: &str) -> Result<String> {
        let response = match shape {
            "informationIsRelatedToSweden" => {
                let lower = user_prompt.to_lowercase();
                let related = SWEDISH_MARKERS.iter().any(|m| lower.contains(m));
                json!({ "isRelatedToSweden": related })
            }
            "classifyNewsValue" => {
                let words = between(user_prompt, "ARTICLE:\n", "\nEND OF ARTICLE.")
                    .unwrap_or(user_prompt)
                    .split_whitespace()
                    .count();
                json!({ "newsValue": (words as f64 / 50.0).min(10.0).round() })
            }
            "getNewsArticleInformation" => {
                let text = between(user_prompt, "INFORMATION: ", " END OF INFORMATION.")
                    .unwrap_or(user_prompt)
                    .trim();
                let headline: Vec<&str> = text.split_whitespace().take(8).collect();
                json!({
                    "body": text,
                    "headline": headline.join(" "),
                    "category": "News",
                    "imagePrompt": format!("A neutral editorial illustration of: {}", headline.join(" ")),
                    "socialMediaHook": format!("📰 {}", headline.join(" ")),
                })
            }
            "getTranslation" => json!({
                "headline": between(user_prompt, "HEADLINE\n", "\nEND OF HEADLINE").unwrap_or_default(),
                "category": between(user_prompt, "CATEGORY\n", "\nEND OF CATEGORY").unwrap_or_default(),
                "body": between(user_prompt, "ARTICLE:\n", "\nEND OF ARTICLE").unwrap_or_default(),
            }),
            "bestArticleToPublish" => json!({
                "articleId": 0,
                "socialMediaHook": "📰 Read the latest story",
            }),
            other => {
                return Err(Error::MalformedResponse(format!(
                    "Dummy model has no answer for shape {}",
                    other
                )))
            }
        };
        Ok(response.to_string())
    }
}

fn between<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = text.find(start)? + start.len();
    let to = text[from..].find(end)? + from;
    Some(&text[from..to])
}

#[async_trait]
impl LanguageModel for DummyModel {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn complete_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let shape = options.expected_shape.name;
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                shape: shape.to_string(),
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
                temperature: options.temperature,
                max_tokens: options.max_tokens,
                tier: options.tier,
            });

        match self.scripted_response(shape) {
            Some(raw) => Ok(raw),
            None => self.canned_response(shape, user_prompt),
        }
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        self.image_prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        self.image
            .clone()
            .ok_or_else(|| Error::ImageGenerationFailed("No image payload in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts;

    #[tokio::test]
    async fn test_scripted_responses_are_consumed_in_order() {
        let model = DummyModel::new()
            .with_response("classifyNewsValue", "{\"newsValue\": 1}")
            .with_response("classifyNewsValue", "{\"newsValue\": 2}");
        let options = CompletionOptions::new(prompts::news_value_shape());

        assert_eq!(model.complete_text("s", "u", &options).await.unwrap(), "{\"newsValue\": 1}");
        assert_eq!(model.complete_text("s", "u", &options).await.unwrap(), "{\"newsValue\": 2}");
        // Falls back to the canned heuristic once the script runs out.
        assert!(model.complete_text("s", "u", &options).await.unwrap().contains("newsValue"));
        assert_eq!(model.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_canned_relevance() {
        let model = DummyModel::new();
        let options = CompletionOptions::new(prompts::relevance_shape());

        let raw = model
            .complete_text("s", &prompts::relevance_message("Stormen drog in över Skåne"), &options)
            .await
            .unwrap();
        assert_eq!(raw, "{\"isRelatedToSweden\":true}");

        let raw = model
            .complete_text("s", &prompts::relevance_message("Rain in Lisbon"), &options)
            .await
            .unwrap();
        assert_eq!(raw, "{\"isRelatedToSweden\":false}");
    }

    #[tokio::test]
    async fn test_missing_image() {
        let model = DummyModel::new().with_image(None);
        let err = model.generate_image("a lighthouse").await.unwrap_err();
        assert!(matches!(err, Error::ImageGenerationFailed(_)));
        assert_eq!(model.image_prompts(), vec!["a lighthouse".to_string()]);
    }

    #[test]
    fn test_between() {
        assert_eq!(between("HEADLINE\nHi\nEND OF HEADLINE", "HEADLINE\n", "\nEND OF HEADLINE"), Some("Hi"));
        assert_eq!(between("nothing", "HEADLINE\n", "\nEND"), None);
    }
}
