use std::time::Duration;

pub mod models;
pub mod prompts;
pub mod tasks;

pub use models::create_model;
pub use tasks::{ArticleGenerator, Editor, NewsValueScorer, RelevanceChecker, Translator};

pub const DEFAULT_AZURE_API_VERSION: &str = "2024-11-01-preview";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFlavor {
    Azure { api_version: String },
    OpenAi,
}

impl Default for ApiFlavor {
    fn default() -> Self {
        Self::Azure {
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub flavor: ApiFlavor,
    pub api_key: Option<String>,
    pub endpoint: String,
    /// Deployment (Azure) or model name (OpenAI) for classification and translation.
    pub deployment: String,
    /// Used for article writing when set.
    pub advanced_deployment: Option<String>,
    pub image_deployment: String,
    pub image_size: String,
    pub max_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            flavor: ApiFlavor::default(),
            api_key: None,
            endpoint: String::new(),
            deployment: "gpt-35-turbo".to_string(),
            advanced_deployment: None,
            image_deployment: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            max_attempts: 3,
            request_timeout: Duration::from_secs(60),
        }
    }
}

pub mod prelude {
    pub use super::models::{create_model, DummyModel, OpenAiModel};
    pub use super::tasks::*;
    pub use super::{ApiFlavor, InferenceConfig};
    pub use ny_core::{Article, Error, NewsValueScore, RelevanceDecision, Result, Translation};
}
