use async_trait::async_trait;
use std::fmt;

use crate::shape::StructuredShape;
use crate::Result;

/// Which deployment a task needs. Article writing gets the stronger model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelTier {
    #[default]
    Standard,
    Advanced,
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub expected_shape: StructuredShape,
    pub tier: ModelTier,
}

impl CompletionOptions {
    pub fn new(expected_shape: StructuredShape) -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
            expected_shape,
            tier: ModelTier::Standard,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn tier(mut self, tier: ModelTier) -> Self {
        self.tier = tier;
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Ask for output matching `options.expected_shape` and return the raw
    /// payload untouched. Parsing and validation happen on the caller's side.
    async fn complete_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String>;

    /// Generate an image and return its base64 encoded bytes.
    async fn generate_image(&self, prompt: &str) -> Result<String>;
}
