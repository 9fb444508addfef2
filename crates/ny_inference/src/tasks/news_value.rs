use std::sync::Arc;

use ny_core::{CompletionOptions, LanguageModel, NewsValueScore, Result};

use crate::prompts;

pub struct NewsValueScorer {
    model: Arc<dyn LanguageModel>,
}

impl NewsValueScorer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn score(&self, text: &str) -> Result<NewsValueScore> {
        let options = CompletionOptions::new(prompts::news_value_shape())
            .temperature(prompts::TEMPERATURE)
            .max_tokens(prompts::CLASSIFICATION_MAX_TOKENS);

        super::invoke_structured(
            self.model.as_ref(),
            prompts::PROMPT_ASSISTANT,
            &prompts::news_value_message(text),
            options,
        )
        .await
    }
}
