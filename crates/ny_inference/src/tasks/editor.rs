use std::sync::Arc;

use ny_core::{Article, ArticleChoice, CompletionOptions, Error, LanguageModel, NewsValueScore, Result};

use crate::prompts;

/// Picks the next article to publish among several candidates.
pub struct Editor {
    model: Arc<dyn LanguageModel>,
}

impl Editor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn best_article(&self, candidates: &[(Article, NewsValueScore)]) -> Result<ArticleChoice> {
        if candidates.is_empty() {
            return Err(Error::Config("No candidate articles to choose from".to_string()));
        }

        let summary: Vec<(String, String, f64)> = candidates
            .iter()
            .map(|(a, score)| (a.headline.clone(), a.social_media_hook.clone(), score.value()))
            .collect();

        let options = CompletionOptions::new(prompts::best_article_shape())
            .temperature(prompts::TEMPERATURE)
            .max_tokens(prompts::CLASSIFICATION_MAX_TOKENS);

        let choice: ArticleChoice = super::invoke_structured(
            self.model.as_ref(),
            prompts::PROMPT_EDITOR,
            &prompts::best_article_message(&summary),
            options,
        )
        .await?;

        if choice.article_id >= candidates.len() {
            return Err(Error::schema_violation(
                "articleId",
                format!("id between 0 and {}", candidates.len() - 1),
            ));
        }

        Ok(choice)
    }
}
