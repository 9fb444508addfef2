use std::sync::Arc;

use ny_core::{two_letter_code_to_name, Article, CompletionOptions, LanguageModel, Result, Translation};
use tracing::debug;

use crate::prompts;

pub struct Translator {
    model: Arc<dyn LanguageModel>,
}

impl Translator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Translate headline, category and body into the language named by a
    /// two-letter code. Unknown codes fail before the model is called.
    pub async fn translate(&self, article: &Article, language_code: &str) -> Result<Translation> {
        let language = two_letter_code_to_name(language_code)?;
        debug!(language, "Translating article");

        let options = CompletionOptions::new(prompts::translation_shape())
            .temperature(prompts::TEMPERATURE)
            .max_tokens(prompts::TRANSLATION_MAX_TOKENS);

        super::invoke_structured(
            self.model.as_ref(),
            prompts::PROMPT_TRANSLATOR,
            &prompts::translation_message(language, &article.headline, &article.category, &article.body),
            options,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::DummyModel;
    use ny_core::Error;

    fn article() -> Article {
        Article {
            headline: "Klarna signs agreement".to_string(),
            body: "Klarna has signed a collective agreement.".to_string(),
            category: "Economy".to_string(),
            image_prompt: "X".to_string(),
            social_media_hook: "✍️ Big news".to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_language_fails_before_model_call() {
        let model = Arc::new(DummyModel::new());
        let err = Translator::new(model.clone()).translate(&article(), "zz").await.unwrap_err();
        assert!(matches!(err, Error::UnknownLanguageCode(ref code) if code == "zz"));
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_translation_has_no_image_prompt() {
        let raw = r#"{"headline": "Klarna skriver avtal", "category": "Ekonomi", "body": "Klarna har skrivit på ett kollektivavtal.", "imagePrompt": "ignored"}"#;
        let model = Arc::new(DummyModel::new().with_response("getTranslation", raw));
        let translation = Translator::new(model.clone()).translate(&article(), "sv").await.unwrap();

        assert_eq!(translation.headline, "Klarna skriver avtal");
        let localized = translation.apply_to(&article());
        assert_eq!(localized.image_prompt, "X");

        let calls = model.calls();
        assert_eq!(calls[0].max_tokens, 1800);
        assert!(calls[0].user_prompt.contains("from English to Swedish"));
        assert!(!calls[0].user_prompt.contains("X\n"));
    }
}
