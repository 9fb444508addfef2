use std::sync::Arc;

use ny_core::{Article, CompletionOptions, LanguageModel, ModelTier, Result};

use crate::prompts;

pub struct ArticleGenerator {
    model: Arc<dyn LanguageModel>,
}

impl ArticleGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn generate(&self, transcribed_text: &str) -> Result<Article> {
        let options = CompletionOptions::new(prompts::article_shape())
            .temperature(prompts::TEMPERATURE)
            .max_tokens(prompts::ARTICLE_MAX_TOKENS)
            .tier(ModelTier::Advanced);

        super::invoke_structured(
            self.model.as_ref(),
            prompts::PROMPT_JOURNALIST,
            &prompts::article_message(remove_last_sentence(transcribed_text)),
            options,
        )
        .await
    }
}

/// Drop the trailing sentence of a transcription, which is usually cut off
/// mid-word. Text with a single sentence is returned as is.
///
/// A terminator only ends a sentence when whitespace follows it and the next
/// word does not start in lowercase or with a digit, so decimals (`3.5`),
/// times (`kl. 14.30`) and abbreviations (`bl.a.`, `t.ex.`) stay intact.
pub fn remove_last_sentence(text: &str) -> &str {
    let trimmed = text.trim();

    let search = match trimmed.char_indices().last() {
        Some((idx, c)) if is_terminator(c) => &trimmed[..idx],
        _ => trimmed,
    };

    search
        .char_indices()
        .filter(|&(idx, c)| is_terminator(c) && starts_sentence(&trimmed[idx + c.len_utf8()..]))
        .last()
        .map(|(idx, c)| &trimmed[..idx + c.len_utf8()])
        .unwrap_or(trimmed)
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Whether the text following a terminator opens a new sentence.
fn starts_sentence(rest: &str) -> bool {
    let next_word = rest.trim_start();
    if next_word.len() == rest.len() {
        return false;
    }
    next_word
        .chars()
        .next()
        .map_or(true, |c| !c.is_lowercase() && !c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::DummyModel;
    use ny_core::{Error, ModelTier};

    const FULL_ARTICLE: &str = r#"{"body": "Snow closed the E4.", "headline": "Snow chaos on E4", "category": "Traffic", "imagePrompt": "A snowy motorway at dusk", "socialMediaHook": "❄️ Stuck on the E4?"}"#;

    #[test]
    fn test_remove_last_sentence() {
        assert_eq!(remove_last_sentence("One. Two. Thr"), "One. Two.");
        assert_eq!(remove_last_sentence("One. Two. Three."), "One. Two.");
        assert_eq!(remove_last_sentence("Is it? Yes! And th"), "Is it? Yes!");
        assert_eq!(remove_last_sentence("Only one sentence."), "Only one sentence.");
        assert_eq!(remove_last_sentence("no punctuation at all"), "no punctuation at all");
        assert_eq!(remove_last_sentence("  Här. Där är  "), "Här.");
        assert_eq!(remove_last_sentence(""), "");
    }

    #[test]
    fn test_remove_last_sentence_keeps_decimals_and_abbreviations() {
        assert_eq!(
            remove_last_sentence("Temperaturen i Kiruna var minus 3.5 grader på morgonen. Det väntas bli kallare under vecka"),
            "Temperaturen i Kiruna var minus 3.5 grader på morgonen."
        );
        assert_eq!(
            remove_last_sentence(
                "Polisen larmades kl. 14.30 till Storgatan. En man skadades bl.a. i huvudet och fördes till sjukh"
            ),
            "Polisen larmades kl. 14.30 till Storgatan."
        );
        assert_eq!(
            remove_last_sentence(
                "Polisen larmades kl. 14.30 till Storgatan i Malmö där en man skadades svårt och fördes till sjukhus"
            ),
            "Polisen larmades kl. 14.30 till Storgatan i Malmö där en man skadades svårt och fördes till sjukhus"
        );
        assert_eq!(
            remove_last_sentence("Vägarna är hala, t.ex. på E4 norr om Uppsala. Trafikverket uppman"),
            "Vägarna är hala, t.ex. på E4 norr om Uppsala."
        );
        assert_eq!(remove_last_sentence("Vad hände?! Ingen vet än"), "Vad hände?!");
    }

    #[tokio::test]
    async fn test_generate_article() {
        let model = Arc::new(DummyModel::new().with_response("getNewsArticleInformation", FULL_ARTICLE));
        let generator = ArticleGenerator::new(model.clone());

        let article = generator
            .generate("Snow fell over Uppsala. The E4 was closed. Traffic is exp")
            .await
            .unwrap();
        assert_eq!(article.headline, "Snow chaos on E4");
        assert_eq!(article.image_prompt, "A snowy motorway at dusk");

        let calls = model.calls();
        assert_eq!(calls[0].tier, ModelTier::Advanced);
        assert_eq!(calls[0].max_tokens, 1200);
        assert_eq!(calls[0].system_prompt, prompts::PROMPT_JOURNALIST);
        assert!(calls[0].user_prompt.contains("The E4 was closed. END OF INFORMATION."));
        assert!(!calls[0].user_prompt.contains("Traffic is exp"));
    }

    #[tokio::test]
    async fn test_missing_field_is_not_defaulted() {
        let raw = r#"{"body": "b", "headline": "h", "category": "c", "imagePrompt": "i"}"#;
        let model = Arc::new(DummyModel::new().with_response("getNewsArticleInformation", raw));
        let err = ArticleGenerator::new(model).generate("text").await.unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == "socialMediaHook"));
    }
}
