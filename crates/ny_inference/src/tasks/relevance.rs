use std::sync::Arc;

use ny_core::{CompletionOptions, LanguageModel, RelevanceDecision, Result};

use crate::prompts;

pub struct RelevanceChecker {
    model: Arc<dyn LanguageModel>,
}

impl RelevanceChecker {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn check(&self, text: &str) -> Result<RelevanceDecision> {
        let options = CompletionOptions::new(prompts::relevance_shape())
            .temperature(prompts::TEMPERATURE)
            .max_tokens(prompts::CLASSIFICATION_MAX_TOKENS);

        super::invoke_structured(
            self.model.as_ref(),
            prompts::PROMPT_ASSISTANT,
            &prompts::relevance_message(text),
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

    #[tokio::test]
    async fn test_relevance_from_noisy_response() {
        let model = Arc::new(
            DummyModel::new()
                .with_response("informationIsRelatedToSweden", "Sure! {\"isRelatedToSweden\": false} Hope that helps."),
        );
        let checker = RelevanceChecker::new(model.clone());

        let decision = checker.check("Flooding in Valencia").await.unwrap();
        assert!(!decision.is_related_to_sweden);

        let calls = model.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_tokens, 500);
        assert!(calls[0].user_prompt.contains("INFORMATION:\nFlooding in Valencia\nEND OF INFORMATION."));
    }

    #[tokio::test]
    async fn test_relevance_rejects_wrong_type() {
        let model = Arc::new(
            DummyModel::new().with_response("informationIsRelatedToSweden", "{\"isRelatedToSweden\": \"yes\"}"),
        );
        let err = RelevanceChecker::new(model).check("text").await.unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref field, .. } if field == "isRelatedToSweden"));
    }
}
