use std::sync::Arc;

use ny_core::{Error, LanguageModel, Result};
use tracing::info;

use crate::InferenceConfig;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

pub const AVAILABLE_MODELS: &[&str] = &["openai", "dummy"];

pub fn create_model(name: &str, config: InferenceConfig) -> Result<Arc<dyn LanguageModel>> {
    let model: Arc<dyn LanguageModel> = match name {
        "openai" => Arc::new(OpenAiModel::new(config)?),
        "dummy" => Arc::new(DummyModel::new()),
        other => {
            return Err(Error::Config(format!(
                "Unknown model '{}'. Available models: {}",
                other,
                AVAILABLE_MODELS.join(", ")
            )))
        }
    };
    info!("🧠 Using {} model", model.name());
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_model() {
        assert_eq!(create_model("dummy", InferenceConfig::default()).unwrap().name(), "Dummy");
        assert!(matches!(
            create_model("ollama", InferenceConfig::default()),
            Err(Error::Config(_))
        ));
        // The default config carries no credentials.
        assert!(create_model("openai", InferenceConfig::default()).is_err());
    }
}
