use std::env;
use std::time::Duration;

use ny_core::{Error, NewsValueScore, Result};
use ny_inference::{ApiFlavor, InferenceConfig, DEFAULT_AZURE_API_VERSION};
use ny_storage::StorageConfig;
use tracing::debug;

use crate::orchestrator::PipelineSettings;

pub const DEFAULT_CONTAINER: &str = "nyheter";
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 120;

/// Everything a run needs from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub inference: InferenceConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::try_load_dotenv();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source. Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let defaults = InferenceConfig::default();
        let inference = InferenceConfig {
            flavor: ApiFlavor::Azure {
                api_version: var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string()),
            },
            api_key: var("AZURE_OPENAI_API_KEY"),
            endpoint: var("AZURE_OPENAI_ENDPOINT").unwrap_or_default(),
            deployment: var("AZURE_OPENAI_DEPLOYMENT_NAME").unwrap_or(defaults.deployment),
            advanced_deployment: var("AZURE_GPT4_DEPLOYMENT_NAME"),
            image_deployment: var("AZURE_OPENAI_IMAGE_DEPLOYMENT").unwrap_or(defaults.image_deployment),
            ..defaults
        };

        let storage = StorageConfig {
            connection_string: var("AZURE_STORAGE_CONNECTION_STRING"),
        };

        let min_news_value = var("NYHETER_MIN_NEWS_VALUE")
            .map(|raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| NewsValueScore::in_range(*v))
                    .ok_or_else(|| {
                        Error::Config(format!("NYHETER_MIN_NEWS_VALUE must be a number in [0, 10], got '{}'", raw))
                    })
            })
            .transpose()?;

        let timeout_secs = var("NYHETER_STAGE_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    Error::Config(format!("NYHETER_STAGE_TIMEOUT_SECS must be whole seconds, got '{}'", raw))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_STAGE_TIMEOUT_SECS);

        let pipeline = PipelineSettings {
            container: var("NYHETER_CONTAINER").unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
            // Zero disables the limit.
            call_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            min_news_value,
            ..PipelineSettings::default()
        };

        debug!(
            "Loaded config: deployment={}, container={}, timeout={:?}",
            inference.deployment, pipeline.container, pipeline.call_timeout
        );

        Ok(Self {
            inference,
            storage,
            pipeline,
        })
    }

    fn try_load_dotenv() {
        // Current directory first, then the user config dir, then home.
        if dotenvy::dotenv().is_ok() {
            return;
        }

        let candidates = [
            dirs::config_dir().map(|dir| dir.join("nyheter").join(".env")),
            dirs::home_dir().map(|dir| dir.join(".env")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.exists() && dotenvy::from_path(&path).is_ok() {
                debug!("Loaded environment from {}", path.display());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(
            config.inference.flavor,
            ApiFlavor::Azure {
                api_version: "2024-11-01-preview".to_string()
            }
        );
        assert_eq!(config.inference.image_deployment, "dall-e-3");
        assert!(config.inference.api_key.is_none());
        assert!(config.storage.connection_string.is_none());
        assert_eq!(config.pipeline.container, "nyheter");
        assert_eq!(config.pipeline.call_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.pipeline.min_news_value, None);
    }

    #[test]
    fn test_reads_azure_variables() {
        let config = config_from(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "secret"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-35"),
            ("AZURE_GPT4_DEPLOYMENT_NAME", "gpt-4"),
            ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=b"),
            ("NYHETER_CONTAINER", "test-bilder"),
            ("NYHETER_MIN_NEWS_VALUE", "4.5"),
            ("NYHETER_STAGE_TIMEOUT_SECS", "0"),
        ])
        .unwrap();

        assert_eq!(config.inference.endpoint, "https://example.openai.azure.com");
        assert_eq!(config.inference.api_key.as_deref(), Some("secret"));
        assert_eq!(config.inference.deployment, "gpt-35");
        assert_eq!(config.inference.advanced_deployment.as_deref(), Some("gpt-4"));
        assert_eq!(
            config.storage.connection_string.as_deref(),
            Some("AccountName=a;AccountKey=b")
        );
        assert_eq!(config.pipeline.container, "test-bilder");
        assert_eq!(config.pipeline.min_news_value, Some(4.5));
        assert_eq!(config.pipeline.call_timeout, None);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("AZURE_GPT4_DEPLOYMENT_NAME", "  "), ("NYHETER_CONTAINER", "")]).unwrap();
        assert!(config.inference.advanced_deployment.is_none());
        assert_eq!(config.pipeline.container, "nyheter");
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(matches!(
            config_from(&[("NYHETER_MIN_NEWS_VALUE", "11")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("NYHETER_MIN_NEWS_VALUE", "high")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("NYHETER_MIN_NEWS_VALUE", "NaN")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_from(&[("NYHETER_STAGE_TIMEOUT_SECS", "2m")]),
            Err(Error::Config(_))
        ));
    }
}
