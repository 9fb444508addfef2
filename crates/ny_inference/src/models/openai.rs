use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use ny_core::{CompletionOptions, Error, LanguageModel, ModelTier, Result};

use crate::{ApiFlavor, InferenceConfig};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    tools: Vec<Value>,
    tool_choice: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

/// Chat-completions client for Azure OpenAI and OpenAI-compatible endpoints.
/// Structured output is requested as a forced function call.
pub struct OpenAiModel {
    client: Client,
    config: InferenceConfig,
}

impl OpenAiModel {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(Error::Config("An API key is required for the OpenAI model".to_string()));
        }
        if config.endpoint.is_empty() {
            return Err(Error::Config("An endpoint is required for the OpenAI model".to_string()));
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, config })
    }

    fn deployment(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => self.config.deployment.as_str(),
            ModelTier::Advanced => self
                .config
                .advanced_deployment
                .as_deref()
                .unwrap_or(&self.config.deployment),
        }
    }

    fn url(&self, deployment: &str, operation: &str) -> String {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        match &self.config.flavor {
            ApiFlavor::Azure { api_version } => format!(
                "{}/openai/deployments/{}/{}?api-version={}",
                endpoint, deployment, operation, api_version
            ),
            ApiFlavor::OpenAi => format!("{}/{}", endpoint, operation),
        }
    }

    /// Model name goes in the body only for OpenAI; Azure encodes it in the URL.
    fn body_model<'a>(&self, deployment: &'a str) -> Option<&'a str> {
        match self.config.flavor {
            ApiFlavor::Azure { .. } => None,
            ApiFlavor::OpenAi => Some(deployment),
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let key = self.config.api_key.as_deref().unwrap_or_default();
        match self.config.flavor {
            ApiFlavor::Azure { .. } => request.header("api-key", key),
            ApiFlavor::OpenAi => request.bearer_auth(key),
        }
    }

    /// Send with retry on connection failures, 429 and 5xx. Anything else
    /// is returned to the caller on the first attempt.
    async fn send_json<B: Serialize + Sync>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self
                .authorize(self.client.post(url))
                .json(body)
                .send()
                .await
                .map_err(Error::from)
                .and_then(classify_status);

            match result {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let backoff = Duration::from_millis(1000 * 2_u64.pow(attempt - 1));
                    warn!("⏳ Model request failed ({}), retrying {}/{} in {:?}", e, attempt, max_attempts, backoff);
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        return Err(Error::Transport(format!("model endpoint returned {}", status)));
    }
    Err(Error::External(anyhow::anyhow!(
        "model endpoint rejected the request ({})",
        status
    )))
}

/// Pick the raw arguments of the forced function call, falling back to plain
/// content for providers that answer in the message body.
fn extract_arguments(response: ChatResponse, function: &str) -> Result<String> {
    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| Error::MalformedResponse("No choices in response".to_string()))?;

    let ResponseMessage {
        content,
        tool_calls,
        function_call,
    } = message;

    tool_calls
        .into_iter()
        .map(|t| t.function)
        .chain(function_call)
        .find(|f| f.name == function)
        .map(|f| f.arguments)
        .or(content)
        .filter(|raw| !raw.trim().is_empty())
        .ok_or_else(|| Error::MalformedResponse("Empty response from model".to_string()))
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.config.endpoint)
            .field("deployment", &self.config.deployment)
            .finish()
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        match self.config.flavor {
            ApiFlavor::Azure { .. } => "Azure OpenAI",
            ApiFlavor::OpenAi => "OpenAI",
        }
    }

    async fn complete_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let deployment = self.deployment(options.tier);
        let function = options.expected_shape.name;

        let request = ChatRequest {
            model: self.body_model(deployment),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            tools: vec![json!({
                "type": "function",
                "function": options.expected_shape.function_definition(),
            })],
            tool_choice: json!({ "type": "function", "function": { "name": function } }),
        };

        debug!(deployment, function, "Chat completion request");
        let response = self
            .send_json(&self.url(deployment, "chat/completions"), &request)
            .await?
            .json::<ChatResponse>()
            .await?;

        extract_arguments(response, function)
    }

    async fn generate_image(&self, prompt: &str) -> Result<String> {
        let deployment = &self.config.image_deployment;
        let request = ImageRequest {
            model: self.body_model(deployment),
            prompt,
            n: 1,
            size: &self.config.image_size,
            response_format: "b64_json",
        };

        debug!(deployment = %deployment, "Image generation request");
        let response = self
            .send_json(&self.url(deployment, "images/generations"), &request)
            .await?
            .json::<ImageResponse>()
            .await?;

        response
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .filter(|payload| !payload.is_empty())
            .ok_or_else(|| Error::ImageGenerationFailed("No image payload in response".to_string()))
    }
}
