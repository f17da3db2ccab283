use dotenv::dotenv;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::time::Duration;

use super::endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, Provider, DEFAULT_REQUEST_TIMEOUT,
    OPENROUTER_CHAT_URL,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiConnectionError {
    #[error("API key not found in environment: {0}")]
    MissingApiKey(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error {status}: {error_body}")]
    Api {
        status: reqwest::StatusCode,
        error_body: String,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
}

impl Provider {
    pub fn openrouter(api_key_env_var_name: &str) -> Self {
        Self::OpenRouter {
            api_key_env_var: api_key_env_var_name.to_string(),
            endpoint: OPENROUTER_CHAT_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        match self {
            Provider::OpenRouter {
                api_key_env_var,
                endpoint,
                ..
            } => Provider::OpenRouter {
                api_key_env_var,
                endpoint,
                timeout,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenRouter { .. } => "openrouter",
        }
    }

    pub async fn call_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ApiConnectionError> {
        match self {
            Provider::OpenRouter {
                api_key_env_var,
                endpoint,
                timeout,
            } => {
                dotenv().ok();
                let actual_api_key = env::var(api_key_env_var)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| ApiConnectionError::MissingApiKey(api_key_env_var.clone()))?;

                let mut request_payload = serde_json::to_value(request)?;
                if let Some(obj) = request_payload.as_object_mut() {
                    // Let OpenRouter fall back across upstreams instead of pinning one.
                    obj.insert("provider".to_string(), json!({ "allow_fallbacks": true }));
                }

                let site_url =
                    env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
                let app_name = env::var("APP_NAME").unwrap_or_else(|_| "RecipeChef".to_string());

                log::debug!(
                    "Sending chat completion to {} (model {}, {} messages)",
                    endpoint,
                    request.model,
                    request.messages.len()
                );

                let response = Client::new()
                    .post(endpoint)
                    .bearer_auth(actual_api_key)
                    .header("HTTP-Referer", site_url)
                    .header("X-Title", app_name)
                    .timeout(*timeout)
                    .json(&request_payload)
                    .send()
                    .await
                    .map_err(|e| {
                        if e.is_timeout() {
                            ApiConnectionError::Timeout(*timeout)
                        } else {
                            ApiConnectionError::Network(e)
                        }
                    })?;

                let status = response.status();
                if status.is_success() {
                    Ok(response.json::<ChatCompletionResponse>().await?)
                } else {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());
                    Err(ApiConnectionError::Api { status, error_body })
                }
            }
        }
    }
}
