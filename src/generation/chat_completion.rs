use async_trait::async_trait;

use super::prompts::{fence_user_input, first_turn_prompt, follow_up_prompt, UserProfile};
use super::{parse_generation_response, Generated, GenerationClient, GenerationError};
use crate::api_connection::endpoints::{ChatCompletionRequest, ChatMessage, Provider, ResponseFormat};
use crate::conversation::ConversationTurn;
use crate::recipe_document::RecipeDocument;

const FIRST_TURN_TEMPERATURE: f32 = 0.05;
const FOLLOW_UP_TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 8192;

/// [`GenerationClient`] backed by an OpenRouter chat completion model.
pub struct ChatCompletionGenerator {
    provider: Provider,
    model: String,
    profile: UserProfile,
}

impl ChatCompletionGenerator {
    pub fn new(provider: Provider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            profile: UserProfile::default(),
        }
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, system_prompt: String, user_text: &str, temperature: f32) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(fence_user_input(user_text)),
            ],
            response_format: Some(ResponseFormat::json_object()),
            temperature: Some(temperature),
            max_tokens: Some(MAX_TOKENS),
        }
    }

    async fn complete(&self, request: ChatCompletionRequest) -> Result<Generated, GenerationError> {
        let response = self.provider.call_chat_completion(&request).await?;
        let content = response.first_content().ok_or(GenerationError::EmptyResponse)?;
        log::debug!("Raw generation content:\n---\n{}\n---", content);
        parse_generation_response(content)
    }
}

#[async_trait]
impl GenerationClient for ChatCompletionGenerator {
    async fn generate_initial(&self, raw_text: &str) -> Result<Generated, GenerationError> {
        let request = self.build_request(
            first_turn_prompt(&self.profile),
            raw_text,
            FIRST_TURN_TEMPERATURE,
        );
        self.complete(request).await
    }

    async fn generate(
        &self,
        user_text: &str,
        current: &RecipeDocument,
        transcript: &[ConversationTurn],
    ) -> Result<Generated, GenerationError> {
        let request = self.build_request(
            follow_up_prompt(&self.profile, current, transcript),
            user_text,
            FOLLOW_UP_TEMPERATURE,
        );
        self.complete(request).await
    }
}
