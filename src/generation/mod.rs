//! Recipe generation: turning pasted recipes and chat requests into structured documents.
//!
//! The store only talks to a [`GenerationClient`]; the production implementation
//! ([`ChatCompletionGenerator`]) sends prompts through the OpenRouter chat completion
//! transport and enforces the JSON contract on the way back.

mod chat_completion;
pub mod prompts;

pub use chat_completion::ChatCompletionGenerator;
pub use prompts::UserProfile;

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::api_connection::ApiConnectionError;
use crate::conversation::ConversationTurn;
use crate::recipe_document::RecipeDocument;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider connection failed: {0}")]
    Connection(#[from] ApiConnectionError),

    #[error("Malformed generation response: {0}")]
    Malformed(String),

    #[error("Generation service returned no content")]
    EmptyResponse,

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
}

/// A candidate document plus the natural-language reply that accompanies it.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub document: RecipeDocument,
    pub summary: String,
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Structure raw recipe text (pasted or scraped) into a first document.
    async fn generate_initial(&self, raw_text: &str) -> Result<Generated, GenerationError>;

    /// Edit `current` according to the user's request.
    async fn generate(
        &self,
        user_text: &str,
        current: &RecipeDocument,
        transcript: &[ConversationTurn],
    ) -> Result<Generated, GenerationError>;
}

#[derive(Deserialize)]
struct GenerationEnvelope {
    recipe: RecipeDocument,
    summary: SummaryField,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SummaryField {
    Content { content: String },
    Text(String),
}

/// Strips a surrounding markdown code fence (```` ``` ```` or ```` ```json ````) if present.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```")) || trimmed.len() < 6 {
        return trimmed;
    }
    let inner = &trimmed[3..trimmed.len() - 3];
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim()
}

/// Parses the `{recipe, summary}` envelope the prompts ask for.
pub fn parse_generation_response(content: &str) -> Result<Generated, GenerationError> {
    let json_str = strip_code_fences(content);
    if json_str.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let envelope: GenerationEnvelope = serde_json::from_str(json_str).map_err(|e| {
        log::debug!("Failed to deserialize generation response: {}. Content was:\n{}", e, json_str);
        GenerationError::Malformed(e.to_string())
    })?;

    let summary = match envelope.summary {
        SummaryField::Content { content } | SummaryField::Text(content) => content,
    };

    Ok(Generated {
        document: envelope.recipe,
        summary: summary.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe_document::ImageField;

    const RESPONSE: &str = r#"{
        "recipe": {
            "title": "Saag Paneer",
            "ingredients": { "items": [ { "text": "200g paneer" } ] },
            "instructions": { "items": [
                { "text": "Blanch the spinach", "completed": false, "current": true,
                  "image": "blanched spinach", "isQuery": true },
                { "text": "Fry the paneer", "completed": false, "current": false }
            ] }
        },
        "summary": { "content": "Let's get cooking!" }
    }"#;

    #[test]
    fn test_parse_plain_json() {
        let generated = parse_generation_response(RESPONSE).unwrap();
        assert_eq!(generated.summary, "Let's get cooking!");
        assert_eq!(generated.document.steps().len(), 2);
        assert!(generated.document.steps()[0].image.is_unresolved());
        assert_eq!(generated.document.steps()[1].image, ImageField::Absent);
    }

    #[test]
    fn test_parse_fenced_json() {
        let fenced = format!("```json\n{}\n```", RESPONSE);
        assert!(parse_generation_response(&fenced).is_ok());

        let bare_fence = format!("```\n{}\n```", RESPONSE);
        assert!(parse_generation_response(&bare_fence).is_ok());
    }

    #[test]
    fn test_summary_may_be_a_string() {
        let text = r#"{
            "recipe": { "title": "Tea", "ingredients": { "items": [] }, "instructions": { "items": [] } },
            "summary": "Sorry, I'm built to help out in the kitchen!"
        }"#;
        let generated = parse_generation_response(text).unwrap();
        assert_eq!(generated.summary, "Sorry, I'm built to help out in the kitchen!");
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let text = r#"{ "recipe": { "title": "Tea" }, "summary": { "content": "hi" } }"#;
        assert!(matches!(
            parse_generation_response(text),
            Err(GenerationError::Malformed(_))
        ));
        assert!(matches!(
            parse_generation_response("Here is your recipe!"),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_content() {
        assert!(matches!(
            parse_generation_response("```json\n```"),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            parse_generation_response("   "),
            Err(GenerationError::EmptyResponse)
        ));
    }
}
