#![allow(dead_code)]

use async_trait::async_trait;
use recipe_chef::generation::{Generated, GenerationClient, GenerationError};
use recipe_chef::image_search::{ImageResolutionError, ImageResolver};
use recipe_chef::recipe_document::{ImageField, InstructionStep, RecipeDocument};
use recipe_chef::state_store::{RecipeStateStore, StoreOptions};
use recipe_chef::ConversationTurn;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationCall {
    Initial {
        raw_text: String,
    },
    FollowUp {
        user_text: String,
        current: RecipeDocument,
        transcript: Vec<ConversationTurn>,
    },
}

/// Replays queued results in order and records every call it receives.
#[derive(Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<Generated, GenerationError>>>,
    calls: Mutex<Vec<GenerationCall>>,
    gate: Option<Arc<Notify>>,
    delay: Option<Duration>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<Result<Generated, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// Every call waits for `gate` to be notified before answering.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<GenerationCall> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, call: GenerationCall) -> Result<Generated, GenerationError> {
        self.calls.lock().unwrap().push(call);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GenerationError::Malformed("no scripted response left".to_string())))
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerator {
    async fn generate_initial(&self, raw_text: &str) -> Result<Generated, GenerationError> {
        self.respond(GenerationCall::Initial {
            raw_text: raw_text.to_string(),
        })
        .await
    }

    async fn generate(
        &self,
        user_text: &str,
        current: &RecipeDocument,
        transcript: &[ConversationTurn],
    ) -> Result<Generated, GenerationError> {
        self.respond(GenerationCall::FollowUp {
            user_text: user_text.to_string(),
            current: current.clone(),
            transcript: transcript.to_vec(),
        })
        .await
    }
}

#[derive(Clone)]
pub enum Lookup {
    Urls(Vec<String>),
    Fail,
}

/// Answers image queries from a table, optionally after a per-query delay.
#[derive(Default)]
pub struct TableResolver {
    table: HashMap<String, (Duration, Lookup)>,
    fallback: Option<Vec<String>>,
    started: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl TableResolver {
    /// Returns `urls` for any query not in the table.
    pub fn always(urls: &[&str]) -> Self {
        Self {
            fallback: Some(urls.iter().map(|u| u.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with(mut self, query: &str, delay_ms: u64, lookup: Lookup) -> Self {
        self.table
            .insert(query.to_string(), (Duration::from_millis(delay_ms), lookup));
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageResolver for TableResolver {
    async fn resolve(&self, query: &str) -> Result<Vec<String>, ImageResolutionError> {
        self.started.lock().unwrap().push(query.to_string());
        let (delay, lookup) = match self.table.get(query) {
            Some(entry) => entry.clone(),
            None => (
                Duration::ZERO,
                self.fallback.clone().map(Lookup::Urls).unwrap_or(Lookup::Urls(Vec::new())),
            ),
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.finished.lock().unwrap().push(query.to_string());
        match lookup {
            Lookup::Urls(urls) => Ok(urls),
            Lookup::Fail => Err(ImageResolutionError::NotConfigured("test resolver failure".to_string())),
        }
    }
}

pub fn step(text: &str, completed: bool, current: bool) -> InstructionStep {
    InstructionStep {
        completed,
        current,
        ..InstructionStep::new(text)
    }
}

pub fn query_step(text: &str, query: &str, completed: bool, current: bool) -> InstructionStep {
    InstructionStep {
        image: ImageField::Unresolved {
            query_text: query.to_string(),
        },
        ..step(text, completed, current)
    }
}

pub fn recipe(steps: Vec<InstructionStep>) -> RecipeDocument {
    let mut doc = RecipeDocument::new("Saag Paneer");
    doc.ingredients.items = vec![
        recipe_chef::recipe_document::TextSpan::plain("500g fresh spinach"),
        recipe_chef::recipe_document::TextSpan::plain("200g paneer, cubed"),
    ];
    doc.instructions.items = steps;
    doc
}

pub fn generated(document: RecipeDocument, summary: &str) -> Result<Generated, GenerationError> {
    Ok(Generated {
        document,
        summary: summary.to_string(),
    })
}

pub fn store_with(
    generator: Arc<ScriptedGenerator>,
    resolver: Arc<TableResolver>,
    options: StoreOptions,
) -> RecipeStateStore {
    RecipeStateStore::new(generator, resolver, options)
}

/// The document satisfies "at most one current step, and it is the first incomplete one".
pub fn assert_single_current(doc: &RecipeDocument) {
    assert_eq!(doc.check_current_step(), Ok(()), "step flags: {:?}", doc.steps());
}
