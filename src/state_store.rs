//! The session's single write path for recipe documents.
//!
//! [`RecipeStateStore`] owns the current and previous documents, the transcript and the
//! generating flag. Collaborator failures are absorbed here: every public operation
//! finishes, either with the new document published or with the session left as it was.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::conversation::{ConversationTurn, Transcript, APOLOGY_TEXT};
use crate::generation::{Generated, GenerationClient, GenerationError};
use crate::image_search::ImageResolver;
use crate::recipe_document::RecipeDocument;
use crate::reconcile::{reconcile, ReconcileOptions, ReconcileReport};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub generation_timeout: Duration,
    pub reconcile: ReconcileOptions,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            reconcile: ReconcileOptions::default(),
        }
    }
}

/// Memory-resident state for one chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub current: Option<RecipeDocument>,
    /// Single-slot backup of the document `current` replaced.
    pub previous: Option<RecipeDocument>,
    pub transcript: Transcript,
    pub is_first_turn: bool,
    pub is_generating: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            current: None,
            previous: None,
            transcript: Transcript::new(),
            is_first_turn: true,
            is_generating: false,
        }
    }

    pub fn active_step_index(&self) -> Option<usize> {
        self.current.as_ref().and_then(RecipeDocument::active_step_index)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    /// A generation is already in flight for this session.
    Busy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new document was published.
    Completed(ReconcileReport),
    /// Generation failed; the apology turn was appended and the document left alone.
    Apologized,
    Rejected(RejectReason),
}

pub struct RecipeStateStore {
    generator: Arc<dyn GenerationClient>,
    images: Arc<dyn ImageResolver>,
    options: StoreOptions,
    state: Mutex<SessionState>,
}

impl RecipeStateStore {
    pub fn new(
        generator: Arc<dyn GenerationClient>,
        images: Arc<dyn ImageResolver>,
        options: StoreOptions,
    ) -> Self {
        Self {
            generator,
            images,
            options,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// Sends a chat message to the generation service and publishes the edited document.
    ///
    /// Blank input and calls made while another generation is in flight are rejected
    /// without touching the transcript. Until the session has a document, the message is
    /// treated as raw recipe text and goes through the first-turn path.
    pub async fn submit_user_message(&self, text: &str) -> SubmitOutcome {
        let text = text.trim();
        if text.is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }

        let (current, transcript) = {
            let mut state = self.state.lock().await;
            if state.is_generating {
                log::debug!("Rejecting message while a generation is in flight");
                return SubmitOutcome::Rejected(RejectReason::Busy);
            }
            state.transcript.push_user(text);
            state.is_generating = true;
            let current = if state.is_first_turn {
                None
            } else {
                state.current.clone()
            };
            (current, state.transcript.turns().to_vec())
        };

        let result = match &current {
            Some(document) => {
                self.bounded(self.generator.generate(text, document, &transcript))
                    .await
            }
            None => self.bounded(self.generator.generate_initial(text)).await,
        };

        self.finish_turn(current, result).await
    }

    /// Structures pasted or scraped recipe text as a fresh first turn.
    ///
    /// No user turn is recorded; on success the transcript gains only the assistant summary.
    pub async fn load_from_external_source(&self, raw_text: &str) -> SubmitOutcome {
        if raw_text.trim().is_empty() {
            return SubmitOutcome::Rejected(RejectReason::EmptyInput);
        }

        {
            let mut state = self.state.lock().await;
            if state.is_generating {
                log::debug!("Rejecting external source while a generation is in flight");
                return SubmitOutcome::Rejected(RejectReason::Busy);
            }
            state.is_generating = true;
        }

        // A new recipe shares no step identity with whatever was loaded before.
        let result = self.bounded(self.generator.generate_initial(raw_text)).await;
        self.finish_turn(None, result).await
    }

    /// Reconciles `candidate` against the current document and publishes it.
    ///
    /// Holds the generating flag for the duration, so it is rejected with
    /// [`RejectReason::Busy`] while a turn is in flight. The transcript is not touched.
    pub async fn apply_candidate(&self, candidate: RecipeDocument) -> SubmitOutcome {
        let current = {
            let mut state = self.state.lock().await;
            if state.is_generating {
                log::debug!("Rejecting candidate while a generation is in flight");
                return SubmitOutcome::Rejected(RejectReason::Busy);
            }
            state.is_generating = true;
            state.current.clone()
        };

        let reconciled = reconcile(
            current.as_ref(),
            candidate,
            self.images.as_ref(),
            &self.options.reconcile,
        )
        .await;

        let mut state = self.state.lock().await;
        state.previous = state.current.replace(reconciled.document);
        state.is_generating = false;
        SubmitOutcome::Completed(reconciled.report)
    }

    /// Swaps the backup document back in. Returns false when there is nothing to restore
    /// or a generation is in flight.
    pub async fn revert_to_previous(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.is_generating || state.previous.is_none() {
            return false;
        }
        let SessionState {
            current, previous, ..
        } = &mut *state;
        std::mem::swap(current, previous);
        true
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn current(&self) -> Option<RecipeDocument> {
        self.state.lock().await.current.clone()
    }

    pub async fn previous(&self) -> Option<RecipeDocument> {
        self.state.lock().await.previous.clone()
    }

    pub async fn transcript(&self) -> Vec<ConversationTurn> {
        self.state.lock().await.transcript.turns().to_vec()
    }

    pub async fn is_generating(&self) -> bool {
        self.state.lock().await.is_generating
    }

    pub async fn is_first_turn(&self) -> bool {
        self.state.lock().await.is_first_turn
    }

    /// Index of the first incomplete step of the current document, derived on every call.
    pub async fn active_step_index(&self) -> Option<usize> {
        self.state.lock().await.active_step_index()
    }

    pub async fn active_step_image(&self) -> Option<Vec<String>> {
        let state = self.state.lock().await;
        state
            .current
            .as_ref()
            .and_then(|doc| doc.active_step_image())
            .map(<[String]>::to_vec)
    }

    async fn bounded<F>(&self, generation: F) -> Result<Generated, GenerationError>
    where
        F: Future<Output = Result<Generated, GenerationError>>,
    {
        let limit = self.options.generation_timeout;
        match timeout(limit, generation).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(limit)),
        }
    }

    async fn finish_turn(
        &self,
        base: Option<RecipeDocument>,
        result: Result<Generated, GenerationError>,
    ) -> SubmitOutcome {
        match result {
            Ok(Generated { document, summary }) => {
                let reconciled = reconcile(
                    base.as_ref(),
                    document,
                    self.images.as_ref(),
                    &self.options.reconcile,
                )
                .await;

                let mut state = self.state.lock().await;
                state.transcript.push_assistant(summary);
                state.previous = state.current.replace(reconciled.document);
                state.is_first_turn = false;
                state.is_generating = false;
                log::info!(
                    "Published '{}' (active step {:?}, {} images resolved, {} pending)",
                    state.current.as_ref().map(|d| d.title.as_str()).unwrap_or_default(),
                    state.active_step_index(),
                    reconciled.report.resolved_steps.len(),
                    reconciled.report.unresolved_steps.len()
                );
                SubmitOutcome::Completed(reconciled.report)
            }
            Err(e) => {
                log::error!("Generation failed: {}", e);
                let mut state = self.state.lock().await;
                state.transcript.push_assistant(APOLOGY_TEXT);
                state.is_generating = false;
                SubmitOutcome::Apologized
            }
        }
    }
}
