pub mod api_connection;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod generation;
pub mod image_search;
pub mod recipe_document;
pub mod reconcile;
pub mod state_store;
pub mod web_scrape;

pub use conversation::{ConversationTurn, Speaker, Transcript, APOLOGY_TEXT};
pub use generation::{Generated, GenerationClient, GenerationError};
pub use image_search::{ImageResolutionError, ImageResolver};
pub use recipe_document::{ImageField, InstructionStep, RecipeDocument};
pub use state_store::{RecipeStateStore, RejectReason, SessionState, StoreOptions, SubmitOutcome};
