use std::env;
use std::time::Duration;

use crate::api_connection::endpoints::DEFAULT_MODEL;
use crate::image_search::DEFAULT_BLOCKED_DOMAINS;
use crate::reconcile::{CurrentStepPolicy, ReconcileOptions, DEFAULT_FALLBACK_IMAGE, DEFAULT_IMAGE_TIMEOUT};
use crate::state_store::{StoreOptions, DEFAULT_GENERATION_TIMEOUT};

pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const GOOGLE_API_KEY_ENV_VAR: &str = "GOOGLE_API_KEY";
pub const GOOGLE_SEARCH_ENGINE_ENV_VAR: &str = "GOOGLE_SEARCH_ENGINE_ID";
pub const MODEL_ENV_VAR: &str = "RECIPE_CHEF_MODEL";
pub const GENERATION_TIMEOUT_ENV_VAR: &str = "RECIPE_CHEF_GENERATION_TIMEOUT_SECS";
pub const IMAGE_TIMEOUT_ENV_VAR: &str = "RECIPE_CHEF_IMAGE_TIMEOUT_SECS";
pub const FALLBACK_IMAGE_ENV_VAR: &str = "RECIPE_CHEF_FALLBACK_IMAGE";
pub const CURRENT_STEP_POLICY_ENV_VAR: &str = "RECIPE_CHEF_CURRENT_STEP_POLICY";
pub const BLOCKED_DOMAINS_ENV_VAR: &str = "RECIPE_CHEF_BLOCKED_IMAGE_DOMAINS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a positive number of seconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var}: {message}")]
    InvalidPolicy { var: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub struct ChefConfig {
    /// Environment variable the OpenRouter key is read from at call time.
    pub api_key_env_var: String,
    pub model: String,
    pub google_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    pub generation_timeout: Duration,
    pub image_timeout: Duration,
    pub fallback_image_url: String,
    pub current_step_policy: CurrentStepPolicy,
    pub blocked_domains: Vec<String>,
}

impl Default for ChefConfig {
    fn default() -> Self {
        Self {
            api_key_env_var: API_KEY_ENV_VAR.to_string(),
            model: DEFAULT_MODEL.to_string(),
            google_api_key: None,
            google_search_engine_id: None,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            fallback_image_url: DEFAULT_FALLBACK_IMAGE.to_string(),
            current_step_policy: CurrentStepPolicy::default(),
            blocked_domains: DEFAULT_BLOCKED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl ChefConfig {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key/value source; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(model) = get(MODEL_ENV_VAR) {
            config.model = model;
        }
        config.google_api_key = get(GOOGLE_API_KEY_ENV_VAR);
        config.google_search_engine_id = get(GOOGLE_SEARCH_ENGINE_ENV_VAR);

        if let Some(value) = get(GENERATION_TIMEOUT_ENV_VAR) {
            config.generation_timeout = parse_timeout(GENERATION_TIMEOUT_ENV_VAR, value)?;
        }
        if let Some(value) = get(IMAGE_TIMEOUT_ENV_VAR) {
            config.image_timeout = parse_timeout(IMAGE_TIMEOUT_ENV_VAR, value)?;
        }
        if let Some(fallback) = get(FALLBACK_IMAGE_ENV_VAR) {
            config.fallback_image_url = fallback;
        }
        if let Some(policy) = get(CURRENT_STEP_POLICY_ENV_VAR) {
            config.current_step_policy = policy
                .parse::<CurrentStepPolicy>()
                .map_err(|message| ConfigError::InvalidPolicy {
                    var: CURRENT_STEP_POLICY_ENV_VAR,
                    message,
                })?;
        }
        if let Some(domains) = get(BLOCKED_DOMAINS_ENV_VAR) {
            config.blocked_domains = domains
                .split(',')
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect();
        }

        Ok(config)
    }

    pub fn image_search_configured(&self) -> bool {
        self.google_api_key.is_some() && self.google_search_engine_id.is_some()
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            generation_timeout: self.generation_timeout,
            reconcile: ReconcileOptions {
                fallback_image_url: self.fallback_image_url.clone(),
                image_timeout: self.image_timeout,
                current_step_policy: self.current_step_policy,
            },
        }
    }
}

fn parse_timeout(var: &'static str, value: String) -> Result<Duration, ConfigError> {
    match value.parse::<f64>().ok().filter(|secs| *secs > 0.0) {
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|_| ConfigError::InvalidTimeout { var, value }),
        None => Err(ConfigError::InvalidTimeout { var, value }),
    }
}
