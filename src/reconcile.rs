//! Merging a candidate document from the generation service with resolved step images.
//!
//! Reconciliation works on a private copy of the candidate: every image lookup settles
//! before the caller gets the document back, so a half-resolved document is never
//! published.

use futures::future::join_all;
use std::str::FromStr;
use std::time::Duration;
use tokio::time::timeout;

use crate::image_search::ImageResolver;
use crate::recipe_document::{CurrentStepViolation, ImageField, RecipeDocument};

pub const DEFAULT_FALLBACK_IMAGE: &str = "/placeholder.svg";
pub const DEFAULT_IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do with a candidate whose `current` flags break the single-current-step rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentStepPolicy {
    /// Log the violation and publish the document as the service sent it.
    #[default]
    PassThrough,
    /// Log the violation and move `current` to the first incomplete step.
    PromoteFirstIncomplete,
}

impl FromStr for CurrentStepPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass-through" | "passthrough" => Ok(CurrentStepPolicy::PassThrough),
            "promote" | "promote-first-incomplete" => Ok(CurrentStepPolicy::PromoteFirstIncomplete),
            other => Err(format!("unknown current step policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Appended to every resolved candidate list so renderers always have something to show.
    pub fallback_image_url: String,
    pub image_timeout: Duration,
    pub current_step_policy: CurrentStepPolicy,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            fallback_image_url: DEFAULT_FALLBACK_IMAGE.to_string(),
            image_timeout: DEFAULT_IMAGE_TIMEOUT,
            current_step_policy: CurrentStepPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Steps whose image went from `Unresolved` to `Resolved` in this pass.
    pub resolved_steps: Vec<usize>,
    /// Steps still waiting on an image after every lookup settled.
    pub unresolved_steps: Vec<usize>,
    /// Steps whose earlier resolved image was kept over a regressed candidate value.
    pub carried_forward_steps: Vec<usize>,
    /// Steps that differ from the step at the same index in the previous document.
    pub changed_steps: Vec<usize>,
    pub violation: Option<CurrentStepViolation>,
    pub coerced: bool,
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub document: RecipeDocument,
    pub report: ReconcileReport,
}

enum Lookup {
    Found(Vec<String>),
    Missing,
}

pub async fn reconcile(
    previous: Option<&RecipeDocument>,
    candidate: RecipeDocument,
    resolver: &dyn ImageResolver,
    options: &ReconcileOptions,
) -> Reconciled {
    let mut working = candidate;
    let mut report = ReconcileReport::default();

    let aligned = previous.filter(|prev| prev.steps().len() == working.steps().len());
    if previous.is_some() && aligned.is_none() {
        log::warn!(
            "Candidate has {} steps, previous document had {}; step identity is lost for this turn",
            working.steps().len(),
            previous.map(|p| p.steps().len()).unwrap_or_default()
        );
    }

    if let Some(prev) = aligned {
        for (idx, (step, prev_step)) in working
            .instructions
            .items
            .iter_mut()
            .zip(prev.steps())
            .enumerate()
        {
            if prev_step.image.is_resolved() && !step.image.is_resolved() {
                step.image = prev_step.image.clone();
                report.carried_forward_steps.push(idx);
            }
            if *step != *prev_step {
                report.changed_steps.push(idx);
            }
        }
    } else {
        report.changed_steps = (0..working.steps().len()).collect();
    }

    let lookups = working
        .pending_image_queries()
        .into_iter()
        .map(|(idx, query)| async move {
            let lookup = match timeout(options.image_timeout, resolver.resolve(&query)).await {
                Ok(Ok(urls)) if !urls.is_empty() => Lookup::Found(urls),
                Ok(Ok(_)) => {
                    log::debug!("No images found for step {} ('{}')", idx, query);
                    Lookup::Missing
                }
                Ok(Err(e)) => {
                    log::warn!("Image lookup for step {} ('{}') failed: {}", idx, query, e);
                    Lookup::Missing
                }
                Err(_) => {
                    log::warn!(
                        "Image lookup for step {} ('{}') timed out after {:?}",
                        idx,
                        query,
                        options.image_timeout
                    );
                    Lookup::Missing
                }
            };
            (idx, lookup)
        });

    for (idx, lookup) in join_all(lookups).await {
        match lookup {
            Lookup::Found(urls) => {
                working.instructions.items[idx].image = ImageField::Resolved {
                    urls: with_fallback(urls, &options.fallback_image_url),
                };
                report.resolved_steps.push(idx);
            }
            Lookup::Missing => report.unresolved_steps.push(idx),
        }
    }

    if let Err(violation) = working.check_current_step() {
        match options.current_step_policy {
            CurrentStepPolicy::PassThrough => {
                log::warn!("Generation returned an invalid step state ({}); displaying as-is", violation);
            }
            CurrentStepPolicy::PromoteFirstIncomplete => {
                log::warn!(
                    "Generation returned an invalid step state ({}); promoting first incomplete step",
                    violation
                );
                working.promote_first_incomplete();
                report.coerced = true;
            }
        }
        report.violation = Some(violation);
    }

    Reconciled {
        document: working,
        report,
    }
}

fn with_fallback(mut urls: Vec<String>, fallback: &str) -> Vec<String> {
    if !fallback.is_empty() && urls.last().map(String::as_str) != Some(fallback) {
        urls.push(fallback.to_string());
    }
    urls
}
