use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inline formatting applied to a run of recipe text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMark {
    Em,
    Strong,
    Sub,
    Sup,
    Strike,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeMetadata {
    // Free-form strings ("4 servings", "about 20 minutes"); never parsed.
    #[serde(rename = "yield", default, skip_serializing_if = "Option::is_none")]
    pub yields: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<String>,
}

/// A `{text, marks}` run, used for ingredient lines and note paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub marks: BTreeSet<TextMark>,
}

impl TextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: BTreeSet::new(),
        }
    }
}

pub type IngredientLine = TextSpan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub content: Vec<TextSpan>,
}

/// Illustration state of a single instruction step.
///
/// The store only ever moves a field from `Unresolved` to `Resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageField {
    Unresolved { query_text: String },
    Resolved { urls: Vec<String> },
    #[default]
    Absent,
}

impl ImageField {
    pub fn is_unresolved(&self) -> bool {
        matches!(self, ImageField::Unresolved { .. })
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ImageField::Resolved { .. })
    }

    pub fn urls(&self) -> Option<&[String]> {
        match self {
            ImageField::Resolved { urls } => Some(urls),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireStep", into = "WireStep")]
pub struct InstructionStep {
    pub text: String,
    pub marks: BTreeSet<TextMark>,
    pub completed: bool,
    pub current: bool,
    pub notes: Vec<String>,
    pub image: ImageField,
}

impl InstructionStep {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: BTreeSet::new(),
            completed: false,
            current: false,
            notes: Vec::new(),
            image: ImageField::Absent,
        }
    }
}

// The generation service encodes a pending illustration as a plain query string
// flagged with `isQuery: true`; resolved images travel as a URL list.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireStep {
    text: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    marks: BTreeSet<TextMark>,
    completed: bool,
    current: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<WireImage>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_query: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireImage {
    Single(String),
    Candidates(Vec<String>),
}

impl From<WireStep> for InstructionStep {
    fn from(wire: WireStep) -> Self {
        let image = match (wire.image, wire.is_query) {
            (None, _) => ImageField::Absent,
            (Some(WireImage::Single(query)), true) => {
                if query.trim().is_empty() {
                    ImageField::Absent
                } else {
                    ImageField::Unresolved { query_text: query }
                }
            }
            (Some(WireImage::Candidates(queries)), true) => {
                match queries.into_iter().find(|q| !q.trim().is_empty()) {
                    Some(query_text) => ImageField::Unresolved { query_text },
                    None => ImageField::Absent,
                }
            }
            (Some(WireImage::Single(url)), false) => {
                if url.trim().is_empty() {
                    ImageField::Absent
                } else {
                    ImageField::Resolved { urls: vec![url] }
                }
            }
            (Some(WireImage::Candidates(urls)), false) => {
                let urls: Vec<String> = urls.into_iter().filter(|u| !u.trim().is_empty()).collect();
                if urls.is_empty() {
                    ImageField::Absent
                } else {
                    ImageField::Resolved { urls }
                }
            }
        };

        Self {
            text: wire.text,
            marks: wire.marks,
            completed: wire.completed,
            current: wire.current,
            notes: wire.notes,
            image,
        }
    }
}

impl From<InstructionStep> for WireStep {
    fn from(step: InstructionStep) -> Self {
        let (image, is_query) = match step.image {
            ImageField::Unresolved { query_text } => (Some(WireImage::Single(query_text)), true),
            ImageField::Resolved { urls } => (Some(WireImage::Candidates(urls)), false),
            ImageField::Absent => (None, false),
        };

        Self {
            text: step.text,
            marks: step.marks,
            completed: step.completed,
            current: step.current,
            notes: step.notes,
            image,
            is_query,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList<T> {
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> From<Vec<T>> for ItemList<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// The canonical structured recipe, as exchanged with the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecipeMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub ingredients: ItemList<IngredientLine>,
    pub instructions: ItemList<InstructionStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

/// Ways a document can break the "exactly the first incomplete step is current" rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentStepViolation {
    MultipleCurrent { indices: Vec<usize> },
    NoCurrent { expected: usize },
    CurrentNotFirstIncomplete { expected: Option<usize>, found: usize },
}

impl std::fmt::Display for CurrentStepViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurrentStepViolation::MultipleCurrent { indices } => {
                write!(f, "multiple steps marked current: {:?}", indices)
            }
            CurrentStepViolation::NoCurrent { expected } => {
                write!(f, "no step marked current, expected step {}", expected)
            }
            CurrentStepViolation::CurrentNotFirstIncomplete { expected: Some(expected), found } => {
                write!(f, "step {} marked current, but first incomplete step is {}", found, expected)
            }
            CurrentStepViolation::CurrentNotFirstIncomplete { expected: None, found } => {
                write!(f, "step {} marked current, but every step is completed", found)
            }
        }
    }
}

impl RecipeDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            metadata: None,
            description: None,
            ingredients: ItemList::default(),
            instructions: ItemList::default(),
            notes: Vec::new(),
        }
    }

    pub fn steps(&self) -> &[InstructionStep] {
        &self.instructions.items
    }

    /// Index of the first step that is not completed, if any.
    pub fn active_step_index(&self) -> Option<usize> {
        self.instructions.items.iter().position(|step| !step.completed)
    }

    pub fn active_step(&self) -> Option<&InstructionStep> {
        self.active_step_index().map(|idx| &self.instructions.items[idx])
    }

    /// Resolved image candidates for the active step, when it has any.
    pub fn active_step_image(&self) -> Option<&[String]> {
        self.active_step().and_then(|step| step.image.urls())
    }

    /// `(index, query)` for every step still waiting on an image lookup.
    pub fn pending_image_queries(&self) -> Vec<(usize, String)> {
        self.instructions
            .items
            .iter()
            .enumerate()
            .filter_map(|(idx, step)| match &step.image {
                ImageField::Unresolved { query_text } => Some((idx, query_text.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn check_current_step(&self) -> Result<(), CurrentStepViolation> {
        let current: Vec<usize> = self
            .instructions
            .items
            .iter()
            .enumerate()
            .filter(|(_, step)| step.current)
            .map(|(idx, _)| idx)
            .collect();
        let expected = self.active_step_index();

        match (current.as_slice(), expected) {
            ([], None) => Ok(()),
            ([], Some(expected)) => Err(CurrentStepViolation::NoCurrent { expected }),
            ([found], expected) if Some(*found) == expected => Ok(()),
            ([found], expected) => Err(CurrentStepViolation::CurrentNotFirstIncomplete {
                expected,
                found: *found,
            }),
            (indices, _) => Err(CurrentStepViolation::MultipleCurrent {
                indices: indices.to_vec(),
            }),
        }
    }

    /// Marks the first incomplete step as current and clears the flag everywhere else.
    pub fn promote_first_incomplete(&mut self) {
        let active = self.active_step_index();
        for (idx, step) in self.instructions.items.iter_mut().enumerate() {
            step.current = Some(idx) == active;
        }
    }
}
