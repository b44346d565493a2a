//! Hosted model metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Text generation model used by every analysis type
pub const FLAN_T5_BASE: &str = "google/flan-t5-base";

/// Zero-shot classification model used by requirement extraction
pub const BART_LARGE_MNLI: &str = "facebook/bart-large-mnli";

/// Metadata for one hosted model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub capabilities: BTreeSet<String>,
    pub version: String,
    pub provider: String,
}

impl ModelInfo {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        capabilities: &[&str],
        version: &str,
        provider: &str,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
            version: version.to_string(),
            provider: provider.to_string(),
        }
    }
}

/// Read-only registry of the models this engine knows about
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelInfo>,
}

impl ModelRegistry {
    /// The built-in model set
    pub fn standard() -> Self {
        Self {
            models: vec![
                ModelInfo::new(
                    FLAN_T5_BASE,
                    "FLAN-T5 Base",
                    "General-purpose model for natural language understanding",
                    &["text_generation", "question_answering", "summarization"],
                    "base",
                    "Google",
                ),
                ModelInfo::new(
                    BART_LARGE_MNLI,
                    "BART Large MNLI",
                    "Model for zero-shot classification and natural language inference",
                    &["classification", "zero_shot_classification"],
                    "large",
                    "Facebook",
                ),
            ],
        }
    }

    pub fn all(&self) -> &[ModelInfo] {
        &self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
