//! Analysis request/result types
//!
//! The four analysis types form a closed set; every per-type behavior
//! (prompt, result key, recommendations) is an exhaustive match on
//! [`AnalysisType`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Requested analysis type did not match any supported value
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unsupported analysis type: {0}")]
pub struct UnsupportedAnalysisType(pub String);

/// Supported analysis types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    /// Code quality, bugs and improvements
    CodeReview,
    /// Requirements pulled out of project documentation
    RequirementExtraction,
    /// Technology stack recommendations
    TechRecommendation,
    /// Project risks and mitigation strategies
    RiskAssessment,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 4] = [
        AnalysisType::CodeReview,
        AnalysisType::RequirementExtraction,
        AnalysisType::TechRecommendation,
        AnalysisType::RiskAssessment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::CodeReview => "code_review",
            AnalysisType::RequirementExtraction => "requirement_extraction",
            AnalysisType::TechRecommendation => "tech_recommendation",
            AnalysisType::RiskAssessment => "risk_assessment",
        }
    }

    /// Instruction placed ahead of the caller's content
    pub fn prompt_preamble(&self) -> &'static str {
        match self {
            AnalysisType::CodeReview => {
                "Review the following code and provide feedback on quality, potential issues, and improvements"
            }
            AnalysisType::RequirementExtraction => {
                "Extract and list the key requirements from the following text"
            }
            AnalysisType::TechRecommendation => {
                "Based on the following project description, recommend appropriate technologies and tools"
            }
            AnalysisType::RiskAssessment => {
                "Identify potential risks and mitigation strategies for the following"
            }
        }
    }

    /// Key under which the generated text appears in `results`
    pub fn result_key(&self) -> &'static str {
        match self {
            AnalysisType::CodeReview => "review",
            AnalysisType::RequirementExtraction => "requirements",
            AnalysisType::TechRecommendation => "recommendations",
            AnalysisType::RiskAssessment => "risk_assessment",
        }
    }

    /// Follow-up actions attached to every successful analysis of this type
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            AnalysisType::CodeReview => &[
                "Consider implementing automated testing",
                "Review code documentation",
                "Ensure proper error handling",
            ],
            AnalysisType::RequirementExtraction => &[
                "Prioritize requirements by business value",
                "Validate requirements with stakeholders",
                "Consider technical feasibility",
            ],
            AnalysisType::TechRecommendation => &[
                "Evaluate team expertise with recommended technologies",
                "Consider scalability requirements",
                "Assess maintenance and support costs",
            ],
            AnalysisType::RiskAssessment => &[
                "Develop contingency plans for high-risk items",
                "Schedule regular risk assessment reviews",
                "Implement monitoring and alerting",
            ],
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = UnsupportedAnalysisType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnalysisType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnsupportedAnalysisType(s.to_string()))
    }
}

/// A validated-type analysis request
///
/// Fields are private; a request is immutable once built.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    content: String,
    analysis_type: AnalysisType,
    model: Option<String>,
    parameters: Map<String, Value>,
}

impl AnalysisRequest {
    pub fn new(content: impl Into<String>, analysis_type: AnalysisType) -> Self {
        Self {
            content: content.into(),
            analysis_type,
            model: None,
            parameters: Map::new(),
        }
    }

    /// Explicit model override (bypasses the routing table)
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn analysis_type(&self) -> AnalysisType {
        self.analysis_type
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }
}

/// Result of one successful analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: Uuid,
    pub results: Map<String, Value>,
    /// Always within 0.0..=1.0
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub processing_time_ms: u64,
}

impl AnalysisResult {
    pub fn new(
        analysis_id: Uuid,
        results: Map<String, Value>,
        confidence: f64,
        recommendations: Vec<String>,
        processing_time_ms: u64,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            analysis_id,
            results,
            confidence,
            recommendations,
            processing_time_ms,
        }
    }
}
