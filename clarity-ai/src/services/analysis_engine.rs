//! Analysis Engine
//!
//! Request façade: validate, route, infer within the time budget, shape the
//! result. On failure the raw error is classified, recorded, handed to the
//! monitoring reporter and translated into a caller-facing [`ApiError`].
//!
//! **Flow:**
//! 1. Engine initialized?
//! 2. Content non-empty and within the size limit
//! 3. Resolve model (override or routing table)
//! 4. Per-type inference under the overall analysis budget
//! 5. Confidence + recommendations per analysis type

use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::AnalysisSettings;
use crate::error::{ApiError, ApiResult, FailureClass};
use crate::models::{AnalysisRequest, AnalysisResult, AnalysisType, BART_LARGE_MNLI};
use crate::services::error_aggregator::ErrorAggregator;
use crate::services::error_classifier::classify;
use crate::services::inference_client::{
    parse_generated_text, parse_zero_shot_labels, InferenceBackend, InferenceFailure,
};
use crate::services::model_router::resolve_model;
use crate::services::monitoring_reporter::MonitoringReporter;
use crate::services::retry::retry_transient;

/// Request parameters forwarded to the generation model
pub const GENERATION_PARAMETERS: [&str; 5] = [
    "max_new_tokens",
    "temperature",
    "top_p",
    "top_k",
    "repetition_penalty",
];

pub const DEFAULT_CANDIDATE_LABELS: [&str; 3] = [
    "functional requirement",
    "non-functional requirement",
    "constraint",
];

/// Zero-shot labels must score above this to count as a classification
const CLASSIFICATION_THRESHOLD: f64 = 0.5;

/// Failed inference step, tagged with the model it ran against
struct StepFailure {
    model_id: String,
    failure: InferenceFailure,
}

impl StepFailure {
    fn on(model_id: &str) -> impl FnOnce(InferenceFailure) -> StepFailure + '_ {
        move |failure| StepFailure {
            model_id: model_id.to_string(),
            failure,
        }
    }
}

pub struct AnalysisEngine {
    backend: Arc<dyn InferenceBackend>,
    aggregator: Arc<ErrorAggregator>,
    reporter: Arc<MonitoringReporter>,
    settings: AnalysisSettings,
    /// Hard bound on a single inference call
    request_timeout: Duration,
    initialized: AtomicBool,
}

impl AnalysisEngine {
    /// Build an engine; it rejects work until [`set_initialized`](Self::set_initialized)
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        aggregator: Arc<ErrorAggregator>,
        reporter: Arc<MonitoringReporter>,
        settings: AnalysisSettings,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            aggregator,
            reporter,
            settings,
            request_timeout,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Release);
    }

    pub fn backend(&self) -> &Arc<dyn InferenceBackend> {
        &self.backend
    }

    /// Run one analysis
    pub async fn analyze(&self, request: AnalysisRequest) -> ApiResult<AnalysisResult> {
        if !self.is_initialized() {
            return Err(ApiError::ModelUnavailable(
                "AI engine not initialized".to_string(),
            ));
        }

        self.validate_content(request.content())?;
        let model_id = resolve_model(request.analysis_type(), request.model())?;

        let analysis_id = Uuid::new_v4();
        let start = Instant::now();
        tracing::info!(
            %analysis_id,
            analysis_type = %request.analysis_type(),
            model_id = %model_id,
            content_chars = request.content().chars().count(),
            "Starting analysis"
        );

        let deadline = start + self.settings.timeout;
        match self.run(&request, &model_id, deadline).await {
            Ok((results, confidence)) => {
                let processing_time_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    %analysis_id,
                    analysis_type = %request.analysis_type(),
                    processing_time_ms,
                    confidence,
                    "Analysis completed"
                );
                let recommendations = request
                    .analysis_type()
                    .recommendations()
                    .iter()
                    .map(|r| r.to_string())
                    .collect();
                Ok(AnalysisResult::new(
                    analysis_id,
                    results,
                    confidence,
                    recommendations,
                    processing_time_ms,
                ))
            }
            Err(step) => Err(self.handle_failure(&step.model_id, step.failure, analysis_id)),
        }
    }

    fn validate_content(&self, content: &str) -> ApiResult<()> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation("content must not be empty".to_string()));
        }

        let length = content.chars().count();
        let max = self.settings.max_content_chars;
        if length > max {
            return Err(ApiError::ContentTooLarge { length, max });
        }

        Ok(())
    }

    /// Run one inference step against the shared analysis deadline
    ///
    /// Running out of budget counts as a timeout of the step's own model.
    async fn step<T, F>(
        &self,
        model_id: &str,
        deadline: Instant,
        step: F,
    ) -> Result<T, StepFailure>
    where
        F: Future<Output = Result<T, InferenceFailure>>,
    {
        tokio::time::timeout_at(deadline, step)
            .await
            .unwrap_or(Err(InferenceFailure::Timeout(self.settings.timeout)))
            .map_err(StepFailure::on(model_id))
    }

    async fn run(
        &self,
        request: &AnalysisRequest,
        model_id: &str,
        deadline: Instant,
    ) -> Result<(Map<String, Value>, f64), StepFailure> {
        let analysis_type = request.analysis_type();
        let prompt = build_prompt(analysis_type, request.content(), request.parameters());
        let generation_params = generation_parameters(request.parameters());

        let text = self
            .step(
                model_id,
                deadline,
                self.generate(model_id, &prompt, &generation_params),
            )
            .await?;

        let mut results = Map::new();
        results.insert("analysis_type".to_string(), json!(analysis_type.as_str()));
        results.insert("model_used".to_string(), json!(model_id));

        let confidence = match analysis_type {
            AnalysisType::CodeReview => code_review_confidence(&text),
            AnalysisType::RequirementExtraction => {
                let labels = candidate_labels(request.parameters());
                let classifications = self
                    .step(
                        BART_LARGE_MNLI,
                        deadline,
                        self.classify_zero_shot(request.content(), &labels),
                    )
                    .await?;
                let confidence = if classifications.is_empty() { 0.6 } else { 0.8 };
                results.insert("classifications".to_string(), json!(classifications));
                confidence
            }
            AnalysisType::TechRecommendation => 0.75,
            AnalysisType::RiskAssessment => 0.7,
        };

        results.insert(analysis_type.result_key().to_string(), Value::String(text));
        Ok((results, confidence))
    }

    async fn generate(
        &self,
        model_id: &str,
        prompt: &str,
        parameters: &Map<String, Value>,
    ) -> Result<String, InferenceFailure> {
        let output = retry_transient("text generation", &self.settings.retry, || {
            self.backend
                .infer(model_id, prompt, parameters, self.request_timeout)
        })
        .await?;

        parse_generated_text(&output)
    }

    async fn classify_zero_shot(
        &self,
        content: &str,
        labels: &[String],
    ) -> Result<Vec<String>, InferenceFailure> {
        let mut parameters = Map::new();
        parameters.insert("candidate_labels".to_string(), json!(labels));

        let output = retry_transient("zero-shot classification", &self.settings.retry, || {
            self.backend
                .infer(BART_LARGE_MNLI, content, &parameters, self.request_timeout)
        })
        .await?;

        parse_zero_shot_labels(&output, CLASSIFICATION_THRESHOLD)
    }

    /// Classify, record, report; the lock is released before dispatch
    fn handle_failure(
        &self,
        model_id: &str,
        failure: InferenceFailure,
        request_id: Uuid,
    ) -> ApiError {
        let event = classify(&failure, model_id, request_id);
        let class = FailureClass::from_failure(&failure, event.error_code);
        let count = self.aggregator.record(event.clone());

        tracing::error!(
            %request_id,
            error_code = %event.error_code,
            model_id,
            count,
            caller_class = class.as_str(),
            error = %failure,
            "Inference failed"
        );

        self.reporter.dispatch(&event, count);

        ApiError::Inference { class, event }
    }
}

/// Per-type instruction, caller content, and optional focus areas
pub fn build_prompt(
    analysis_type: AnalysisType,
    content: &str,
    parameters: &Map<String, Value>,
) -> String {
    let mut prompt = format!("{}:\n\n{}", analysis_type.prompt_preamble(), content);

    let focus_areas: Vec<&str> = parameters
        .get("focus_areas")
        .and_then(Value::as_array)
        .map(|areas| areas.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if !focus_areas.is_empty() {
        prompt.push_str("\n\nFocus areas: ");
        prompt.push_str(&focus_areas.join(", "));
    }

    prompt
}

/// Subset of request parameters understood by the generation model
pub fn generation_parameters(parameters: &Map<String, Value>) -> Map<String, Value> {
    parameters
        .iter()
        .filter(|(key, _)| GENERATION_PARAMETERS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn candidate_labels(parameters: &Map<String, Value>) -> Vec<String> {
    let labels: Vec<String> = parameters
        .get("candidate_labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(Value::as_str)
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if labels.is_empty() {
        DEFAULT_CANDIDATE_LABELS.iter().map(|l| l.to_string()).collect()
    } else {
        labels
    }
}

/// Longer reviews score higher, within 0.6..=0.95
pub fn code_review_confidence(text: &str) -> f64 {
    (text.chars().count() as f64 / 500.0).clamp(0.6, 0.95)
}
