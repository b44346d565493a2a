//! Health Service
//!
//! Builds the `/health` report from three components: the engine's
//! initialization flag, upstream API connectivity and model availability.
//!
//! The upstream probe runs on its own task. `/health` waits at most
//! `probe_timeout` for it and otherwise answers from the last completed probe,
//! so a slow upstream never slows the health endpoint down.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::HealthSettings;
use crate::models::{
    ComponentHealth, HealthComponents, HealthReport, HealthStatus, ModelRegistry, FLAN_T5_BASE,
};
use crate::services::analysis_engine::AnalysisEngine;

pub const SERVICE_NAME: &str = "ai-engine";

/// Clears the in-flight flag when the probe task ends, panics included
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Completed upstream probe
#[derive(Debug, Clone)]
struct ProbeOutcome {
    result: Result<Duration, String>,
    completed: Instant,
    checked_at: String,
}

pub struct HealthService {
    engine: Arc<AnalysisEngine>,
    registry: Arc<ModelRegistry>,
    settings: HealthSettings,
    startup_time: DateTime<Utc>,
    last_probe: Arc<Mutex<Option<ProbeOutcome>>>,
    probe_in_flight: Arc<AtomicBool>,
}

impl HealthService {
    pub fn new(
        engine: Arc<AnalysisEngine>,
        registry: Arc<ModelRegistry>,
        settings: HealthSettings,
        startup_time: DateTime<Utc>,
    ) -> Self {
        Self {
            engine,
            registry,
            settings,
            startup_time,
            last_probe: Arc::new(Mutex::new(None)),
            probe_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current health report; never fails
    pub async fn health(&self) -> HealthReport {
        let ai_engine = if self.engine.is_initialized() {
            ComponentHealth::new(HealthStatus::Healthy, "AI engine initialized and ready")
        } else {
            ComponentHealth::new(HealthStatus::Unhealthy, "AI engine not initialized")
        };

        let huggingface_api = self.check_upstream().await;
        let models = self.check_models(huggingface_api.status);

        let status = aggregate_status(&ai_engine, &huggingface_api, &models);
        if status != HealthStatus::Healthy {
            tracing::debug!(status = status.as_str(), "Health check not healthy");
        }

        HealthReport {
            status,
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: (Utc::now() - self.startup_time).num_seconds().max(0) as u64,
            timestamp: clarity_common::time::envelope_timestamp(),
            components: HealthComponents {
                ai_engine,
                huggingface_api,
                models,
            },
        }
    }

    fn cached_probe(&self) -> Option<ProbeOutcome> {
        self.last_probe
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    async fn check_upstream(&self) -> ComponentHealth {
        if !self.engine.backend().is_configured() {
            return ComponentHealth::new(
                HealthStatus::Unhealthy,
                "Inference API token not configured",
            );
        }

        let cached = self.cached_probe();
        if let Some(outcome) = &cached {
            if outcome.completed.elapsed() < self.settings.probe_cache_ttl {
                return self.probe_component(outcome);
            }
        }

        let Some(handle) = self.spawn_probe() else {
            return self.fallback_component(cached.as_ref());
        };

        match tokio::time::timeout(self.settings.probe_timeout, handle).await {
            Ok(Ok(outcome)) => self.probe_component(&outcome),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Upstream probe task failed");
                let mut component =
                    ComponentHealth::new(HealthStatus::Unhealthy, "Inference API check failed");
                component.last_error = Some(e.to_string());
                component
            }
            // Probe keeps running detached and refreshes the cache when done
            Err(_) => self.fallback_component(cached.as_ref()),
        }
    }

    /// Start a probe unless one is already running
    fn spawn_probe(&self) -> Option<tokio::task::JoinHandle<ProbeOutcome>> {
        if self.probe_in_flight.swap(true, Ordering::AcqRel) {
            return None;
        }

        let backend = Arc::clone(self.engine.backend());
        let last_probe = Arc::clone(&self.last_probe);
        let guard = InFlightGuard(Arc::clone(&self.probe_in_flight));

        Some(tokio::spawn(async move {
            let _guard = guard;
            let result = backend.probe(FLAN_T5_BASE).await.map_err(|e| e.to_string());
            let outcome = ProbeOutcome {
                result,
                completed: Instant::now(),
                checked_at: clarity_common::time::envelope_timestamp(),
            };

            *last_probe.lock().unwrap_or_else(|p| p.into_inner()) = Some(outcome.clone());
            outcome
        }))
    }

    fn fallback_component(&self, cached: Option<&ProbeOutcome>) -> ComponentHealth {
        match cached {
            Some(outcome) => {
                let mut component = self.probe_component(outcome);
                component.message = format!("{} (last known)", component.message);
                component
            }
            None => ComponentHealth::new(
                HealthStatus::Degraded,
                "Inference API connectivity check pending",
            ),
        }
    }

    fn probe_component(&self, outcome: &ProbeOutcome) -> ComponentHealth {
        let mut component = match &outcome.result {
            Ok(latency) if *latency > self.settings.slow_threshold => {
                let mut c = ComponentHealth::new(HealthStatus::Degraded, "Inference API responding slowly");
                c.response_time_ms = Some(latency.as_millis() as u64);
                c
            }
            Ok(latency) => {
                let mut c = ComponentHealth::new(HealthStatus::Healthy, "API connectivity verified");
                c.response_time_ms = Some(latency.as_millis() as u64);
                c
            }
            Err(e) => {
                let mut c =
                    ComponentHealth::new(HealthStatus::Unhealthy, "Inference API unreachable");
                c.last_error = Some(e.clone());
                c
            }
        };
        component.checked_at = outcome.checked_at.clone();
        component
    }

    fn check_models(&self, upstream: HealthStatus) -> ComponentHealth {
        if self.registry.is_empty() {
            return ComponentHealth::new(HealthStatus::Unhealthy, "No models registered");
        }

        let registered = self.registry.len();
        let mut component = if upstream == HealthStatus::Healthy {
            ComponentHealth::new(
                HealthStatus::Healthy,
                format!("{} models available", registered),
            )
        } else {
            ComponentHealth::new(
                HealthStatus::Degraded,
                format!("{} models registered, availability unverified", registered),
            )
        };
        component.available_count = Some(if upstream == HealthStatus::Healthy {
            registered
        } else {
            0
        });
        component
    }
}

/// Unhealthy if the engine is down, degraded if any other component is not
/// healthy, healthy otherwise
pub fn aggregate_status(
    ai_engine: &ComponentHealth,
    huggingface_api: &ComponentHealth,
    models: &ComponentHealth,
) -> HealthStatus {
    if ai_engine.status != HealthStatus::Healthy {
        HealthStatus::Unhealthy
    } else if huggingface_api.status != HealthStatus::Healthy
        || models.status != HealthStatus::Healthy
    {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}
