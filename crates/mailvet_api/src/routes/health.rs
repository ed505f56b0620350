//! Health check and monitoring routes
//!
//! This module contains endpoints for service health checks, readiness probes,
//! and monitoring metrics.

use crate::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use mailvet_core::validation_pipeline::PipelineStats;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint - GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness response
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub timestamp: String,
}

/// Readiness check endpoint - GET /ready
///
/// Ready once the static tables are loaded. No DNS traffic is issued.
pub async fn ready_handler(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadinessResponse>) {
    let stats = state.pipeline.get_stats();
    let ready = stats.disposable_domains_count > 0 && stats.free_providers_count > 0;

    if !ready {
        warn!("Readiness check failed: intelligence tables are empty");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }),
    )
}

/// Metrics endpoint - GET /metrics
///
/// Returns Prometheus-compatible metrics for monitoring.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.pipeline.get_stats();
    let metrics = render_metrics(&stats, state.result_cache.len());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics,
    )
}

fn render_metrics(stats: &PipelineStats, cached_outcomes: usize) -> String {
    let series: [(&str, &str, &str, u64); 8] = [
        ("mailvet_validations_total", "counter", "Addresses validated", stats.validations_total),
        ("mailvet_batches_total", "counter", "Batch requests processed", stats.batches_total),
        (
            "mailvet_domain_resolutions_total",
            "counter",
            "Distinct domain DNS resolutions",
            stats.domain_resolutions_total,
        ),
        (
            "mailvet_disposable_domains",
            "gauge",
            "Domains in the disposable list",
            stats.disposable_domains_count as u64,
        ),
        ("mailvet_role_prefixes", "gauge", "Role-based local part prefixes", stats.role_prefixes_count as u64),
        ("mailvet_free_providers", "gauge", "Free consumer mail providers", stats.free_providers_count as u64),
        ("mailvet_typo_entries", "gauge", "Known domain misspellings", stats.typo_entries_count as u64),
        ("mailvet_cached_outcomes", "gauge", "Stored owner outcomes", cached_outcomes as u64),
    ];

    let mut output = String::new();
    for (name, kind, help, value) in series {
        output.push_str(&format!("# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"));
    }
    output.push_str(&format!(
        "# HELP mailvet_build_info Build information\n# TYPE mailvet_build_info gauge\nmailvet_build_info{{version=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION")
    ));
    output
}

/// Statistics response
#[derive(Serialize)]
pub struct StatsResponse {
    pub version: String,
    pub pipeline_stats: PipelineStats,
    pub cached_outcomes: usize,
    pub timestamp: String,
}

/// Statistics endpoint - GET /admin/stats
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        pipeline_stats: state.pipeline.get_stats(),
        cached_outcomes: state.result_cache.len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
