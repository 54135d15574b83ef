use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Outcome of one agent invocation.
#[derive(Debug, Clone)]
pub struct InvocationMetrics {
    pub agent: &'static str,
    pub duration_ms: u64,
    pub success: bool,
}

#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    invocations: IntCounterVec,
    failures: IntCounterVec,
    invocation_duration: Histogram,
    model_calls: IntCounter,
    tool_calls: IntCounterVec,
    active_invocations: Gauge,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let invocations = IntCounterVec::new(
            Opts::new("agent_invocations_total", "Total number of agent invocations")
                .const_label("component", "agent"),
            &["agent"],
        )?;

        let failures = IntCounterVec::new(
            Opts::new("agent_invocation_failures_total", "Invocations answered with an error message"),
            &["agent"],
        )?;

        let invocation_duration = Histogram::with_opts(
            HistogramOpts::new("agent_invocation_duration_seconds", "Invocation duration in seconds")
                .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let model_calls = IntCounter::with_opts(
            Opts::new("agent_model_calls_total", "Total number of model inference calls"),
        )?;

        let tool_calls = IntCounterVec::new(
            Opts::new("agent_tool_calls_total", "Gateway tool calls by outcome"),
            &["outcome"],
        )?;

        let active_invocations = Gauge::with_opts(
            Opts::new("agent_active_invocations", "Number of invocations in flight"),
        )?;

        registry.register(Box::new(invocations.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(invocation_duration.clone()))?;
        registry.register(Box::new(model_calls.clone()))?;
        registry.register(Box::new(tool_calls.clone()))?;
        registry.register(Box::new(active_invocations.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            invocations,
            failures,
            invocation_duration,
            model_calls,
            tool_calls,
            active_invocations,
        })
    }

    pub fn record_invocation(&self, metrics: InvocationMetrics) {
        self.invocations.with_label_values(&[metrics.agent]).inc();
        self.invocation_duration.observe(metrics.duration_ms as f64 / 1000.0);

        if !metrics.success {
            self.failures.with_label_values(&[metrics.agent]).inc();
        }
    }

    pub fn record_model_call(&self) {
        self.model_calls.inc();
    }

    pub fn record_tool_call(&self, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        self.tool_calls.with_label_values(&[outcome]).inc();
    }

    pub fn increment_active(&self) {
        self.active_invocations.inc();
    }

    pub fn decrement_active(&self) {
        self.active_invocations.dec();
    }

    pub fn model_calls(&self) -> u64 {
        self.model_calls.get()
    }

    /// Prometheus text exposition format.
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| AgentError::Unknown(e.to_string()))
    }
}
