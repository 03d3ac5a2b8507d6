use uuid::Uuid;

/// Generate an OpenTelemetry-compatible trace ID (32 hex characters).
pub fn generate_trace_id() -> String {
    Uuid::new_v4().as_simple().to_string()
}

/// Span covering one workflow run. Every phase span nests inside it, so a
/// single `trace_id` ties together all log lines of a run.
pub fn workflow_span(project_id: &str, workflow: &str) -> (tracing::Span, String) {
    let trace_id = generate_trace_id();
    let span = tracing::info_span!(
        "workflow",
        trace_id = %trace_id,
        project_id = %project_id,
        workflow = %workflow,
    );
    (span, trace_id)
}

/// Span for one agent phase inside a workflow.
pub fn phase_span(agent: &str, phase: &str) -> tracing::Span {
    tracing::info_span!("phase", agent = %agent, phase = %phase)
}
