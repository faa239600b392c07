use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::agent::tools::{ToolCall, ToolOutcome, ToolPayload, ToolRegistry};

pub const TOOL_FAILURE_MESSAGE: &str = "Tool execution failed";

/// Lifecycle of one tool invocation. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "result", rename_all = "lowercase")]
pub enum ToolRunState {
    Idle,
    Loading,
    Success(ToolOutcome),
    Error(ToolOutcome),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolRun {
    pub call_id: String,
    pub state: ToolRunState,
}

impl ToolRun {
    fn new(call_id: String) -> Self {
        Self { call_id, state: ToolRunState::Idle }
    }

    fn start(&mut self) {
        if self.state == ToolRunState::Idle {
            self.state = ToolRunState::Loading;
        }
    }

    fn finish(&mut self, outcome: ToolOutcome) {
        if self.state != ToolRunState::Loading {
            return;
        }
        self.state = if outcome.success {
            ToolRunState::Success(outcome)
        } else {
            ToolRunState::Error(outcome)
        };
    }

    pub fn outcome(&self) -> Option<&ToolOutcome> {
        match &self.state {
            ToolRunState::Success(o) | ToolRunState::Error(o) => Some(o),
            ToolRunState::Idle | ToolRunState::Loading => None,
        }
    }
}

pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Runs `call` once and reports the outcome to `on_result` under the
    /// call's id (or `tool-<index>`). Unknown tool names succeed with a
    /// generic acknowledgement.
    pub async fn execute<F>(&self, call: &ToolCall, index: usize, on_result: F) -> ToolRun
    where
        F: FnOnce(&str, &ToolOutcome),
    {
        let mut run = ToolRun::new(call.call_id(index));
        run.start();
        let outcome = self.dispatch(call).await;
        let status = if outcome.success { "success" } else { "error" };
        metrics::counter!("tool_executions_total", "status" => status).increment(1);
        run.finish(outcome);
        if let Some(outcome) = run.outcome() {
            on_result(&run.call_id, outcome);
        }
        run
    }

    async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        let Some(tool) = self.registry.get(&call.name) else {
            tracing::info!(tool = %call.name, "no dedicated handler, acknowledging");
            return ToolOutcome::succeeded(acknowledgement(&call.name));
        };
        match tokio::time::timeout(self.timeout, tool.run(call)).await {
            Ok(Ok(payload)) => {
                tracing::info!(tool = %call.name, "tool executed");
                ToolOutcome::succeeded(payload)
            }
            Ok(Err(err)) => {
                tracing::error!(tool = %call.name, kind = "tool_error", error = %err, "tool execution failed");
                ToolOutcome::failed(TOOL_FAILURE_MESSAGE)
            }
            Err(_) => {
                tracing::error!(tool = %call.name, kind = "timeout", timeout_ms = self.timeout.as_millis() as u64, "tool execution failed");
                ToolOutcome::failed(TOOL_FAILURE_MESSAGE)
            }
        }
    }
}

fn acknowledgement(name: &str) -> ToolPayload {
    let mut payload = ToolPayload::new();
    payload.insert("message".into(), Value::String(format!("Executed {name} successfully")));
    payload.insert(
        "timestamp".into(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    payload
}
