use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub mod calendar;
pub mod email;
pub mod search;

pub type ToolPayload = Map<String, Value>;
pub type ToolFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<ToolPayload>> + Send + 'a>>;

/// A tool invocation extracted from an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

impl ToolCall {
    /// Accepts `{name, arguments, id?}` or the same nested under `tool_call`.
    pub fn from_metadata(value: &Value) -> Option<Self> {
        let inner = match value.get("tool_call") {
            Some(nested) if nested.is_object() => nested,
            _ => value,
        };
        serde_json::from_value(inner.clone()).ok()
    }

    /// The call's own id, or `tool-<index>` when it has none.
    pub fn call_id(&self, index: usize) -> String {
        self.id.clone().unwrap_or_else(|| format!("tool-{index}"))
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }
}

/// `{success, ...payload}` as reported back to the view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(flatten)]
    pub payload: ToolPayload,
}

impl ToolOutcome {
    pub fn succeeded(payload: ToolPayload) -> Self {
        Self { success: true, payload }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("error".into(), Value::String(error.into()));
        Self { success: false, payload }
    }
}

pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn run<'a>(&'a self, call: &'a ToolCall) -> ToolFuture<'a>;
}

pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn with_default_tools() -> Self {
        let mut r = Self::new();
        r.register(Box::new(search::SearchGoogleTool));
        r.register(Box::new(email::SendEmailTool));
        r.register(Box::new(calendar::CreateCalendarEventTool));
        r
    }

    pub fn register(&mut self, t: Box<dyn Tool>) {
        self.tools.push(t);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.iter().map(|b| b.as_ref()).find(|t| t.name() == name)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_default_tools()
    }
}

/// Seven-character id suffix for mock receipts.
pub(crate) fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..7].to_string()
}

/// Copies `key` from the call arguments into `payload` under `as_key`, if present.
pub(crate) fn copy_arg(call: &ToolCall, key: &str, as_key: &str, payload: &mut ToolPayload) {
    if let Some(v) = call.arg(key) {
        payload.insert(as_key.into(), v.clone());
    }
}
