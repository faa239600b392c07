use super::{Tool, ToolCall, ToolFuture, ToolPayload};
use serde_json::json;

pub struct SearchGoogleTool;

impl Tool for SearchGoogleTool {
    fn name(&self) -> &'static str { "search_google" }

    fn run<'a>(&'a self, call: &'a ToolCall) -> ToolFuture<'a> {
        Box::pin(async move {
            let query = call.arg("query").and_then(|v| v.as_str()).unwrap_or_default();
            tracing::debug!(query, "mock web search");
            let mut payload = ToolPayload::new();
            payload.insert(
                "results".into(),
                json!([
                    {"title": "Search Result 1", "url": "https://example.com/1"},
                    {"title": "Search Result 2", "url": "https://example.com/2"},
                ]),
            );
            Ok(payload)
        })
    }
}
