use super::{copy_arg, short_id, Tool, ToolCall, ToolFuture, ToolPayload};
use serde_json::Value;

pub struct CreateCalendarEventTool;

impl Tool for CreateCalendarEventTool {
    fn name(&self) -> &'static str { "create_calendar_event" }

    fn run<'a>(&'a self, call: &'a ToolCall) -> ToolFuture<'a> {
        Box::pin(async move {
            let mut payload = ToolPayload::new();
            payload.insert("eventId".into(), Value::String(format!("evt_{}", short_id())));
            copy_arg(call, "title", "title", &mut payload);
            copy_arg(call, "start", "start", &mut payload);
            Ok(payload)
        })
    }
}
