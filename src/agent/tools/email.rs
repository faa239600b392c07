use super::{copy_arg, short_id, Tool, ToolCall, ToolFuture, ToolPayload};
use serde_json::Value;

pub struct SendEmailTool;

impl Tool for SendEmailTool {
    fn name(&self) -> &'static str { "send_email" }

    fn run<'a>(&'a self, call: &'a ToolCall) -> ToolFuture<'a> {
        Box::pin(async move {
            let mut payload = ToolPayload::new();
            payload.insert("messageId".into(), Value::String(format!("msg_{}", short_id())));
            copy_arg(call, "to", "sentTo", &mut payload);
            Ok(payload)
        })
    }
}
