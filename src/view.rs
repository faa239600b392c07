//! Rendering of parsed messages and the tool-result map that belongs to it.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::agent::tools::{ToolCall, ToolOutcome};
use crate::parser::{MessagePart, ParsedMessage, PartKind, PartMetadata};
use crate::session::Role;

/// One method per part type; `other` receives anything without a
/// dedicated renderer (including malformed metadata).
pub trait PartRenderer {
    fn begin_message(&mut self, _message: &ParsedMessage) {}
    fn text(&mut self, content: &str);
    fn tool_call(&mut self, call: &ToolCall, call_id: &str, result: Option<&ToolOutcome>);
    fn image(&mut self, src: &str, alt: &str);
    fn file(&mut self, filename: &str);
    fn source(&mut self, url: &str, label: &str);
    fn other(&mut self, part: &MessagePart);
    fn end_message(&mut self, _message: &ParsedMessage) {}
}

#[derive(Debug, Clone, Default)]
pub struct ChatView {
    /// Keyed by `(message id, call id)`; positional call ids repeat across messages.
    results: HashMap<(String, String), ToolOutcome>,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any earlier outcome for the same call in the same message.
    pub fn record(&mut self, message_id: &str, call_id: &str, outcome: ToolOutcome) {
        self.results.insert((message_id.to_string(), call_id.to_string()), outcome);
    }

    fn outcome(&self, message_id: &str, call_id: &str) -> Option<&ToolOutcome> {
        self.results.get(&(message_id.to_string(), call_id.to_string()))
    }

    pub fn render<R: PartRenderer>(&self, messages: &[ParsedMessage], renderer: &mut R) {
        for message in messages {
            renderer.begin_message(message);
            for (index, part) in message.parts.iter().enumerate() {
                self.render_part(&message.id, part, index, renderer);
            }
            renderer.end_message(message);
        }
    }

    fn render_part<R: PartRenderer>(&self, message_id: &str, part: &MessagePart, index: usize, renderer: &mut R) {
        match (part.kind, part.metadata.as_ref()) {
            (PartKind::Text, _) => renderer.text(&part.content),
            (PartKind::ToolCall, Some(PartMetadata::ToolCall(raw))) => match ToolCall::from_metadata(raw) {
                Some(call) => {
                    let call_id = call.call_id(index);
                    renderer.tool_call(&call, &call_id, self.outcome(message_id, &call_id));
                }
                None => renderer.other(part),
            },
            (PartKind::Image, Some(PartMetadata::Image { alt, src })) => {
                let alt = if alt.is_empty() { "Generated image" } else { alt.as_str() };
                renderer.image(src, alt);
            }
            (PartKind::Image, _) => renderer.image("", "Generated image"),
            (PartKind::File, Some(PartMetadata::File { filename })) => renderer.file(filename),
            (PartKind::File, _) => renderer.file("File"),
            (PartKind::Source, Some(PartMetadata::Source { url, title })) => {
                let label = title
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .or(Some(url.as_str()).filter(|u| !u.is_empty()))
                    .unwrap_or("Source");
                renderer.source(url, label);
            }
            _ => renderer.other(part),
        }
    }

    /// Serializable view model: parsed messages with tool calls annotated by
    /// their id and any recorded outcome.
    pub fn snapshot(&self, messages: &[ParsedMessage]) -> Vec<MessageView> {
        messages
            .iter()
            .map(|m| MessageView {
                id: m.id.clone(),
                role: m.role,
                content: m.content.clone(),
                parts: m
                    .parts
                    .iter()
                    .enumerate()
                    .map(|(index, part)| {
                        let call = match (&part.kind, &part.metadata) {
                            (PartKind::ToolCall, Some(PartMetadata::ToolCall(raw))) => ToolCall::from_metadata(raw),
                            _ => None,
                        };
                        let call_id = call.map(|c| c.call_id(index));
                        let result = call_id.as_deref().and_then(|id| self.outcome(&m.id, id)).cloned();
                        PartView { part: part.clone(), call_id, result }
                    })
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub parts: Vec<PartView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartView {
    #[serde(flatten)]
    pub part: MessagePart,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolOutcome>,
}

/// Plain-text transcript for terminals.
#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    out: String,
}

impl TranscriptRenderer {
    pub fn finish(self) -> String {
        self.out
    }
}

impl PartRenderer for TranscriptRenderer {
    fn begin_message(&mut self, message: &ParsedMessage) {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        let _ = writeln!(self.out, "[{who}]");
    }

    fn text(&mut self, content: &str) {
        let _ = writeln!(self.out, "{content}");
    }

    fn tool_call(&mut self, call: &ToolCall, call_id: &str, result: Option<&ToolOutcome>) {
        let _ = writeln!(self.out, "tool call {} ({call_id}): {}", call.name, call.arguments);
        match result {
            Some(o) if o.success => {
                let _ = writeln!(self.out, "  -> ok {}", serde_json::Value::Object(o.payload.clone()));
            }
            Some(o) => {
                let _ = writeln!(self.out, "  -> failed {}", serde_json::Value::Object(o.payload.clone()));
            }
            None => {}
        }
    }

    fn image(&mut self, src: &str, alt: &str) {
        let _ = writeln!(self.out, "[image: {alt}] {src}");
    }

    fn file(&mut self, filename: &str) {
        let _ = writeln!(self.out, "[file] {filename}");
    }

    fn source(&mut self, url: &str, label: &str) {
        let _ = writeln!(self.out, "[source] {label} <{url}>");
    }

    fn other(&mut self, part: &MessagePart) {
        let _ = writeln!(self.out, "{}", part.content);
    }

    fn end_message(&mut self, _message: &ParsedMessage) {
        self.out.push('\n');
    }
}
