//! Splits raw chat message content into typed, renderable parts.
//!
//! The extraction is heuristic: a fenced JSON block carrying the `tool_call`
//! marker becomes a tool-call part, markdown images become image parts, and
//! whatever is left becomes one trailing text part.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::session::{Message, Role};

pub const TOOL_CALL_MARKER: &str = "tool_call";

static TOOL_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\n(.*?)\n```").expect("tool block pattern")
});

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[(.*?)\]\((.*?)\)").expect("image pattern")
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PartKind {
    Text,
    ToolCall,
    ToolResult,
    Image,
    File,
    Source,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PartMetadata {
    Image { alt: String, src: String },
    File { filename: String },
    Source {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    /// The decoded tool-call JSON, kept verbatim.
    ToolCall(serde_json::Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessagePart {
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PartMetadata>,
}

impl MessagePart {
    pub fn text(content: impl Into<String>) -> Self {
        Self { kind: PartKind::Text, content: content.into(), metadata: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub parts: Vec<MessagePart>,
}

/// Seam for swapping the regex extractor for a grammar- or token-based one.
pub trait MessageContentParser: Send + Sync {
    /// Never empty for non-empty content.
    fn parse_content(&self, content: &str) -> Vec<MessagePart>;

    fn parse(&self, message: &Message) -> ParsedMessage {
        ParsedMessage {
            id: message.id.clone(),
            role: message.role,
            content: message.content.clone(),
            parts: self.parse_content(&message.content),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegexPartParser;

impl RegexPartParser {
    fn tool_call_part(content: &str) -> Option<MessagePart> {
        if !content.contains("```json") || !content.contains(TOOL_CALL_MARKER) {
            return None;
        }
        // First marked block only.
        let caps = TOOL_BLOCK
            .captures_iter(content)
            .find(|c| c[0].contains(TOOL_CALL_MARKER))?;
        let span = caps.get(0)?.as_str();
        match serde_json::from_str::<serde_json::Value>(&caps[1]) {
            Ok(decoded) => Some(MessagePart {
                kind: PartKind::ToolCall,
                content: span.to_string(),
                metadata: Some(PartMetadata::ToolCall(decoded)),
            }),
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse tool call block");
                None
            }
        }
    }

    fn image_parts(content: &str) -> Vec<MessagePart> {
        if !content.contains("![") || !content.contains("](") {
            return Vec::new();
        }
        IMAGE
            .captures_iter(content)
            .map(|c| MessagePart {
                kind: PartKind::Image,
                content: c[0].to_string(),
                metadata: Some(PartMetadata::Image { alt: c[1].to_string(), src: c[2].to_string() }),
            })
            .collect()
    }
}

impl MessageContentParser for RegexPartParser {
    fn parse_content(&self, content: &str) -> Vec<MessagePart> {
        let mut parts: Vec<MessagePart> = Vec::new();
        parts.extend(Self::tool_call_part(content));
        parts.extend(Self::image_parts(content));

        let mut remaining = content.to_string();
        for part in &parts {
            excise(&mut remaining, &part.content);
        }
        let remaining = remaining.trim();
        if !remaining.is_empty() {
            parts.push(MessagePart::text(remaining));
        }

        if parts.is_empty() {
            parts.push(MessagePart::text(content));
        }
        parts
    }
}

/// Removes the first occurrence of `span`. When both sides of the seam are
/// whitespace, the whitespace char after the seam goes too.
fn excise(text: &mut String, span: &str) {
    if span.is_empty() {
        return;
    }
    let Some(start) = text.find(span) else { return };
    let end = start + span.len();
    let ws_before = text[..start].chars().next_back().is_some_and(char::is_whitespace);
    let extra = match text[end..].chars().next() {
        Some(c) if ws_before && c.is_whitespace() => c.len_utf8(),
        _ => 0,
    };
    text.replace_range(start..end + extra, "");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(content: &str) -> Vec<MessagePart> {
        RegexPartParser.parse_content(content)
    }

    fn image(alt: &str, src: &str) -> Option<PartMetadata> {
        Some(PartMetadata::Image { alt: alt.into(), src: src.into() })
    }

    #[test]
    fn plain_text_becomes_single_trimmed_text_part() {
        let parts = parse("  hello there \n");
        assert_eq!(parts, vec![MessagePart::text("hello there")]);
    }

    #[test]
    fn whitespace_only_falls_back_to_original_content() {
        let parts = parse("   ");
        assert_eq!(parts, vec![MessagePart::text("   ")]);
    }

    #[test]
    fn chart_example_extracts_image_then_text() {
        let parts = parse("Here is a chart ![chart](http://x/img.png) and done.");
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].kind, PartKind::Image);
        assert_eq!(parts[0].metadata, image("chart", "http://x/img.png"));
        assert_eq!(parts[1], MessagePart::text("Here is a chart and done."));
    }

    #[test]
    fn images_are_emitted_left_to_right() {
        let parts = parse("![a](1.png) middle ![b](2.png)");
        let images: Vec<_> = parts.iter().filter(|p| p.kind == PartKind::Image).collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].metadata, image("a", "1.png"));
        assert_eq!(images[1].metadata, image("b", "2.png"));
        assert_eq!(parts.last().unwrap(), &MessagePart::text("middle"));
    }

    #[test]
    fn tool_call_block_is_decoded_and_removed_from_text() {
        let content = "Let me look that up.\n```json\n{\"type\": \"tool_call\", \"name\": \"search_google\", \"arguments\": {\"query\": \"rust\"}}\n```\nOne moment.";
        let parts = parse(content);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].kind, PartKind::ToolCall);
        assert_eq!(
            parts[0].metadata,
            Some(PartMetadata::ToolCall(json!({
                "type": "tool_call",
                "name": "search_google",
                "arguments": {"query": "rust"}
            })))
        );
        assert!(parts[0].content.starts_with("```json\n"));
        assert_eq!(parts[1], MessagePart::text("Let me look that up.\nOne moment."));
    }

    #[test]
    fn tool_call_without_surrounding_text_yields_only_tool_part() {
        let content = "```json\n{\"tool_call\": {\"name\": \"x\", \"arguments\": {}}}\n```";
        let parts = parse(content);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].kind, PartKind::ToolCall);
    }

    #[test]
    fn malformed_tool_call_json_degrades_to_text() {
        let content = "```json\n{\"tool_call\": oops\n```";
        let parts = parse(content);
        assert_eq!(parts, vec![MessagePart::text(content)]);
    }

    #[test]
    fn json_block_without_marker_is_plain_text() {
        let content = "tool_call mentioned here\n```json\n{\"a\": 1}\n```";
        let parts = parse(content);
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].kind, PartKind::Text);
    }

    #[test]
    fn only_first_tool_call_block_is_honored() {
        let content = "```json\n{\"tool_call\": {\"name\": \"a\"}}\n```\nand\n```json\n{\"tool_call\": {\"name\": \"b\"}}\n```";
        let parts = parse(content);
        let calls: Vec<_> = parts.iter().filter(|p| p.kind == PartKind::ToolCall).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].metadata, Some(PartMetadata::ToolCall(json!({"tool_call": {"name": "a"}}))));
        let text = parts.last().unwrap();
        assert_eq!(text.kind, PartKind::Text);
        assert!(text.content.contains("\"b\""));
    }

    #[test]
    fn image_inside_tool_block_is_counted_twice() {
        let content = "```json\n{\"tool_call\": {\"name\": \"show\", \"arguments\": {\"md\": \"![x](y.png)\"}}}\n```";
        let parts = parse(content);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].kind, PartKind::ToolCall);
        assert_eq!(parts[1].metadata, image("x", "y.png"));
    }

    #[test]
    fn parsing_is_idempotent() {
        let content = "intro ![a](b) ```json\n{\"tool_call\": 1}\n``` outro";
        assert_eq!(parse(content), parse(content));
    }

    #[test]
    fn parts_serialize_with_kebab_case_types() {
        let part = MessagePart {
            kind: PartKind::ToolCall,
            content: "x".into(),
            metadata: Some(PartMetadata::ToolCall(json!({"name": "n"}))),
        };
        let v = serde_json::to_value(&part).unwrap();
        assert_eq!(v["type"], "tool-call");
        assert_eq!(v["metadata"]["name"], "n");
        let text = serde_json::to_value(MessagePart::text("hi")).unwrap();
        assert!(text.get("metadata").is_none());
    }

    #[test]
    fn parse_keeps_message_identity() {
        let msg = Message::new(Role::Assistant, "hi ![a](b)");
        let parsed = RegexPartParser.parse(&msg);
        assert_eq!(parsed.id, msg.id);
        assert_eq!(parsed.role, Role::Assistant);
        assert_eq!(parsed.content, "hi ![a](b)");
        assert_eq!(parsed.parts.len(), 2);
    }
}
