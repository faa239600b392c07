use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LanguageModel, ModelRequest, ModelResponse};
use crate::parser::{MessageContentParser, ParsedMessage, RegexPartParser};
use crate::settings::EffectiveSettings;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A message handed to [`ChatSession::append`]; the id is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub id: Option<String>,
    pub role: Role,
    pub content: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("input is empty")]
    EmptyInput,
    #[error("a submission is already in flight")]
    Busy,
}

/// Model call prepared by [`ChatSession::begin_submit`].
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub request: ModelRequest,
}

pub struct ChatSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub settings: EffectiveSettings,
    parser: Arc<dyn MessageContentParser>,
    messages: Vec<Message>,
    parsed: Vec<ParsedMessage>,
    input: String,
    loading: bool,
    error: Option<String>,
}

impl ChatSession {
    pub fn new(settings: EffectiveSettings) -> Self {
        Self::with_parser(settings, Arc::new(RegexPartParser))
    }

    pub fn with_parser(settings: EffectiveSettings, parser: Arc<dyn MessageContentParser>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            settings,
            parser,
            messages: Vec::new(),
            parsed: Vec::new(),
            input: String::new(),
            loading: false,
            error: None,
        }
    }

    pub fn messages(&self) -> &[ParsedMessage] {
        &self.parsed
    }

    /// Unparsed history, with creation timestamps.
    pub fn raw_messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn append(&mut self, msg: NewMessage) -> &ParsedMessage {
        let mut message = Message::new(msg.role, msg.content);
        if let Some(id) = msg.id {
            message.id = id;
        }
        self.messages.push(message);
        self.reparse();
        &self.parsed[self.parsed.len() - 1]
    }

    /// Whole-list rederivation; O(total content) per mutation.
    fn reparse(&mut self) {
        self.parsed = self.messages.iter().map(|m| self.parser.parse(m)).collect();
    }

    /// Validates the input, records the user turn and raises the loading
    /// flag. The returned request must be fed back via [`Self::complete_submit`].
    pub fn begin_submit(&mut self, raw_input: &str, settings: &EffectiveSettings) -> Result<PendingTurn, SubmitError> {
        let text = raw_input.trim();
        if text.is_empty() {
            return Err(SubmitError::EmptyInput);
        }
        if self.loading {
            return Err(SubmitError::Busy);
        }
        self.loading = true;
        self.error = None;
        self.input.clear();
        self.append(NewMessage { id: None, role: Role::User, content: text.to_string() });
        metrics::counter!("chat_submissions_total").increment(1);
        tracing::info!(session = %self.id, model = settings.model.key(), "submitting chat turn");

        Ok(PendingTurn {
            request: ModelRequest {
                model: settings.model.provider_id().to_string(),
                prompt: text.to_string(),
                system: settings.system_prompt.clone(),
            },
        })
    }

    pub fn complete_submit(&mut self, outcome: anyhow::Result<ModelResponse>) {
        self.loading = false;
        match outcome {
            Ok(resp) => {
                self.append(NewMessage { id: None, role: Role::Assistant, content: resp.content });
            }
            Err(err) => {
                metrics::counter!("chat_model_failures_total").increment(1);
                tracing::error!(session = %self.id, error = %err, "model call failed");
                self.error = Some(err.to_string());
            }
        }
    }

    /// Single-task convenience over `begin_submit` + `complete_submit`.
    pub async fn submit(
        &mut self,
        model: &dyn LanguageModel,
        raw_input: &str,
        settings: Option<&EffectiveSettings>,
    ) -> Result<(), SubmitError> {
        let settings = settings.cloned().unwrap_or_else(|| self.settings.clone());
        let pending = self.begin_submit(raw_input, &settings)?;
        let outcome = model.generate(pending.request).await;
        self.complete_submit(outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AiModel;
    use crate::parser::PartKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedModel {
        reply: Option<String>,
        calls: Mutex<Vec<ModelRequest>>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, req: ModelRequest) -> anyhow::Result<ModelResponse> {
            self.calls.lock().unwrap().push(req.clone());
            match &self.reply {
                Some(r) => Ok(ModelResponse { content: r.clone(), model: req.model }),
                None => anyhow::bail!("upstream unavailable"),
            }
        }
    }

    fn settings() -> EffectiveSettings {
        EffectiveSettings { model: AiModel::Claude37, system_prompt: Some("sys".into()) }
    }

    #[tokio::test]
    async fn submit_appends_user_then_assistant() {
        let model = ScriptedModel { reply: Some("Sure ![c](c.png)".into()), ..Default::default() };
        let mut s = ChatSession::new(settings());
        s.submit(&model, "  draw a chart  ", None).await.unwrap();

        let msgs = s.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[0].content, "draw a chart");
        assert_eq!(msgs[1].role, Role::Assistant);
        assert_eq!(msgs[1].parts[0].kind, PartKind::Image);
        assert!(!s.is_loading());
        assert!(s.error().is_none());

        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "claude-3-7-sonnet-20240307");
        assert_eq!(calls[0].prompt, "draw a chart");
        assert_eq!(calls[0].system.as_deref(), Some("sys"));
    }

    #[tokio::test]
    async fn empty_submit_is_a_noop() {
        let model = ScriptedModel { reply: Some("x".into()), ..Default::default() };
        let mut s = ChatSession::new(settings());
        assert_eq!(s.submit(&model, " \n\t", None).await, Err(SubmitError::EmptyInput));
        assert!(s.messages().is_empty());
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn second_submit_rejected_while_loading() {
        let mut s = ChatSession::new(settings());
        let _pending = s.begin_submit("first", &settings()).unwrap();
        assert!(s.is_loading());
        assert_eq!(s.begin_submit("second", &settings()).unwrap_err(), SubmitError::Busy);
        assert_eq!(s.messages().len(), 1);

        s.complete_submit(Ok(ModelResponse { content: "done".into(), model: "m".into() }));
        assert!(!s.is_loading());
        assert!(s.begin_submit("second", &settings()).is_ok());
        assert_eq!(s.messages().len(), 3);
    }

    #[tokio::test]
    async fn model_failure_sets_error_without_assistant_message() {
        let model = ScriptedModel::default();
        let mut s = ChatSession::new(settings());
        s.set_input("hello");
        s.submit(&model, "hello", None).await.unwrap();
        assert_eq!(s.messages().len(), 1);
        assert!(!s.is_loading());
        assert_eq!(s.error(), Some("upstream unavailable"));
        assert_eq!(s.input(), "");
    }

    #[tokio::test]
    async fn request_settings_override_session_settings() {
        let model = ScriptedModel { reply: Some("ok".into()), ..Default::default() };
        let mut s = ChatSession::new(settings());
        let custom = EffectiveSettings { model: AiModel::Gemini2Flash, system_prompt: None };
        s.submit(&model, "hi", Some(&custom)).await.unwrap();
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls[0].model, "gemini-2-flash");
        assert!(calls[0].system.is_none());
    }

    #[test]
    fn append_assigns_ids_and_keeps_given_ones() {
        let mut s = ChatSession::new(settings());
        let generated = s.append(NewMessage { id: None, role: Role::System, content: "boot".into() }).id.clone();
        assert!(Uuid::parse_str(&generated).is_ok());
        let given = s.append(NewMessage { id: Some("m-42".into()), role: Role::User, content: "hi".into() });
        assert_eq!(given.id, "m-42");
        assert_eq!(s.messages().len(), 2);
        assert_eq!(s.messages()[1].parts.len(), 1);
    }

    #[test]
    fn raw_messages_mirror_parsed_history() {
        let mut s = ChatSession::new(settings());
        s.append(NewMessage { id: Some("a".into()), role: Role::User, content: "  see ![x](x.png)  ".into() });
        s.append(NewMessage { id: Some("b".into()), role: Role::Assistant, content: "ok".into() });

        let raw = s.raw_messages();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].content, "  see ![x](x.png)  ");
        assert!(raw[0].created_at <= raw[1].created_at);
        let ids: Vec<_> = s.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, raw.iter().map(|m| m.id.as_str()).collect::<Vec<_>>());
    }
}
