use serde::{Deserialize, Serialize};

use crate::auth::AuthMode;
use crate::models::AiModel;

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are R1, a helpful AI assistant. Answer questions concisely and accurately.";

/// Process-wide defaults, filled from the command line and environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfigDefaults {
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
    pub auth_mode: AuthMode,
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
}

impl Default for GlobalConfigDefaults {
    fn default() -> Self {
        Self {
            default_model: Some(AiModel::Gpt4o.key().into()),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.into()),
            auth_mode: AuthMode::Demo,
            model_timeout_secs: 60,
            tool_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    pub agent_id: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettingsPatch {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
}

impl SessionSettings {
    pub fn apply_patch(&mut self, patch: SessionSettingsPatch) {
        if let Some(model) = patch.model {
            self.model = Some(model);
        }
        if let Some(prompt) = patch.system_prompt {
            self.system_prompt = Some(prompt);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RequestOverrides {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EffectiveSettings {
    pub model: AiModel,
    pub system_prompt: Option<String>,
}

pub fn resolve_effective_settings(
    global: &GlobalConfigDefaults,
    session: &SessionSettings,
    request: &RequestOverrides,
) -> EffectiveSettings {
    let model_key = request
        .model
        .clone()
        .or_else(|| session.model.clone())
        .or_else(|| global.default_model.clone());

    let system_prompt = session
        .system_prompt
        .clone()
        .or_else(|| global.system_prompt.clone());

    EffectiveSettings {
        model: model_key.as_deref().map(AiModel::from_key).unwrap_or_default(),
        system_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_request_over_session_over_global() {
        let global = GlobalConfigDefaults {
            default_model: Some("gemini2Flash".into()),
            system_prompt: Some("global prompt".into()),
            ..GlobalConfigDefaults::default()
        };
        let session = SessionSettings {
            agent_id: Some("research-assistant".into()),
            model: Some("claude37".into()),
            system_prompt: None,
        };
        let request = RequestOverrides { model: Some("gpt4o".into()) };

        let eff = resolve_effective_settings(&global, &session, &request);
        assert_eq!(eff.model, AiModel::Gpt4o);
        assert_eq!(eff.system_prompt.as_deref(), Some("global prompt"));

        let eff = resolve_effective_settings(&global, &session, &RequestOverrides::default());
        assert_eq!(eff.model, AiModel::Claude37);

        let eff = resolve_effective_settings(&global, &SessionSettings::default(), &RequestOverrides::default());
        assert_eq!(eff.model, AiModel::Gemini2Flash);
    }

    #[test]
    fn unknown_model_key_falls_back_to_gpt4o() {
        let request = RequestOverrides { model: Some("llama-9000".into()) };
        let eff = resolve_effective_settings(&GlobalConfigDefaults::default(), &SessionSettings::default(), &request);
        assert_eq!(eff.model, AiModel::Gpt4o);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut s = SessionSettings {
            agent_id: Some("code-assistant".into()),
            model: Some("gpt4o".into()),
            system_prompt: Some("be terse".into()),
        };
        s.apply_patch(SessionSettingsPatch { model: Some("claude37".into()), system_prompt: None });
        assert_eq!(s.model.as_deref(), Some("claude37"));
        assert_eq!(s.system_prompt.as_deref(), Some("be terse"));
        assert_eq!(s.agent_id.as_deref(), Some("code-assistant"));
    }
}
