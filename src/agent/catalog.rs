use serde::{Deserialize, Serialize};

use crate::models::AiModel;
use crate::settings::{SessionSettings, DEFAULT_SYSTEM_PROMPT};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub model: AiModel,
    pub system_prompt: String,
    pub capabilities: Vec<String>,
    pub tools: Vec<String>,
    pub is_active: bool,
}

impl AgentProfile {
    fn new(
        id: &str,
        name: &str,
        description: &str,
        model: AiModel,
        system_prompt: &str,
        capabilities: &[&str],
        tools: &[&str],
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            model,
            system_prompt: system_prompt.into(),
            capabilities: capabilities.iter().map(|s| s.to_string()).collect(),
            tools: tools.iter().map(|s| s.to_string()).collect(),
            is_active: false,
        }
    }

    /// The assistant used when a chat is opened without picking an agent.
    pub fn default_assistant() -> Self {
        Self::new("default", "R1 Assistant", "General purpose AI assistant", AiModel::Gpt4o, DEFAULT_SYSTEM_PROMPT, &[], &[])
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            agent_id: Some(self.id.clone()),
            model: Some(self.model.key().into()),
            system_prompt: Some(self.system_prompt.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentCatalog {
    agents: Vec<AgentProfile>,
}

impl Default for AgentCatalog {
    fn default() -> Self {
        let mut agents = vec![
            AgentProfile::new(
                "research-assistant",
                "Research Assistant",
                "Specialized in deep research and data analysis",
                AiModel::Claude37,
                "You are a research assistant specialized in finding accurate information and citing sources.",
                &["Web Search", "Data Analysis", "Citation"],
                &["search_google", "analyze_data", "cite_sources"],
            ),
            AgentProfile::new(
                "code-assistant",
                "Code Assistant",
                "Helps with coding tasks and debugging",
                AiModel::Gpt4o,
                "You are a coding assistant specialized in helping with programming tasks, debugging, and explaining code.",
                &["Code Generation", "Debugging", "Documentation"],
                &["generate_code", "debug_code", "explain_code"],
            ),
            AgentProfile::new(
                "creative-writer",
                "Creative Writer",
                "Generates creative content and ideas",
                AiModel::Claude37,
                "You are a creative writing assistant specialized in generating engaging content across various formats.",
                &["Content Creation", "Storytelling", "Editing"],
                &["generate_content", "edit_content", "brainstorm_ideas"],
            ),
            AgentProfile::new(
                "data-analyst",
                "Data Analyst",
                "Analyzes data and provides insights",
                AiModel::Gpt4o,
                "You are a data analysis assistant specialized in interpreting data and providing actionable insights.",
                &["Data Visualization", "Statistical Analysis", "Trend Identification"],
                &["analyze_data", "visualize_data", "identify_trends"],
            ),
            AgentProfile::new(
                "document-processor",
                "Document Processor",
                "Extracts and processes information from documents",
                AiModel::Gemini2Flash,
                "You are a document processing assistant specialized in extracting and organizing information from various document types.",
                &["Text Extraction", "Summarization", "Information Organization"],
                &["extract_text", "summarize_document", "organize_information"],
            ),
        ];
        agents[0].is_active = true;
        Self { agents }
    }
}

impl AgentCatalog {
    pub fn list(&self) -> &[AgentProfile] {
        &self.agents
    }

    pub fn get(&self, id: &str) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub fn active(&self) -> Option<&AgentProfile> {
        self.agents.iter().find(|a| a.is_active)
    }

    /// Marks `id` as the only active agent. Unknown ids change nothing.
    pub fn switch(&mut self, id: &str) -> Option<&AgentProfile> {
        if self.get(id).is_none() {
            tracing::warn!(agent = id, "switch requested for unknown agent");
            return None;
        }
        for agent in &mut self.agents {
            agent.is_active = agent.id == id;
        }
        tracing::info!(agent = id, "active agent switched");
        self.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_leaves_exactly_one_active() {
        let mut catalog = AgentCatalog::default();
        assert_eq!(catalog.active().map(|a| a.id.as_str()), Some("research-assistant"));
        let picked = catalog.switch("data-analyst").unwrap();
        assert_eq!(picked.id, "data-analyst");
        assert_eq!(catalog.list().iter().filter(|a| a.is_active).count(), 1);
    }

    #[test]
    fn unknown_switch_keeps_current_agent() {
        let mut catalog = AgentCatalog::default();
        assert!(catalog.switch("nobody").is_none());
        assert_eq!(catalog.active().map(|a| a.id.as_str()), Some("research-assistant"));
    }

    #[test]
    fn profiles_serialize_in_camel_case() {
        let catalog = AgentCatalog::default();
        let v = serde_json::to_value(catalog.get("document-processor").unwrap()).unwrap();
        assert_eq!(v["model"], "gemini2Flash");
        assert_eq!(v["isActive"], false);
        assert!(v["systemPrompt"].as_str().unwrap().starts_with("You are a document"));
    }

    #[test]
    fn default_assistant_settings() {
        let s = AgentProfile::default_assistant().session_settings();
        assert_eq!(s.model.as_deref(), Some("gpt4o"));
        assert_eq!(s.system_prompt.as_deref(), Some(DEFAULT_SYSTEM_PROMPT));
    }
}
