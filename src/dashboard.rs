//! Fixture data behind the dashboard tiles. Nothing here is persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub action: String,
    pub status: String,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptTemplate {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub duration: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolStatus {
    pub id: String,
    pub name: String,
    pub status: String,
    pub last_sync: String,
}

fn log(id: &str, timestamp: &str, action: &str, status: &str, details: &str) -> LogEntry {
    LogEntry { id: id.into(), timestamp: timestamp.into(), action: action.into(), status: status.into(), details: details.into() }
}

pub fn workflow_logs() -> Vec<LogEntry> {
    vec![
        log("1", "2023-04-16T10:30:00Z", "Model Training", "success", "Successfully trained model with 98% accuracy"),
        log("2", "2023-04-16T09:15:00Z", "Data Processing", "fail", "Failed to process data: Invalid format"),
        log("3", "2023-04-16T08:45:00Z", "API Integration", "success", "Successfully integrated with external API"),
        log("4", "2023-04-16T07:30:00Z", "Backup Creation", "pending", "Creating backup of training data"),
    ]
}

pub fn prompt_library() -> Vec<PromptTemplate> {
    let prompt = |id: &str, title: &str, content: &str, category: &str, tags: &[&str]| PromptTemplate {
        id: id.into(),
        title: title.into(),
        content: content.into(),
        category: category.into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    };
    vec![
        prompt(
            "1",
            "Content Summarization",
            "Summarize the following text in 3 bullet points, highlighting the key insights...",
            "Summarization",
            &["summary", "writing"],
        ),
        prompt(
            "2",
            "Code Explanation",
            "Explain the following code snippet in simple terms, focusing on what it does...",
            "Code",
            &["code", "explanation"],
        ),
        prompt(
            "3",
            "Data Analysis",
            "Analyze this dataset and provide insights on trends, anomalies, and potential actions...",
            "Analysis",
            &["data", "insights"],
        ),
    ]
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// `?q=&status=` on the log viewer. Empty values match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl LogFilter {
    pub fn matches(&self, log: &LogEntry) -> bool {
        let search = match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                contains_ci(&log.action, &q) || contains_ci(&log.details, &q)
            }
            None => true,
        };
        let status = match self.status.as_deref().filter(|s| !s.is_empty()) {
            Some(status) => log.status == status,
            None => true,
        };
        search && status
    }
}

pub fn filter_logs(logs: Vec<LogEntry>, filter: &LogFilter) -> Vec<LogEntry> {
    logs.into_iter().filter(|l| filter.matches(l)).collect()
}

/// `?q=&category=` on the prompt library. Search covers title, content and tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromptFilter {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl PromptFilter {
    pub fn matches(&self, prompt: &PromptTemplate) -> bool {
        let search = match self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let q = q.to_lowercase();
                contains_ci(&prompt.title, &q)
                    || contains_ci(&prompt.content, &q)
                    || prompt.tags.iter().any(|t| contains_ci(t, &q))
            }
            None => true,
        };
        let category = match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(category) => prompt.category == category,
            None => true,
        };
        search && category
    }
}

pub fn filter_prompts(prompts: Vec<PromptTemplate>, filter: &PromptFilter) -> Vec<PromptTemplate> {
    prompts.into_iter().filter(|p| filter.matches(p)).collect()
}

/// Distinct categories in first-seen order.
pub fn prompt_categories(prompts: &[PromptTemplate]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for p in prompts {
        if !categories.contains(&p.category) {
            categories.push(p.category.clone());
        }
    }
    categories
}

pub fn calendar_events() -> Vec<CalendarEvent> {
    let event = |id: &str, title: &str, date: &str, time: &str, duration: &str, kind: &str| CalendarEvent {
        id: id.into(),
        title: title.into(),
        date: date.into(),
        time: time.into(),
        duration: duration.into(),
        kind: kind.into(),
    };
    vec![
        event("1", "Team Standup", "2023-04-16", "09:00", "30m", "meeting"),
        event("2", "Project Deadline", "2023-04-18", "17:00", "0m", "deadline"),
        event("3", "Client Meeting", "2023-04-17", "14:30", "60m", "meeting"),
        event("4", "Review Documentation", "2023-04-16", "13:00", "45m", "reminder"),
    ]
}

pub fn connected_tools() -> Vec<ToolStatus> {
    let tool = |id: &str, name: &str, status: &str, last_sync: &str| ToolStatus {
        id: id.into(),
        name: name.into(),
        status: status.into(),
        last_sync: last_sync.into(),
    };
    vec![
        tool("1", "Google Drive", "connected", "2023-04-16T10:30:00Z"),
        tool("2", "Slack", "connected", "2023-04-16T09:45:00Z"),
        tool("3", "GitHub", "error", "2023-04-15T14:20:00Z"),
        tool("4", "Notion", "disconnected", "2023-04-10T08:15:00Z"),
    ]
}

/// Where generated images point until a real image model is wired in.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=512&width=512";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_serialize_with_dashboard_field_names() {
        let tools = serde_json::to_value(connected_tools()).unwrap();
        assert_eq!(tools[2]["lastSync"], "2023-04-15T14:20:00Z");
        let events = serde_json::to_value(calendar_events()).unwrap();
        assert_eq!(events[1]["type"], "deadline");
        assert_eq!(workflow_logs().len(), 4);
        assert_eq!(prompt_library()[1].category, "Code");
    }

    #[test]
    fn log_filter_matches_text_and_status() {
        let by_text = LogFilter { q: Some("  BACKUP ".into()), status: None };
        let ids: Vec<_> = filter_logs(workflow_logs(), &by_text).into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["4"]);

        let by_status = LogFilter { q: None, status: Some("success".into()) };
        assert_eq!(filter_logs(workflow_logs(), &by_status).len(), 2);

        let both = LogFilter { q: Some("invalid format".into()), status: Some("success".into()) };
        assert!(filter_logs(workflow_logs(), &both).is_empty());

        let empty = LogFilter { q: Some(String::new()), status: Some(String::new()) };
        assert_eq!(filter_logs(workflow_logs(), &empty).len(), 4);
    }

    #[test]
    fn prompt_filter_searches_tags_and_category() {
        let by_tag = PromptFilter { q: Some("insights".into()), category: None };
        let titles: Vec<_> = filter_prompts(prompt_library(), &by_tag).into_iter().map(|p| p.title).collect();
        assert_eq!(titles, vec!["Content Summarization", "Data Analysis"]);

        let by_category = PromptFilter { q: None, category: Some("Code".into()) };
        assert_eq!(filter_prompts(prompt_library(), &by_category)[0].id, "2");

        let wrong_category = PromptFilter { q: Some("code".into()), category: Some("Analysis".into()) };
        assert!(filter_prompts(prompt_library(), &wrong_category).is_empty());

        assert_eq!(prompt_categories(&prompt_library()), vec!["Summarization", "Code", "Analysis"]);
    }
}
