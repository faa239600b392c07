use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

mod agent;
mod auth;
mod dashboard;
mod models;
mod parser;
mod server;
mod session;
mod settings;
mod view;

use agent::catalog::{AgentCatalog, AgentProfile};
use agent::engine::ToolExecutor;
use agent::tools::{ToolCall, ToolRegistry};
use auth::AuthMode;
use models::{LanguageModel, OpenAICompatible};
use parser::{MessageContentParser, PartKind, PartMetadata, RegexPartParser};
use session::ChatSession;
use settings::{resolve_effective_settings, GlobalConfigDefaults, RequestOverrides};
use view::{ChatView, TranscriptRenderer};

#[derive(Debug, Parser)]
#[command(name = "r1_dashboard")]
#[command(about = "AI agent dashboard backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the dashboard API.
    Start {
        #[arg(long, default_value = "127.0.0.1:7171")]
        listen: String,
        #[arg(long, value_enum, default_value_t = AuthMode::Demo)]
        auth_mode: AuthMode,
        #[arg(long, default_value = "gpt4o")]
        default_model: String,
        #[arg(long)]
        system_prompt: Option<String>,
        #[arg(long, default_value_t = 60)]
        model_timeout_secs: u64,
        #[arg(long, default_value_t = 30)]
        tool_timeout_secs: u64,
        /// Expose Prometheus metrics on this address.
        #[arg(long)]
        metrics_listen: Option<SocketAddr>,
    },
    /// Split a message (file or stdin) into typed parts and print them as JSON.
    Parse {
        file: Option<PathBuf>,
    },
    /// Send one prompt, run any tool call in the reply, print the transcript.
    Chat {
        prompt: String,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value_t = 60)]
        model_timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Start {
            listen,
            auth_mode,
            default_model,
            system_prompt,
            model_timeout_secs,
            tool_timeout_secs,
            metrics_listen,
        } => {
            let addr: SocketAddr = listen.parse()?;
            if let Some(metrics_addr) = metrics_listen {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .with_http_listener(metrics_addr)
                    .install()?;
                tracing::info!(%metrics_addr, "prometheus exporter listening");
            }
            let mut defaults = GlobalConfigDefaults {
                default_model: Some(default_model),
                auth_mode,
                model_timeout_secs,
                tool_timeout_secs,
                ..GlobalConfigDefaults::default()
            };
            if system_prompt.is_some() {
                defaults.system_prompt = system_prompt;
            }
            let model = OpenAICompatible::from_env(Duration::from_secs(model_timeout_secs))?;
            let state = server::AppState::new(defaults, Arc::new(model));
            server::serve(addr, state).await?;
        }
        Commands::Parse { file } => {
            let content = read_content(file.as_deref())?;
            println!("{}", parse_to_json(&content)?);
        }
        Commands::Chat { prompt, agent, model, model_timeout_secs } => {
            let backend = OpenAICompatible::from_env(Duration::from_secs(model_timeout_secs))?;
            let defaults = GlobalConfigDefaults { model_timeout_secs, ..GlobalConfigDefaults::default() };
            let transcript = run_chat(&backend, &defaults, agent.as_deref(), model, &prompt).await?;
            print!("{transcript}");
        }
    }
    Ok(())
}

fn read_content(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(std::io::read_to_string(std::io::stdin())?),
    }
}

fn parse_to_json(content: &str) -> anyhow::Result<String> {
    let parts = RegexPartParser.parse_content(content);
    Ok(serde_json::to_string_pretty(&parts)?)
}

async fn run_chat(
    model: &dyn LanguageModel,
    defaults: &GlobalConfigDefaults,
    agent_id: Option<&str>,
    model_override: Option<String>,
    prompt: &str,
) -> anyhow::Result<String> {
    let agent = match agent_id {
        Some(id) => AgentCatalog::default()
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown agent: {id}"))?,
        None => AgentProfile::default_assistant(),
    };
    let effective = resolve_effective_settings(
        defaults,
        &agent.session_settings(),
        &RequestOverrides { model: model_override },
    );
    let mut session = ChatSession::new(effective.clone());
    session.submit(model, prompt, Some(&effective)).await?;
    if let Some(err) = session.error() {
        anyhow::bail!("model call failed: {err}");
    }

    let executor = ToolExecutor::new(
        ToolRegistry::with_default_tools(),
        Duration::from_secs(defaults.tool_timeout_secs),
    );
    let mut view = ChatView::new();
    for message in session.messages() {
        for (index, part) in message.parts.iter().enumerate() {
            let (PartKind::ToolCall, Some(PartMetadata::ToolCall(raw))) = (part.kind, part.metadata.as_ref()) else {
                continue;
            };
            if let Some(call) = ToolCall::from_metadata(raw) {
                executor.execute(&call, index, |id, outcome| view.record(&message.id, id, outcome.clone())).await;
            }
        }
    }

    let mut renderer = TranscriptRenderer::default();
    view.render(session.messages(), &mut renderer);
    Ok(renderer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ModelRequest, ModelResponse};
    use async_trait::async_trait;
    use std::io::Write;

    struct Fixed(&'static str);

    #[async_trait]
    impl LanguageModel for Fixed {
        async fn generate(&self, req: ModelRequest) -> anyhow::Result<ModelResponse> {
            Ok(ModelResponse { content: self.0.into(), model: req.model })
        }
    }

    #[test]
    fn parse_command_reads_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "look ![cat](cat.png)").unwrap();
        let content = read_content(Some(f.path())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&parse_to_json(&content).unwrap()).unwrap();
        assert_eq!(json[0]["type"], "image");
        assert_eq!(json[1]["content"], "look");
    }

    #[tokio::test]
    async fn chat_runs_tool_calls_into_transcript() {
        let model = Fixed("On it.\n```json\n{\"type\": \"tool_call\", \"name\": \"search_google\", \"arguments\": {\"query\": \"q\"}}\n```");
        let transcript = run_chat(&model, &GlobalConfigDefaults::default(), Some("research-assistant"), None, "search q")
            .await
            .unwrap();
        assert!(transcript.starts_with("[you]\nsearch q\n"));
        assert!(transcript.contains("tool call search_google (tool-0)"));
        assert!(transcript.contains("-> ok"));
        assert!(transcript.contains("On it."));
    }

    #[tokio::test]
    async fn chat_rejects_unknown_agent() {
        let err = run_chat(&Fixed("x"), &GlobalConfigDefaults::default(), Some("ghost"), None, "hi")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
