use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::{get, patch, post, put}, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::agent::catalog::{AgentCatalog, AgentProfile};
use crate::agent::engine::ToolExecutor;
use crate::agent::tools::{short_id, ToolCall, ToolOutcome, ToolRegistry};
use crate::auth::{AuthError, AuthService, SignedIn, User};
use crate::dashboard::{self, CalendarEvent, LogEntry, LogFilter, PromptFilter, PromptTemplate, ToolStatus};
use crate::models::LanguageModel;
use crate::parser::{PartKind, PartMetadata};
use crate::session::{ChatSession, SubmitError};
use crate::settings::{
    resolve_effective_settings, GlobalConfigDefaults, RequestOverrides, SessionSettings, SessionSettingsPatch,
};
use crate::view::{ChatView, MessageView};

/// A chat session together with the view state rendered from it.
pub struct ChatEntry {
    pub settings: SessionSettings,
    pub session: ChatSession,
    pub view: ChatView,
}

#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub entry: Arc<Mutex<ChatEntry>>,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<Vec<SessionHandle>>>,
    pub agents: Arc<RwLock<AgentCatalog>>,
    pub auth: Arc<AuthService>,
    pub model: Arc<dyn LanguageModel>,
    pub tools: Arc<ToolExecutor>,
    pub defaults: Arc<GlobalConfigDefaults>,
}

impl AppState {
    pub fn new(defaults: GlobalConfigDefaults, model: Arc<dyn LanguageModel>) -> Self {
        let tool_timeout = std::time::Duration::from_secs(defaults.tool_timeout_secs);
        Self {
            sessions: Arc::new(RwLock::new(Vec::new())),
            agents: Arc::new(RwLock::new(AgentCatalog::default())),
            auth: Arc::new(AuthService::new(defaults.auth_mode)),
            model,
            tools: Arc::new(ToolExecutor::new(ToolRegistry::with_default_tools(), tool_timeout)),
            defaults: Arc::new(defaults),
        }
    }

    async fn find(&self, id: Uuid) -> Result<Arc<Mutex<ChatEntry>>, ApiError> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .find(|h| h.id == id)
            .map(|h| h.entry.clone())
            .ok_or(ApiError::NotFound("session"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Internal(String),
    /// Failure shape of the mocked dashboard endpoints.
    #[error("{0}")]
    Stub(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Stub(message) = self {
            let body = Json(StubResponse { success: false, message: message.into() });
            return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
        }
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Submit(SubmitError::EmptyInput) => StatusCode::BAD_REQUEST,
            ApiError::Submit(SubmitError::Busy) => StatusCode::CONFLICT,
            ApiError::Auth(AuthError::Unavailable) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Auth(AuthError::Unauthenticated) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) | ApiError::Stub(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StubResponse {
    pub success: bool,
    pub message: String,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---- mocked dashboard endpoints ----

#[derive(Debug, Deserialize)]
struct SwitchAgentBody {
    #[serde(rename = "agentId")]
    agent_id: String,
}

async fn switch_agent(State(state): State<AppState>, body: Bytes) -> Result<Json<StubResponse>, ApiError> {
    let body: SwitchAgentBody = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(error = %err, "bad agent switch body");
        ApiError::Stub("Failed to switch agent")
    })?;
    state.agents.write().await.switch(&body.agent_id);
    Ok(Json(StubResponse {
        success: true,
        message: format!("Agent {} activated successfully", body.agent_id),
    }))
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentProfile>> {
    Json(state.agents.read().await.list().to_vec())
}

async fn calendar_events() -> Json<Vec<CalendarEvent>> {
    Json(dashboard::calendar_events())
}

async fn workflow_logs(Query(filter): Query<LogFilter>) -> Json<Vec<LogEntry>> {
    Json(dashboard::filter_logs(dashboard::workflow_logs(), &filter))
}

async fn prompts(Query(filter): Query<PromptFilter>) -> Json<Vec<PromptTemplate>> {
    Json(dashboard::filter_prompts(dashboard::prompt_library(), &filter))
}

async fn prompt_categories() -> Json<Vec<String>> {
    Json(dashboard::prompt_categories(&dashboard::prompt_library()))
}

async fn tool_status() -> Json<Vec<ToolStatus>> {
    Json(dashboard::connected_tools())
}

#[derive(Debug, Deserialize)]
struct SendEmailBody {
    recipient: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendEmailResponse {
    success: bool,
    message: String,
    timestamp: String,
}

async fn send_email(body: Bytes) -> Result<Json<SendEmailResponse>, ApiError> {
    let body: SendEmailBody = serde_json::from_slice(&body).map_err(|_| ApiError::Stub("Failed to send email"))?;
    tracing::info!(
        recipient = %body.recipient,
        subject = body.subject.as_deref().unwrap_or_default(),
        bytes = body.message.as_deref().map(str::len).unwrap_or(0),
        "mock email accepted"
    );
    Ok(Json(SendEmailResponse {
        success: true,
        message: format!("Email sent successfully to {}", body.recipient),
        timestamp: now_iso(),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    message: String,
    file_id: String,
}

async fn upload(body: Bytes) -> Result<Json<UploadResponse>, ApiError> {
    if !body.is_empty() {
        serde_json::from_slice::<serde_json::Value>(&body).map_err(|_| ApiError::Stub("Failed to upload file"))?;
    }
    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully".into(),
        file_id: short_id(),
    }))
}

#[derive(Debug, Deserialize)]
struct GenerateImageBody {
    prompt: String,
}

async fn generate_image(body: Bytes) -> Result<Response, ApiError> {
    let body: GenerateImageBody = serde_json::from_slice(&body).map_err(|_| ApiError::Stub("Failed to generate image"))?;
    let prompt = body.prompt.trim();
    if prompt.is_empty() {
        let body = Json(StubResponse { success: false, message: "Prompt is required".into() });
        return Ok((StatusCode::BAD_REQUEST, body).into_response());
    }
    Ok(Json(serde_json::json!({
        "success": true,
        "src": dashboard::PLACEHOLDER_IMAGE,
        "alt": prompt,
    }))
    .into_response())
}

// ---- auth ----

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn sign_in(State(state): State<AppState>, Json(body): Json<Credentials>) -> Result<Json<SignedIn>, ApiError> {
    Ok(Json(state.auth.sign_in(&body.email, &body.password).await?))
}

async fn sign_up(State(state): State<AppState>, Json(body): Json<Credentials>) -> Result<Json<SignedIn>, ApiError> {
    Ok(Json(state.auth.sign_up(&body.email, &body.password).await?))
}

async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(token) = bearer(&headers) {
        state.auth.sign_out(token).await;
    }
    StatusCode::NO_CONTENT
}

async fn current_session(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>, ApiError> {
    Ok(Json(state.auth.current_user(bearer(&headers)).await?))
}

// ---- chat ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionBody {
    pub agent_id: Option<String>,
    pub settings: Option<SessionSettingsPatch>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub id: Uuid,
}

async fn create_session(
    State(state): State<AppState>,
    Json(body): Json<CreateSessionBody>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let agent = match body.agent_id.as_deref() {
        Some(agent_id) => state.agents.read().await.get(agent_id).cloned().ok_or(ApiError::NotFound("agent"))?,
        None => AgentProfile::default_assistant(),
    };
    let mut settings = agent.session_settings();
    if let Some(patch) = body.settings {
        settings.apply_patch(patch);
    }
    let effective = resolve_effective_settings(&state.defaults, &settings, &RequestOverrides::default());
    let session = ChatSession::new(effective);
    let id = session.id;
    tracing::info!(session = %id, agent = %agent.id, "chat session created");

    let entry = ChatEntry { settings, session, view: ChatView::new() };
    state.sessions.write().await.push(SessionHandle { id, entry: Arc::new(Mutex::new(entry)) });
    Ok(Json(CreateSessionResponse { id }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<Uuid>,
}

async fn list_sessions(State(state): State<AppState>) -> Json<ListSessionsResponse> {
    let sessions = state.sessions.read().await;
    let ids = sessions.iter().map(|s| s.id).collect();
    Json(ListSessionsResponse { sessions: ids })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub settings: SessionSettings,
    pub model: &'static str,
    pub messages: Vec<MessageView>,
    pub input: String,
    pub loading: bool,
    pub error: Option<String>,
}

impl ChatEntry {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.session.id,
            settings: self.settings.clone(),
            model: self.session.settings.model.key(),
            messages: self.view.snapshot(self.session.messages()),
            input: self.session.input().to_string(),
            loading: self.session.is_loading(),
            error: self.session.error().map(str::to_string),
        }
    }
}

async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<SessionSnapshot>, ApiError> {
    let entry = state.find(id).await?;
    let entry = entry.lock().await;
    Ok(Json(entry.snapshot()))
}

async fn patch_session_settings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<SessionSettingsPatch>,
) -> Result<Json<SessionSettings>, ApiError> {
    let entry = state.find(id).await?;
    let mut guard = entry.lock().await;
    let entry = &mut *guard;
    entry.settings.apply_patch(patch);
    entry.session.settings = resolve_effective_settings(&state.defaults, &entry.settings, &RequestOverrides::default());
    tracing::info!(session = %id, model = entry.session.settings.model.key(), "session settings updated");
    Ok(Json(entry.settings.clone()))
}

#[derive(Debug, Deserialize)]
struct InputBody {
    input: String,
}

async fn set_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<InputBody>,
) -> Result<StatusCode, ApiError> {
    let entry = state.find(id).await?;
    entry.lock().await.session.set_input(body.input);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SubmitBody {
    input: String,
    #[serde(default)]
    model: Option<String>,
}

async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SubmitBody>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let entry = state.find(id).await?;
    let pending = {
        let mut guard = entry.lock().await;
        let entry = &mut *guard;
        let request = RequestOverrides { model: body.model };
        let effective = resolve_effective_settings(&state.defaults, &entry.settings, &request);
        entry.session.begin_submit(&body.input, &effective)?
    };
    // Lock released: the loading flag keeps concurrent submits out. The turn
    // is completed on its own task so a dropped request cannot leave the
    // session loading.
    let model = state.model.clone();
    let turn = tokio::spawn(async move {
        let outcome = model.generate(pending.request).await;
        let mut guard = entry.lock().await;
        guard.session.complete_submit(outcome);
        guard.snapshot()
    });
    let snapshot = turn
        .await
        .map_err(|err| ApiError::Internal(format!("chat turn aborted: {err}")))?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteToolBody {
    message_id: String,
    part_index: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteToolResponse {
    call_id: String,
    result: ToolOutcome,
}

async fn execute_tool_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ExecuteToolBody>,
) -> Result<Json<ExecuteToolResponse>, ApiError> {
    let entry = state.find(id).await?;
    let call = {
        let guard = entry.lock().await;
        let message = guard
            .session
            .messages()
            .iter()
            .find(|m| m.id == body.message_id)
            .ok_or(ApiError::NotFound("message"))?;
        let part = message.parts.get(body.part_index).ok_or(ApiError::NotFound("part"))?;
        match (part.kind, part.metadata.as_ref()) {
            (PartKind::ToolCall, Some(PartMetadata::ToolCall(raw))) => ToolCall::from_metadata(raw)
                .ok_or_else(|| ApiError::BadRequest("tool call has no name".into()))?,
            _ => return Err(ApiError::BadRequest("part is not a tool call".into())),
        }
    };

    let mut reported: Option<(String, ToolOutcome)> = None;
    state
        .tools
        .execute(&call, body.part_index, |call_id, outcome| {
            reported = Some((call_id.to_string(), outcome.clone()));
        })
        .await;
    let (call_id, result) = reported.ok_or_else(|| ApiError::Internal("tool run did not finish".into()))?;

    entry.lock().await.view.record(&body.message_id, &call_id, result.clone());
    Ok(Json(ExecuteToolResponse { call_id, result }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/agents/switch", post(switch_agent))
        .route("/api/calendar/events", get(calendar_events))
        .route("/api/logs", get(workflow_logs))
        .route("/api/prompts", get(prompts))
        .route("/api/prompts/categories", get(prompt_categories))
        .route("/api/tools/sendEmail", post(send_email))
        .route("/api/tools/status", get(tool_status))
        .route("/api/uploads", post(upload))
        .route("/api/images/generate", post(generate_image))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/session", get(current_session))
        .route("/api/chat/sessions", post(create_session).get(list_sessions))
        .route("/api/chat/sessions/:id", get(get_session))
        .route("/api/chat/sessions/:id/settings", patch(patch_session_settings))
        .route("/api/chat/sessions/:id/input", put(set_input))
        .route("/api/chat/sessions/:id/messages", post(submit_message))
        .route("/api/chat/sessions/:id/tool-calls", post(execute_tool_call))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let auth_mode = state.auth.mode();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, ?auth_mode, "dashboard api listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
