//! HTTP client for the document and assist backend surfaces.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::Config;
use crate::models::Session;

use super::error::ApiError;
use super::types::{
    AssistQuery, AssistReply, BreakdownReply, ChatReply, ChatRequest, ErrorBody, EstimateReply,
    HistoryTurn, LoginResponse, RegisterRequest, SessionPayload, SimplifyReply, TaskRequest,
    TextRequest,
};
use super::{AuthContext, Backend};

/// Generous timeout: indexing a large PDF can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Read granularity for the streamed upload body.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Thin client over both backend surfaces.
///
/// Holds no session state of its own. The assist surface may be a separate
/// deployment, hence the second base URL. Credentials are injected at
/// construction, never read from ambient storage.
pub struct ApiClient {
    http: Client,
    base_url: String,
    assist_url: String,
    auth: Option<AuthContext>,
}

impl ApiClient {
    /// Build a client from configuration and optional credentials.
    pub fn new(config: &Config, auth: Option<AuthContext>) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: trim_base(&config.api_url),
            assist_url: trim_base(&config.assist_url),
            auth,
        })
    }

    fn doc_endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn assist_endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.assist_url)
    }

    fn authed_post(&self, path: &str) -> Result<RequestBuilder, ApiError> {
        let auth = self.auth.as_ref().ok_or(ApiError::Unauthenticated)?;
        Ok(self
            .http
            .post(self.assist_endpoint(path))
            .bearer_auth(&auth.access_token))
    }

    /// Map a non-2xx response to `ApiError::Backend`, surfacing the
    /// backend's `{detail}` when the error body carries one.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|e| e.detail)
            .unwrap_or_else(|_| format!("backend returned {status}"));
        Err(ApiError::Backend {
            status: status.as_u16(),
            detail,
        })
    }

    // === Assist surface (login-gated micro tools) ===

    /// Exchange username/password for an access token.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthContext, ApiError> {
        let response = self
            .http
            .post(self.assist_endpoint("/api/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;
        let payload: LoginResponse = Self::check(response).await?.json().await?;
        Ok(AuthContext {
            access_token: payload.access_token,
            username: payload.username,
        })
    }

    /// Create a new account.
    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.assist_endpoint("/api/register"))
            .json(&RegisterRequest { username, password })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// One-shot assistant reply tuned by `condition_context`
    /// (general, adhd, dyslexia, autism).
    pub async fn assist_chat(
        &self,
        query: &str,
        condition_context: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .authed_post("/api/chat")?
            .json(&AssistQuery {
                query,
                condition_context,
            })
            .send()
            .await?;
        let payload: AssistReply = Self::check(response).await?.json().await?;
        Ok(payload.response)
    }

    /// Break a task into small actionable steps.
    pub async fn breakdown_task(&self, task_description: &str) -> Result<Vec<String>, ApiError> {
        let response = self
            .authed_post("/api/breakdown-task")?
            .json(&TaskRequest { task_description })
            .send()
            .await?;
        let payload: BreakdownReply = Self::check(response).await?.json().await?;
        Ok(payload.steps)
    }

    /// Rewrite text for readability.
    pub async fn simplify_text(&self, text: &str) -> Result<String, ApiError> {
        let response = self
            .authed_post("/api/simplify-text")?
            .json(&TextRequest { text })
            .send()
            .await?;
        let payload: SimplifyReply = Self::check(response).await?.json().await?;
        Ok(payload.simplified_text)
    }

    /// Estimate how long a task realistically takes.
    pub async fn estimate_time(&self, task_description: &str) -> Result<String, ApiError> {
        let response = self
            .authed_post("/api/time-estimator")?
            .json(&TaskRequest { task_description })
            .send()
            .await?;
        let payload: EstimateReply = Self::check(response).await?.json().await?;
        Ok(payload.estimation)
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn upload_document(
        &self,
        path: &Path,
        progress: mpsc::Sender<u8>,
    ) -> Result<Session, ApiError> {
        let file_name = path
            .file_name()
            .map_or_else(|| "document.pdf".to_string(), |n| n.to_string_lossy().into_owned());

        let wrap_io = |source: std::io::Error| ApiError::File {
            path: path.to_path_buf(),
            source,
        };
        let total = tokio::fs::metadata(path).await.map_err(wrap_io)?.len();
        let file = tokio::fs::File::open(path).await.map_err(wrap_io)?;

        // The body is streamed out of a channel so byte progress can be
        // observed while reqwest drains it.
        let (body_tx, body_rx) = mpsc::channel::<Result<Vec<u8>, std::io::Error>>(8);
        tokio::spawn(pump_file(file, total, body_tx, progress));

        let part = Part::stream_with_length(Body::wrap_stream(ReceiverStream::new(body_rx)), total)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.doc_endpoint("/api/upload"))
            .multipart(form)
            .send()
            .await?;
        let payload: SessionPayload = Self::check(response).await?.json().await?;

        tracing::debug!(session_id = %payload.session_id, pages = payload.total_pages, "document indexed");
        Ok(Session::new(
            payload.session_id,
            payload.filename,
            payload.total_pages,
            payload.total_chunks,
        ))
    }

    async fn chat(
        &self,
        session_id: &str,
        question: &str,
        history: &[HistoryTurn],
    ) -> Result<ChatReply, ApiError> {
        let response = self
            .http
            .post(self.doc_endpoint("/api/chat"))
            .json(&ChatRequest {
                session_id,
                question,
                chat_history: history,
            })
            .send()
            .await?;
        let reply: ChatReply = Self::check(response).await?.json().await?;
        Ok(reply)
    }

    async fn session_info(&self, session_id: &str) -> Result<Session, ApiError> {
        let response = self
            .http
            .get(self.doc_endpoint(&format!(
                "/api/session/{}",
                urlencoding::encode(session_id)
            )))
            .send()
            .await?;
        let payload: SessionPayload = Self::check(response).await?.json().await?;
        Ok(Session::new(
            payload.session_id,
            payload.filename,
            payload.total_pages,
            payload.total_chunks,
        ))
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.doc_endpoint(&format!(
                "/api/session/{}",
                urlencoding::encode(session_id)
            )))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Read the file into the body channel in chunks, reporting byte progress.
///
/// Percentages are strictly increasing per attempt; 100 is always the final
/// report, even for an empty file.
async fn pump_file(
    mut file: tokio::fs::File,
    total: u64,
    body_tx: mpsc::Sender<Result<Vec<u8>, std::io::Error>>,
    progress: mpsc::Sender<u8>,
) {
    let mut sent: u64 = 0;
    let mut last_percent: u8 = 0;
    loop {
        let mut buf = vec![0u8; UPLOAD_CHUNK_BYTES];
        match file.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                buf.truncate(n);
                sent += n as u64;
                if body_tx.send(Ok(buf)).await.is_err() {
                    // Receiver dropped: the request already failed.
                    return;
                }
                let percent = percent_of(sent, total);
                if percent > last_percent {
                    last_percent = percent;
                    let _ = progress.send(percent).await;
                }
            }
            Err(err) => {
                let _ = body_tx.send(Err(err)).await;
                return;
            }
        }
    }
    if last_percent < 100 {
        let _ = progress.send(100).await;
    }
}

fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = sent.saturating_mul(100) / total;
    u8::try_from(pct.min(100)).unwrap_or(100)
}
