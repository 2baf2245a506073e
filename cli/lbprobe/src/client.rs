//! HTTP client for the scheduling service.
//!
//! Each method is a single request/response exchange. Nothing here retries;
//! callers decide whether a failure is fatal or can be skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lbprobe_balance::TaskId;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::{Config, TaskEndpoint};
use crate::error::ApiError;
use crate::model::{
    Ack, Envelope, LoginCredentials, LoginData, ServiceSnapshot, SubmittedTask, TaskPayload,
    TaskRecord, TaskSubmission, Token, CODE_NOT_FOUND, CODE_SUCCESS, CODE_UNAUTHORIZED,
};

/// Operations the harness needs from the scheduling service.
#[async_trait]
pub trait SchedulerApi: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, credentials: &LoginCredentials) -> Result<Token, ApiError>;

    /// Stop the scheduling algorithm.
    async fn stop(&self, token: &Token) -> Result<Ack, ApiError>;

    /// Clear the scheduler's task history.
    async fn clear(&self, token: &Token) -> Result<Ack, ApiError>;

    /// Submit one task and return the id the service assigned.
    async fn submit_task(&self, token: &Token, task: &TaskSubmission)
        -> Result<TaskId, ApiError>;

    /// Look up one task.
    async fn get_task(&self, token: &Token, id: &TaskId) -> Result<TaskRecord, ApiError>;

    /// Fetch the aggregate scheduler summary.
    async fn snapshot(&self, token: &Token) -> Result<ServiceSnapshot, ApiError>;
}

/// reqwest-backed [`SchedulerApi`].
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    client: reqwest::Client,
    base_url: Url,
    task_endpoint: TaskEndpoint,
}

impl SchedulerClient {
    /// Create a new client from config.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(config.api_url())
            .with_context(|| format!("Invalid API URL: {}", config.api_url()))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Invalid API URL: {}", config.api_url());
        }

        Ok(Self {
            client,
            base_url,
            task_endpoint: config.task_endpoint,
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// URL of a task lookup. The id is percent-encoded as one path segment.
    fn task_url(&self, id: &TaskId) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(self.task_endpoint.segments())
            .push(id.as_str());
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder, token: &Token) -> RequestBuilder {
        request.header(AUTHORIZATION, token.bearer())
    }

    /// Send a request and unwrap the service envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &body));
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        if envelope.code != CODE_SUCCESS {
            return Err(classify(status, envelope.code, envelope.message));
        }

        Ok(envelope)
    }

    async fn send_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request).await?.data.ok_or(ApiError::MissingData)
    }

    async fn send_ack(&self, request: RequestBuilder) -> Result<Ack, ApiError> {
        let envelope: Envelope<serde_json::Value> = self.send(request).await?;
        Ok(Ack {
            message: envelope.message,
        })
    }
}

#[async_trait]
impl SchedulerApi for SchedulerClient {
    async fn login(&self, credentials: &LoginCredentials) -> Result<Token, ApiError> {
        debug!(username = %credentials.username, "Logging in");
        let request = self.client.post(self.url("/auth/login")).json(credentials);
        let data: LoginData = self.send_data(request).await?;
        Ok(Token::new(data.token))
    }

    async fn stop(&self, token: &Token) -> Result<Ack, ApiError> {
        debug!("Stopping algorithm");
        let request = self.authorized(self.client.post(self.url("/algorithm/stop")), token);
        self.send_ack(request).await
    }

    async fn clear(&self, token: &Token) -> Result<Ack, ApiError> {
        debug!("Clearing history");
        let request = self.authorized(self.client.post(self.url("/algorithm/clear")), token);
        self.send_ack(request).await
    }

    async fn submit_task(
        &self,
        token: &Token,
        task: &TaskSubmission,
    ) -> Result<TaskId, ApiError> {
        debug!(user_id = task.user_id, data_size = task.data_size, kind = %task.kind, "Submitting task");
        let request = self.authorized(
            self.client.post(self.url("/algorithm/tasks")).json(task),
            token,
        );
        let submitted: SubmittedTask = self.send_data(request).await?;
        Ok(submitted.id)
    }

    async fn get_task(&self, token: &Token, id: &TaskId) -> Result<TaskRecord, ApiError> {
        let url = self.task_url(id)?;
        debug!(task_id = %id, url = %url, "Fetching task");
        let request = self.authorized(self.client.get(url), token);
        let payload: TaskPayload = self.send_data(request).await?;
        Ok(TaskRecord::from_payload(id.clone(), payload))
    }

    async fn snapshot(&self, token: &Token) -> Result<ServiceSnapshot, ApiError> {
        debug!("Fetching service info");
        let request = self.authorized(self.client.get(self.url("/algorithm/info")), token);
        self.send_data(request).await
    }
}

/// Map a status/code pair onto the error taxonomy.
fn classify(status: StatusCode, code: i64, message: String) -> ApiError {
    if status == StatusCode::UNAUTHORIZED || code == CODE_UNAUTHORIZED {
        ApiError::Unauthorized { message }
    } else if status == StatusCode::NOT_FOUND || code == CODE_NOT_FOUND {
        ApiError::NotFound { message }
    } else {
        ApiError::rejected(status.as_u16(), code, message)
    }
}

/// Build an error from a non-2xx response body.
fn error_from_body(status: StatusCode, body: &[u8]) -> ApiError {
    match serde_json::from_slice::<Envelope<serde_json::Value>>(body) {
        Ok(envelope) => classify(status, envelope.code, envelope.message),
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                "Unknown error".to_string()
            } else {
                text
            };
            classify(status, 0, message)
        }
    }
}
