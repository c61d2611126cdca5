use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::{AppError, AppResult, JobError};
use crate::job::{JobRecord, JobState};

use super::attachments::ResolvedAttachment;
use super::orchestrator::TransportFactory;
use super::transport::{AgentTransport, DeleteOutcome, LogKind};

/// Shared client for every agent connection. Benchmark agents commonly use
/// self-signed certificates, so certificate validation is relaxed.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn build_agent_client() -> AppResult<Client> {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(AppError::from)
}

/// Opens [`HttpAgentTransport`]s sharing one client.
#[derive(Debug, Clone)]
pub struct HttpTransportFactory {
    client: Client,
}

impl HttpTransportFactory {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

impl TransportFactory for HttpTransportFactory {
    fn connect(&self, endpoint: &str) -> AppResult<Arc<dyn AgentTransport>> {
        Ok(Arc::new(HttpAgentTransport::new(self.client.clone(), endpoint)?))
    }
}

/// [`AgentTransport`] over the agent's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpAgentTransport {
    client: Client,
    endpoint: String,
    base: Url,
}

impl HttpAgentTransport {
    /// # Errors
    ///
    /// Returns an error when `endpoint` is not an absolute url.
    pub fn new(client: Client, endpoint: &str) -> AppResult<Self> {
        let base = Url::parse(endpoint).map_err(|source| {
            AppError::job(JobError::InvalidEndpoint {
                endpoint: endpoint.to_owned(),
                source,
            })
        })?;
        Ok(Self {
            client,
            endpoint: endpoint.to_owned(),
            base,
        })
    }

    fn resolve(&self, path: &str) -> AppResult<Url> {
        self.base.join(path).map_err(|source| {
            AppError::job(JobError::InvalidEndpoint {
                endpoint: format!("{}{}", self.endpoint, path),
                source,
            })
        })
    }

    async fn send(
        &self,
        method: &'static str,
        uri: &str,
        request: reqwest::RequestBuilder,
    ) -> AppResult<Response> {
        debug!("{} {} ...", method, uri);
        let response = request.send().await.map_err(|source| {
            AppError::job(JobError::Request {
                method,
                uri: uri.to_owned(),
                source,
            })
        })?;
        debug!("{} {} -> {}", method, uri, response.status());
        Ok(response)
    }

    async fn post_empty(&self, job_uri: &str, action: &str) -> AppResult<()> {
        let uri = format!("{}/{}", job_uri, action);
        let response = self.send("POST", &uri, self.client.post(&uri)).await?;
        ensure_success("POST", &uri, response).await?;
        Ok(())
    }

    async fn read_body(method: &'static str, uri: &str, response: Response) -> AppResult<String> {
        response.text().await.map_err(|source| {
            AppError::job(JobError::Request {
                method,
                uri: uri.to_owned(),
                source,
            })
        })
    }
}

async fn ensure_success(method: &'static str, uri: &str, response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::job(JobError::Status {
        method,
        uri: uri.to_owned(),
        status: status.as_u16(),
        body,
    }))
}

fn decode<T: serde::de::DeserializeOwned>(context: &'static str, body: &str) -> AppResult<T> {
    serde_json::from_str(body).map_err(|source| AppError::job(JobError::Decode { context, source }))
}

#[async_trait]
impl AgentTransport for HttpAgentTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn submit(&self, job: &JobRecord) -> AppResult<String> {
        let jobs = self.resolve("/jobs")?;
        let uri = jobs.to_string();
        let response = self
            .send("POST", &uri, self.client.post(jobs.clone()).json(job))
            .await?;
        let response = ensure_success("POST", &uri, response).await?;

        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(JobError::MissingLocation)?;
        let job_uri = jobs.join(location).map_err(|source| {
            AppError::job(JobError::InvalidLocation {
                location: location.to_owned(),
                source,
            })
        })?;
        Ok(job_uri.as_str().trim_end_matches('/').to_owned())
    }

    async fn fetch(&self, job_uri: &str) -> AppResult<Option<JobRecord>> {
        let response = self.send("GET", job_uri, self.client.get(job_uri)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success("GET", job_uri, response).await?;
        let body = Self::read_body("GET", job_uri, response).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        decode("job record", &body).map(Some)
    }

    async fn state(&self, job_uri: &str) -> AppResult<JobState> {
        let uri = format!("{}/state", job_uri);
        let response = self.send("GET", &uri, self.client.get(&uri)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(JobState::Failed);
        }
        let response = ensure_success("GET", &uri, response).await?;
        let body = Self::read_body("GET", &uri, response).await?;
        Ok(body.parse().unwrap_or(JobState::Failed))
    }

    async fn start(&self, job_uri: &str) -> AppResult<()> {
        self.post_empty(job_uri, "start").await
    }

    async fn stop(&self, job_uri: &str) -> AppResult<()> {
        self.post_empty(job_uri, "stop").await
    }

    async fn delete(&self, job_uri: &str) -> AppResult<DeleteOutcome> {
        let response = self
            .send("DELETE", job_uri, self.client.delete(job_uri))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::AlreadyGone);
        }
        ensure_success("DELETE", job_uri, response).await?;
        Ok(DeleteOutcome::Deleted)
    }

    async fn touch(&self, job_uri: &str) -> AppResult<()> {
        let uri = format!("{}/touch", job_uri);
        let response = self.send("GET", &uri, self.client.get(&uri)).await?;
        ensure_success("GET", &uri, response).await?;
        Ok(())
    }

    async fn upload(
        &self,
        job_uri: &str,
        job_id: u64,
        attachment: &ResolvedAttachment,
    ) -> AppResult<()> {
        let uri = format!("{}/{}", job_uri, attachment.kind.endpoint());
        let file = tokio::fs::File::open(&attachment.local_path)
            .await
            .map_err(|source| {
                AppError::job(JobError::ReadAttachment {
                    path: attachment.local_path.clone(),
                    source,
                })
            })?;
        let request = self
            .client
            .post(&uri)
            .header("id", job_id.to_string())
            .header("destinationFilename", attachment.destination.as_str())
            .body(reqwest::Body::from(file));
        let response = self.send("POST", &uri, request).await?;
        ensure_success("POST", &uri, response).await?;
        Ok(())
    }

    async fn reset_stats(&self, job_uri: &str) -> AppResult<()> {
        self.post_empty(job_uri, "resetstats").await
    }

    async fn flush_measurements(&self, job_uri: &str) -> AppResult<()> {
        self.post_empty(job_uri, "measurements/flush").await
    }

    async fn log_lines(
        &self,
        job_uri: &str,
        kind: LogKind,
        cursor: usize,
    ) -> AppResult<Vec<String>> {
        let uri = format!("{}/{}/{}", job_uri, kind.endpoint(), cursor);
        let response = self.send("GET", &uri, self.client.get(&uri)).await?;
        let response = ensure_success("GET", &uri, response).await?;
        let body = Self::read_body("GET", &uri, response).await?;
        decode("log lines", &body)
    }

    async fn info(&self) -> AppResult<serde_json::Map<String, serde_json::Value>> {
        let url = self.resolve("/info")?;
        let uri = url.to_string();
        let response = self.send("GET", &uri, self.client.get(url)).await?;
        let response = ensure_success("GET", &uri, response).await?;
        let body = Self::read_body("GET", &uri, response).await?;
        decode("agent info", &body)
    }
}
