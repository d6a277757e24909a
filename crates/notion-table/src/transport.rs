use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::NotionConfig;
use crate::errors::{NotionError, NotionResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and untouched body of one HTTP exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into [`NotionError::Transport`].
    pub fn into_success(self) -> NotionResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(NotionError::Transport {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Request/response boundary to the Notion API. Retries, backoff and
/// timeouts belong to implementations of this trait.
#[async_trait]
pub trait NotionTransport: Send + Sync {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> NotionResult<TransportResponse>;
}

#[async_trait]
impl<T> NotionTransport for std::sync::Arc<T>
where
    T: NotionTransport + ?Sized,
{
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> NotionResult<TransportResponse> {
        (**self).send(method, url, body).await
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: NotionConfig,
}

impl ReqwestTransport {
    pub fn new(config: NotionConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: NotionConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &NotionConfig {
        &self.config
    }
}

#[async_trait]
impl NotionTransport for ReqwestTransport {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> NotionResult<TransportResponse> {
        let builder = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };
        let mut builder = builder
            .bearer_auth(&self.config.bearer_token)
            .header("Notion-Version", &self.config.api_version);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(%method, url, "notion request");
        let response = builder
            .send()
            .await
            .map_err(|err| NotionError::Http(format!("{method} {url} failed: {err}")))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|err| NotionError::Http(format!("http read body failed: {err}")))?;
        tracing::debug!(%method, url, status, bytes = text.len(), "notion response");
        Ok(TransportResponse { status, body: text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_status_range_expected_success_only_for_2xx() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(301, "").is_success());
        assert!(!TransportResponse::new(404, "").is_success());
    }

    #[test]
    fn into_success_error_status_expected_transport_error() {
        let error = TransportResponse::new(429, "rate limited")
            .into_success()
            .unwrap_err();
        match error {
            NotionError::Transport { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn method_names_expected_uppercase_verbs() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
