use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{NotionError, NotionResult};
use crate::transport::{HttpMethod, NotionTransport, TransportResponse};

/// Scripted in-memory transport. Replies are consumed in order and every
/// request is recorded for later inspection.
#[derive(Clone, Debug, Default)]
pub struct MockNotion {
    inner: Arc<Mutex<MockNotionState>>,
}

#[derive(Clone, Debug, Default)]
struct MockNotionState {
    replies: VecDeque<MockReply>,
    requests: Vec<RecordedRequest>,
}

#[derive(Clone, Debug)]
enum MockReply {
    Response(TransportResponse),
    Failure(String),
    Hang,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<Value>,
}

impl MockNotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_json(&self, status: u16, body: Value) -> &Self {
        self.push(MockReply::Response(TransportResponse::new(
            status,
            body.to_string(),
        )))
    }

    pub fn push_text(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(MockReply::Response(TransportResponse::new(status, body)))
    }

    /// Queues a connection-level failure.
    pub fn push_failure(&self, message: impl Into<String>) -> &Self {
        self.push(MockReply::Failure(message.into()))
    }

    /// Queues a reply that never resolves, for cancellation tests.
    pub fn push_hang(&self) -> &Self {
        self.push(MockReply::Hang)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner
            .lock()
            .map(|state| state.requests.clone())
            .unwrap_or_default()
    }

    pub fn remaining_replies(&self) -> usize {
        self.inner
            .lock()
            .map(|state| state.replies.len())
            .unwrap_or_default()
    }

    fn push(&self, reply: MockReply) -> &Self {
        if let Ok(mut state) = self.inner.lock() {
            state.replies.push_back(reply);
        }
        self
    }
}

#[async_trait]
impl NotionTransport for MockNotion {
    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> NotionResult<TransportResponse> {
        let reply = {
            let mut state = self
                .inner
                .lock()
                .map_err(|_| NotionError::Http("mock transport mutex poisoned".to_string()))?;
            state.requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.cloned(),
            });
            state.replies.pop_front()
        };

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure(message)) => Err(NotionError::Http(message)),
            Some(MockReply::Hang) => std::future::pending().await,
            None => Err(NotionError::Http(format!(
                "mock transport has no scripted reply for {method} {url}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test(flavor = "current_thread")]
    async fn mock_replies_in_order_expected_requests_recorded() {
        let mock = MockNotion::new();
        mock.push_json(200, json!({"object": "list"}))
            .push_failure("connection reset");

        let body = json!({"start_cursor": "c"});
        let first = mock
            .send(HttpMethod::Post, "http://x/query", Some(&body))
            .await
            .unwrap();
        assert_eq!(first.status, 200);
        let second = mock.send(HttpMethod::Get, "http://x/y", None).await;
        assert!(matches!(second, Err(NotionError::Http(message)) if message == "connection reset"));
        let third = mock.send(HttpMethod::Get, "http://x/z", None).await;
        assert!(third.is_err());

        let requests = mock.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].body, Some(body));
        assert_eq!(requests[1].method, HttpMethod::Get);
        assert_eq!(mock.remaining_replies(), 0);
    }
}
