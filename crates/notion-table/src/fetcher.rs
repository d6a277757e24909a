//! Cursor-driven pagination.
//!
//! Records are assembled by a small state machine:
//!
//! ```text
//! Start -> Requesting -> (Merging -> Requesting)* -> Done
//! ```
//!
//! A page that fails (transport error, non-2xx status, undecodable payload)
//! is not retried. The loop stops and the records merged so far are
//! returned. [`PagedFetcher::fetch_all`] does not signal this; callers that
//! need completeness use [`PagedFetcher::fetch_all_report`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::block::Document;
use crate::envelope::{RecordPage, parse_block_list, parse_record_list, parse_single_record};
use crate::errors::{NotionError, NotionResult};
use crate::record::{Record, Table};
use crate::transport::{HttpMethod, NotionTransport};

/// Where the continuation cursor goes on the next request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// `POST` with `start_cursor` in the JSON body (database queries).
    Query,
    /// `GET` with `start_cursor` as a query parameter (listings).
    Listing,
}

#[derive(Debug)]
pub enum StopReason {
    /// The remote reported no further pages.
    Exhausted,
    /// A page could not be fetched or decoded.
    PageFailed(NotionError),
    Cancelled,
    PageLimit,
}

/// Accumulated records plus how the pagination loop ended.
#[derive(Debug)]
pub struct FetchReport {
    pub table: Table,
    /// Pages fully merged into `table`.
    pub pages: usize,
    pub stopped_by: StopReason,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        matches!(self.stopped_by, StopReason::Exhausted)
    }

    /// `Ok(table)` only when every page was merged.
    pub fn into_complete(self) -> NotionResult<Table> {
        match self.stopped_by {
            StopReason::Exhausted => Ok(self.table),
            StopReason::PageFailed(error) => Err(error),
            StopReason::Cancelled => Err(NotionError::Cancelled),
            StopReason::PageLimit => Err(NotionError::PageLimitReached { pages: self.pages }),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FetchAbortHandle {
    abort_requested: Arc<AtomicBool>,
    abort_notify: Arc<Notify>,
}

impl FetchAbortHandle {
    /// Stops pagination before the next request, or interrupts the one in
    /// flight. Records already merged are kept.
    pub fn request_abort(&self) {
        self.abort_requested.store(true, Ordering::SeqCst);
        self.abort_notify.notify_waiters();
    }

    pub fn is_abort_requested(&self) -> bool {
        self.abort_requested.load(Ordering::SeqCst)
    }

    /// Clears a previous abort so the fetcher can be reused.
    pub fn reset(&self) {
        self.abort_requested.store(false, Ordering::SeqCst);
    }
}

enum FetchState {
    Start,
    Requesting { cursor: Option<String> },
    Merging { page: RecordPage },
    Done(StopReason),
}

#[derive(Clone, Debug)]
pub struct PagedFetcher<T> {
    transport: T,
    max_pages: Option<usize>,
    abort: FetchAbortHandle,
}

impl<T> PagedFetcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_pages: None,
            abort: FetchAbortHandle::default(),
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn abort_handle(&self) -> FetchAbortHandle {
        self.abort.clone()
    }
}

impl<T> PagedFetcher<T>
where
    T: NotionTransport,
{
    /// Every record reachable from `endpoint`, in page-arrival order.
    /// May be partial; see the module docs.
    pub async fn fetch_all(&self, endpoint: &str, kind: RequestKind) -> Table {
        self.fetch_all_report(endpoint, kind).await.table
    }

    pub async fn fetch_all_report(&self, endpoint: &str, kind: RequestKind) -> FetchReport {
        let mut table = Table::new();
        let mut pages = 0;
        let mut state = FetchState::Start;

        loop {
            state = match state {
                FetchState::Start => FetchState::Requesting { cursor: None },
                FetchState::Requesting { cursor } => {
                    if self.max_pages.is_some_and(|limit| pages >= limit) {
                        FetchState::Done(StopReason::PageLimit)
                    } else {
                        match self.request_page(endpoint, kind, cursor.as_deref()).await {
                            Ok(page) => FetchState::Merging { page },
                            Err(NotionError::Cancelled) => FetchState::Done(StopReason::Cancelled),
                            Err(error) => FetchState::Done(StopReason::PageFailed(error)),
                        }
                    }
                }
                FetchState::Merging { page } => {
                    pages += 1;
                    tracing::debug!(
                        endpoint,
                        page = pages,
                        records = page.table.len(),
                        has_more = page.has_more,
                        "merging page"
                    );
                    table.merge(page.table);
                    match (page.has_more, page.next_cursor) {
                        (true, Some(cursor)) => FetchState::Requesting {
                            cursor: Some(cursor),
                        },
                        (true, None) => {
                            tracing::warn!(endpoint, "has_more set without next_cursor");
                            FetchState::Done(StopReason::Exhausted)
                        }
                        (false, _) => FetchState::Done(StopReason::Exhausted),
                    }
                }
                FetchState::Done(stopped_by) => {
                    if !matches!(stopped_by, StopReason::Exhausted) {
                        tracing::warn!(
                            endpoint,
                            pages,
                            records = table.len(),
                            reason = ?stopped_by,
                            "pagination stopped early"
                        );
                    }
                    return FetchReport {
                        table,
                        pages,
                        stopped_by,
                    };
                }
            };
        }
    }

    /// First page of the block listing at `endpoint`.
    pub async fn fetch_document(&self, endpoint: &str) -> NotionResult<Document> {
        let response = self
            .transport
            .send(HttpMethod::Get, endpoint, None)
            .await?
            .into_success()?;
        Ok(parse_block_list(&response.body)?.document)
    }

    pub async fn fetch_record(&self, endpoint: &str) -> NotionResult<Record> {
        let response = self
            .transport
            .send(HttpMethod::Get, endpoint, None)
            .await?
            .into_success()?;
        parse_single_record(&response.body)
    }

    async fn request_page(
        &self,
        endpoint: &str,
        kind: RequestKind,
        cursor: Option<&str>,
    ) -> NotionResult<RecordPage> {
        let notified = self.abort.abort_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.abort.is_abort_requested() {
            return Err(NotionError::Cancelled);
        }

        let (method, url, body) = page_request(endpoint, kind, cursor)?;
        let response = tokio::select! {
            biased;
            _ = &mut notified => return Err(NotionError::Cancelled),
            response = self.transport.send(method, &url, body.as_ref()) => response?,
        };
        parse_record_list(&response.into_success()?.body)
    }
}

fn page_request(
    endpoint: &str,
    kind: RequestKind,
    cursor: Option<&str>,
) -> NotionResult<(HttpMethod, String, Option<Value>)> {
    match kind {
        RequestKind::Query => {
            let body = match cursor {
                Some(cursor) => json!({ "start_cursor": cursor }),
                None => json!({}),
            };
            Ok((HttpMethod::Post, endpoint.to_string(), Some(body)))
        }
        RequestKind::Listing => {
            let url = match cursor {
                Some(cursor) => {
                    let mut url = reqwest::Url::parse(endpoint).map_err(|err| {
                        NotionError::InvalidInput(format!("invalid endpoint {endpoint}: {err}"))
                    })?;
                    url.query_pairs_mut().append_pair("start_cursor", cursor);
                    url.to_string()
                }
                None => endpoint.to_string(),
            };
            Ok((HttpMethod::Get, url, None))
        }
    }
}
