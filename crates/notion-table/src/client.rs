use serde_json::{Value, json};

use crate::block::Document;
use crate::config::NotionConfig;
use crate::errors::{NotionError, NotionResult};
use crate::fetcher::{FetchAbortHandle, FetchReport, PagedFetcher, RequestKind};
use crate::record::{Record, Table};
use crate::transport::{HttpMethod, NotionTransport, ReqwestTransport, TransportResponse};

/// Database, page and block operations against one workspace.
#[derive(Clone, Debug)]
pub struct NotionClient<T> {
    config: NotionConfig,
    fetcher: PagedFetcher<T>,
}

impl NotionClient<ReqwestTransport> {
    pub fn from_config(config: NotionConfig) -> Self {
        let transport = ReqwestTransport::new(config.clone());
        Self::new(config, transport)
    }

    pub fn from_env() -> Self {
        Self::from_config(NotionConfig::from_env())
    }
}

impl<T> NotionClient<T> {
    pub fn new(config: NotionConfig, transport: T) -> Self {
        Self {
            config,
            fetcher: PagedFetcher::new(transport),
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.fetcher = self.fetcher.with_max_pages(max_pages);
        self
    }

    pub fn config(&self) -> &NotionConfig {
        &self.config
    }

    pub fn abort_handle(&self) -> FetchAbortHandle {
        self.fetcher.abort_handle()
    }

    fn endpoint(&self, path: &str) -> String {
        self.config.endpoint(path)
    }
}

impl<T> NotionClient<T>
where
    T: NotionTransport,
{
    /// All rows of a database. Partial when a page fails mid-way.
    pub async fn query_database(&self, database_id: &str) -> NotionResult<Table> {
        Ok(self.query_database_report(database_id).await?.table)
    }

    pub async fn query_database_report(&self, database_id: &str) -> NotionResult<FetchReport> {
        let id = normalize_id(database_id)?;
        let url = self.endpoint(&format!("databases/{id}/query"));
        tracing::info!(database = %id, "querying database");
        Ok(self.fetcher.fetch_all_report(&url, RequestKind::Query).await)
    }

    pub async fn retrieve_page(&self, page_id: &str) -> NotionResult<Record> {
        let id = normalize_id(page_id)?;
        self.fetcher
            .fetch_record(&self.endpoint(&format!("pages/{id}")))
            .await
    }

    /// First page of a block's children.
    pub async fn block_children(&self, block_id: &str) -> NotionResult<Document> {
        let id = normalize_id(block_id)?;
        self.fetcher
            .fetch_document(&self.endpoint(&format!("blocks/{id}/children")))
            .await
    }

    pub async fn update_database(
        &self,
        database_id: &str,
        method: HttpMethod,
        body: &Value,
    ) -> NotionResult<TransportResponse> {
        let id = normalize_id(database_id)?;
        tracing::info!(database = %id, %method, "updating database");
        self.send_checked(method, &format!("databases/{id}"), Some(body))
            .await
    }

    pub async fn change_database_title(
        &self,
        database_id: &str,
        title: &str,
    ) -> NotionResult<TransportResponse> {
        let body = json!({
            "title": [{ "type": "text", "text": { "content": title } }]
        });
        self.update_database(database_id, HttpMethod::Patch, &body)
            .await
    }

    pub async fn append_block_children(
        &self,
        block_id: &str,
        children: Vec<Value>,
    ) -> NotionResult<TransportResponse> {
        let id = normalize_id(block_id)?;
        let body = json!({ "children": children });
        self.send_checked(HttpMethod::Patch, &format!("blocks/{id}/children"), Some(&body))
            .await
    }

    pub async fn delete_block(&self, block_id: &str) -> NotionResult<()> {
        let id = normalize_id(block_id)?;
        tracing::info!(block = %id, "deleting block");
        self.send_checked(HttpMethod::Delete, &format!("blocks/{id}"), None)
            .await?;
        Ok(())
    }

    /// Deletes in order and stops at the first failure.
    pub async fn delete_blocks<S: AsRef<str>>(&self, block_ids: &[S]) -> NotionResult<()> {
        for block_id in block_ids {
            self.delete_block(block_id.as_ref()).await?;
        }
        tracing::info!(count = block_ids.len(), "blocks deleted");
        Ok(())
    }

    async fn send_checked(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&Value>,
    ) -> NotionResult<TransportResponse> {
        self.fetcher
            .transport()
            .send(method, &self.endpoint(path), body)
            .await?
            .into_success()
    }
}

/// Strips hyphens so both dashed UUIDs and compact ids address the same object.
pub fn normalize_id(id: &str) -> NotionResult<String> {
    let compact: String = id.trim().chars().filter(|ch| *ch != '-').collect();
    if compact.is_empty() {
        return Err(NotionError::InvalidInput("empty object id".to_string()));
    }
    if let Some(bad) = compact.chars().find(|ch| !ch.is_ascii_alphanumeric()) {
        return Err(NotionError::InvalidInput(format!(
            "object id contains '{bad}': {id}"
        )));
    }
    Ok(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_id_dashed_uuid_expected_compact() {
        assert_eq!(
            normalize_id("9bc30ad4-9373-46a5-84ab-0a7845ee52e6").unwrap(),
            "9bc30ad4937346a584ab0a7845ee52e6"
        );
    }

    #[test]
    fn normalize_id_empty_or_path_expected_invalid_input() {
        assert!(matches!(normalize_id("  "), Err(NotionError::InvalidInput(_))));
        assert!(matches!(
            normalize_id("abc/../x"),
            Err(NotionError::InvalidInput(_))
        ));
    }
}
