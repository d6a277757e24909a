#![doc = r#"
Typed access to Notion databases and page content.

Operation mapping:

| Client method | Notion API | Result |
| --- | --- | --- |
| `NotionClient::query_database` | `POST /databases/:id/query` (paginated) | `Table` |
| `NotionClient::query_database_report` | `POST /databases/:id/query` (paginated) | `FetchReport` |
| `NotionClient::retrieve_page` | `GET /pages/:id` | `Record` |
| `NotionClient::block_children` | `GET /blocks/:id/children` (first page) | `Document` |
| `NotionClient::update_database` | `PATCH /databases/:id` | raw response |
| `NotionClient::change_database_title` | `PATCH /databases/:id` | raw response |
| `NotionClient::append_block_children` | `PATCH /blocks/:id/children` | raw response |
| `NotionClient::delete_block` / `delete_blocks` | `DELETE /blocks/:id` | `()` |

Implementation notes:
- Property values are decoded against a closed set of kinds; an unknown
  kind fails the whole record with `NotionError::UnsupportedKind`.
- Looking up a field a record does not have returns a zero value and logs a
  warning instead of failing.
- Pagination never retries. A failing page ends the loop and the records
  merged so far are returned; `FetchReport` says whether the set is complete.
- Object ids are accepted with or without hyphens.
"#]

pub mod block;
pub mod cell;
pub mod client;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod fetcher;
pub mod record;
pub mod testing;
pub mod transport;

pub use block::{
    Block, Document, bulleted_list_block, code_block, decode_block, heading_block,
    paragraph_block,
};
pub use cell::{Cell, CellValue, TypeTag, decode_cell};
pub use client::{NotionClient, normalize_id};
pub use config::{DEFAULT_NOTION_API_VERSION, DEFAULT_NOTION_BASE_URL, NotionConfig};
pub use envelope::{BlockPage, RecordPage, parse_block_list, parse_record_list, parse_single_record};
pub use errors::{NotionError, NotionResult};
pub use fetcher::{FetchAbortHandle, FetchReport, PagedFetcher, RequestKind, StopReason};
pub use record::{Record, Table, decode_record};
pub use testing::{MockNotion, RecordedRequest};
pub use transport::{HttpMethod, NotionTransport, ReqwestTransport, TransportResponse};
