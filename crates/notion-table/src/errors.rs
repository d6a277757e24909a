use thiserror::Error;

/// Error taxonomy for decoding, fetching and mutating Notion content.
///
/// A lookup of a field that is absent from a record is deliberately not an
/// error: accessors return a zero value and emit a `tracing` warning instead.
#[derive(Debug, Error)]
pub enum NotionError {
    #[error("unsupported property kind: {kind}")]
    UnsupportedKind { kind: String },

    #[error("cannot convert field '{field}' to {expected}: found {found}")]
    Conversion {
        field: String,
        expected: &'static str,
        found: String,
    },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("malformed block {id}: no '{kind}' object in payload")]
    MalformedBlock { id: String, kind: String },

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("request failed with status {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("http failure: {0}")]
    Http(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("pagination cancelled")]
    Cancelled,

    #[error("page limit reached after {pages} pages")]
    PageLimitReached { pages: usize },
}

impl NotionError {
    pub(crate) fn conversion(
        field: impl Into<String>,
        expected: &'static str,
        found: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            field: field.into(),
            expected,
            found: found.into(),
        }
    }
}

pub type NotionResult<T> = Result<T, NotionError>;
