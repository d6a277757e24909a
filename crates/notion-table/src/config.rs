use std::fmt;

pub const DEFAULT_NOTION_API_VERSION: &str = "2021-08-16";
pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";

/// Credentials and endpoint settings handed to the transport at call time.
#[derive(Clone, PartialEq, Eq)]
pub struct NotionConfig {
    pub bearer_token: String,
    pub api_version: String,
    pub base_url: String,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            bearer_token: String::new(),
            api_version: DEFAULT_NOTION_API_VERSION.to_string(),
            base_url: DEFAULT_NOTION_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for NotionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionConfig")
            .field("bearer_token", &"<redacted>")
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl NotionConfig {
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            bearer_token: bearer_token.into(),
            ..Self::default()
        }
    }

    /// Reads `NOTION_API_TOKEN`, `NOTION_VERSION` and `NOTION_API_URL`.
    /// Blank values fall back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bearer_token: env_value("NOTION_API_TOKEN").unwrap_or(defaults.bearer_token),
            api_version: env_value("NOTION_VERSION").unwrap_or(defaults.api_version),
            base_url: env_value("NOTION_API_URL").unwrap_or(defaults.base_url),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
