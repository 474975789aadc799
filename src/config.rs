use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Options recognized by [`crate::MarkdownParser`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParserOptions {
    /// Tables, strikethrough, task list items and extended autolinks
    pub gfm: bool,
    /// Keep raw HTML as literal text instead of passing it through
    pub safe_mode: bool,
    pub generate_heading_ids: bool,
}

impl ParserOptions {
    /// Read options from a JSON document; missing keys take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
