//! Static text block configuration types.

use serde::{Deserialize, Serialize};

/// Static text block configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextBlockConfig {
    pub text: String,
    #[serde(default)]
    pub short_text: Option<String>,
}
