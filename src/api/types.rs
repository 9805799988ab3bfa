use serde::{Deserialize, Serialize};

use crate::risk::types::FeedEntry;
use crate::stream::connection::ConnectionStatus;

// ============================================================
// Request types
// ============================================================

/// Analyzer form fields. Missing fields default to empty so the client's
/// input validation reports them.
#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub wallet: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub amount: AmountField,
    #[serde(default)]
    pub network: String,
}

/// Form inputs send the amount as text; JSON clients may send a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AmountField {
    Number(f64),
    Text(String),
}

impl Default for AmountField {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl AmountField {
    /// Text handed to the client's amount parser. `f64` display round-trips exactly.
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

// ============================================================
// Response types
// ============================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// `None` when the live stream is disabled.
    pub stream: Option<ConnectionStatus>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
