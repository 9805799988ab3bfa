use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Severity category of a transaction, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Normal,
    Suspicious,
    Fraud,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [Self::Normal, Self::Suspicious, Self::Fraud];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Suspicious => "suspicious",
            Self::Fraud => "fraud",
        }
    }

    /// Score band that a locally generated score of this level must fall in.
    /// Bands never overlap.
    pub fn band(&self) -> RangeInclusive<u8> {
        match self {
            Self::Normal => 5..=34,
            Self::Suspicious => 40..=69,
            Self::Fraud => 75..=99,
        }
    }

    /// The level whose band contains `score`, or `None` for gap values.
    pub fn for_score(score: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.band().contains(&score))
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown risk level '{0}'")]
pub struct UnknownRiskLevel(pub String);

impl FromStr for RiskLevel {
    type Err = UnknownRiskLevel;

    /// Case-insensitive: the backend sends "Fraud", the display side uses "fraud".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "suspicious" => Ok(Self::Suspicious),
            "fraud" => Ok(Self::Fraud),
            _ => Err(UnknownRiskLevel(s.to_string())),
        }
    }
}

/// A locally generated transaction row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: String,
    pub wallet_address: String,
    pub token_name: String,
    pub amount: f64,
    pub network: String,
    pub timestamp: DateTime<Utc>,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub reasons: Vec<String>,
}

/// A row received from the live risk stream. Already scored by the producer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveTransaction {
    /// Local list key, not carried on the wire.
    pub id: String,
    pub merchant: String,
    pub amount: f64,
    /// `None` when the producer's label is not a known level.
    pub risk_level: Option<RiskLevel>,
    /// Label exactly as the producer sent it.
    pub risk_label: String,
    pub time: String,
}

/// Element type of the dashboard feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum FeedEntry {
    Mock(Transaction),
    Live(LiveTransaction),
}

impl FeedEntry {
    pub fn id(&self) -> &str {
        match self {
            Self::Mock(tx) => &tx.id,
            Self::Live(tx) => &tx.id,
        }
    }

    pub fn risk_level(&self) -> Option<RiskLevel> {
        match self {
            Self::Mock(tx) => Some(tx.risk_level),
            Self::Live(tx) => tx.risk_level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub reasons: Vec<String>,
    pub confidence: f64,
}

/// Outcome of an on-demand analysis. `Unavailable` keeps "unknown risk"
/// distinguishable from a genuine `normal` verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum AnalysisOutcome {
    Ok(AnalysisResult),
    Unavailable { reason: String },
}

/// Reason string of the collapsed fallback result.
pub const BACKEND_UNAVAILABLE_REASON: &str = "Backend Connection Failed - Check Console";

impl AnalysisOutcome {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Collapse into a plain result for consumers that cannot render the
    /// unavailable state: `normal`, score 0, confidence 0.
    pub fn to_display_result(&self) -> AnalysisResult {
        match self {
            Self::Ok(result) => result.clone(),
            Self::Unavailable { .. } => fallback_result(BACKEND_UNAVAILABLE_REASON),
        }
    }
}

pub fn fallback_result(reason: &str) -> AnalysisResult {
    AnalysisResult {
        risk_level: RiskLevel::Normal,
        risk_score: 0,
        reasons: vec![reason.to_string()],
        confidence: 0.0,
    }
}

/// Drop repeated reasons, keeping the first occurrence of each.
pub fn dedup_reasons<I>(reasons: I) -> Vec<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let mut out: Vec<String> = Vec::new();
    for reason in reasons {
        let reason = reason.into();
        if !out.contains(&reason) {
            out.push(reason);
        }
    }
    out
}
