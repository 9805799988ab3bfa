use serde::{Deserialize, Serialize};

use crate::risk::types::{dedup_reasons, AnalysisResult, LiveTransaction, RiskLevel};

use super::error::ServiceError;

/// Reported on every successful analysis until the backend supplies its own
/// confidence. Keep the field type when that happens.
pub const PLACEHOLDER_CONFIDENCE: f64 = 0.98;

/// Older backend revisions return a reason list instead of a single explanation.
const MAX_BACKEND_REASONS: usize = 4;

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub amount: f64,
    pub location: String,
    pub merchant_type: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<String>,
}

/// Body of a successful `POST /analyze` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub risk_level: String,
    pub risk_score: f64,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub reasons: Option<Vec<String>>,
}

/// One frame of the live risk stream. A producer `id` is accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    pub merchant: String,
    pub amount: f64,
    pub risk: String,
    pub time: String,
}

impl AnalyzeResponse {
    /// Map onto the local result: level lower-cased, score scaled to a
    /// rounded percentage, explanation as the single reason.
    pub fn into_result(self) -> Result<AnalysisResult, ServiceError> {
        let risk_level: RiskLevel = self
            .risk_level
            .parse()
            .map_err(|e| ServiceError::Malformed(format!("{}", e)))?;

        if !self.risk_score.is_finite() || !(0.0..=1.0).contains(&self.risk_score) {
            return Err(ServiceError::Malformed(format!(
                "risk_score {} outside [0, 1]",
                self.risk_score
            )));
        }
        let risk_score = (self.risk_score * 100.0).round() as u8;

        let reasons = match (self.explanation, self.reasons) {
            (Some(explanation), _) => vec![explanation],
            (None, Some(reasons)) if !reasons.is_empty() => dedup_reasons(reasons)
                .into_iter()
                .take(MAX_BACKEND_REASONS)
                .collect(),
            _ => {
                return Err(ServiceError::Malformed(
                    "response carries neither explanation nor reasons".to_string(),
                ))
            }
        };

        Ok(AnalysisResult {
            risk_level,
            risk_score,
            reasons,
            confidence: PLACEHOLDER_CONFIDENCE,
        })
    }
}

impl StreamEvent {
    /// Build a display row under a locally generated id. A label outside
    /// the known levels is kept as-is with no level.
    pub fn into_live(self, id: String) -> Result<LiveTransaction, ServiceError> {
        let risk_level = self.risk.parse::<RiskLevel>().ok();
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(ServiceError::Malformed(format!(
                "stream amount {} is not a non-negative number",
                self.amount
            )));
        }
        Ok(LiveTransaction {
            id,
            merchant: self.merchant,
            amount: self.amount,
            risk_level,
            risk_label: self.risk,
            time: self.time,
        })
    }
}
