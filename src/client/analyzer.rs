use chrono::Local;

use crate::config::BackendConfig;
use crate::risk::types::{AnalysisOutcome, AnalysisResult};

use super::error::{InputError, ServiceError};
use super::wire::{AnalyzeRequest, AnalyzeResponse};

/// Client for the external risk-scoring service.
///
/// One request per call: no retries, no request coalescing, no caching.
#[derive(Debug, Clone)]
pub struct RiskClient {
    http: reqwest::Client,
    analyze_url: reqwest::Url,
}

impl RiskClient {
    pub fn new(config: &BackendConfig) -> eyre::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| eyre::eyre!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            http,
            analyze_url: config.analyze_url()?,
        })
    }

    pub fn analyze_url(&self) -> &reqwest::Url {
        &self.analyze_url
    }

    /// Analyze one transaction.
    ///
    /// Invalid input is rejected before dispatch. Once a request is sent,
    /// every failure is folded into `AnalysisOutcome::Unavailable`.
    pub async fn analyze(
        &self,
        wallet: &str,
        token: &str,
        amount_text: &str,
        network: &str,
    ) -> Result<AnalysisOutcome, InputError> {
        let request = build_request(token, amount_text, network, Some(local_time_string()))?;

        tracing::info!(
            wallet,
            url = %self.analyze_url,
            amount = request.amount,
            location = %request.location,
            merchant_type = %request.merchant_type,
            "Sending risk analysis request"
        );

        match self.send(&request).await {
            Ok(result) => {
                tracing::info!(
                    wallet,
                    risk_level = %result.risk_level,
                    risk_score = result.risk_score,
                    "Risk analysis received"
                );
                Ok(AnalysisOutcome::Ok(result))
            }
            Err(e) => {
                tracing::error!(wallet, kind = e.kind(), error = %e, "Risk analysis unavailable");
                Ok(AnalysisOutcome::Unavailable {
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn send(&self, request: &AnalyzeRequest) -> Result<AnalysisResult, ServiceError> {
        let response = self
            .http
            .post(self.analyze_url.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        tracing::debug!(%body, "Risk service replied");
        let parsed: AnalyzeResponse = serde_json::from_str(&body)
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        parsed.into_result()
    }
}

/// Validate the form fields and remap them onto the wire payload:
/// network becomes `location`, token becomes `merchant_type`.
pub fn build_request(
    token: &str,
    amount_text: &str,
    network: &str,
    time: Option<String>,
) -> Result<AnalyzeRequest, InputError> {
    let amount = parse_amount(amount_text)?;
    let token = token.trim();
    if token.is_empty() {
        return Err(InputError::EmptyField("token"));
    }
    let network = network.trim();
    if network.is_empty() {
        return Err(InputError::EmptyField("network"));
    }
    Ok(AnalyzeRequest {
        amount,
        location: network.to_string(),
        merchant_type: token.to_string(),
        time,
    })
}

pub fn parse_amount(text: &str) -> Result<f64, InputError> {
    let trimmed = text.trim();
    let amount: f64 = trimmed
        .parse()
        .map_err(|_| InputError::InvalidAmount(text.to_string()))?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(InputError::AmountOutOfRange(trimmed.to_string()));
    }
    Ok(amount)
}

fn local_time_string() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::types::{RiskLevel, BACKEND_UNAVAILABLE_REASON};
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    async fn spawn_backend(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String, timeout_ms: u64) -> RiskClient {
        RiskClient::new(&BackendConfig {
            base_url,
            request_timeout_ms: timeout_ms,
        })
        .unwrap()
    }

    #[test]
    fn test_build_request_remaps_fields() {
        let request = build_request("USDT", " 1234.5 ", "Polygon", Some("10:11:12".into())).unwrap();
        assert_eq!(request.amount, 1234.5);
        assert_eq!(request.location, "Polygon");
        assert_eq!(request.merchant_type, "USDT");
        assert_eq!(request.time.as_deref(), Some("10:11:12"));
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        assert_eq!(
            build_request("USDT", "12abc", "Polygon", None),
            Err(InputError::InvalidAmount("12abc".to_string()))
        );
        assert!(matches!(
            build_request("USDT", "-5", "Polygon", None),
            Err(InputError::AmountOutOfRange(_))
        ));
        assert!(matches!(
            build_request("USDT", "NaN", "Polygon", None),
            Err(InputError::AmountOutOfRange(_))
        ));
        assert_eq!(
            build_request("  ", "10", "Polygon", None),
            Err(InputError::EmptyField("token"))
        );
        assert_eq!(
            build_request("USDT", "10", "", None),
            Err(InputError::EmptyField("network"))
        );
    }

    #[tokio::test]
    async fn test_analyze_maps_success_and_sends_amount_unchanged() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                "/analyze",
                post(
                    |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        Json(json!({
                            "risk_level": "Fraud",
                            "risk_score": 0.82,
                            "explanation": "x"
                        }))
                    },
                ),
            )
            .with_state(seen.clone());
        let client = client_for(spawn_backend(router).await, 5_000);

        let outcome = client
            .analyze("0xabc", "GamblingToken", "1234.5", "North Korea")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            AnalysisOutcome::Ok(AnalysisResult {
                risk_level: RiskLevel::Fraud,
                risk_score: 82,
                reasons: vec!["x".to_string()],
                confidence: 0.98,
            })
        );

        let bodies = seen.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["amount"].as_f64(), Some(1234.5));
        assert_eq!(bodies[0]["location"], "North Korea");
        assert_eq!(bodies[0]["merchant_type"], "GamblingToken");
        assert!(bodies[0]["time"].is_string());
        assert!(bodies[0].get("wallet").is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(format!("http://{}", addr), 2_000);
        let outcome = client.analyze("0xabc", "ETH", "10", "Ethereum").await.unwrap();

        assert!(matches!(outcome, AnalysisOutcome::Unavailable { .. }));
        let display = outcome.to_display_result();
        assert_eq!(display.risk_level, RiskLevel::Normal);
        assert_eq!(display.risk_score, 0);
        assert_eq!(display.reasons, vec![BACKEND_UNAVAILABLE_REASON.to_string()]);
        assert_eq!(display.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_non_success_status_is_unavailable() {
        let router = Router::new().route(
            "/analyze",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded") }),
        );
        let client = client_for(spawn_backend(router).await, 5_000);

        match client.analyze("0xabc", "ETH", "10", "Ethereum").await.unwrap() {
            AnalysisOutcome::Unavailable { reason } => {
                assert!(reason.contains("500"), "reason was {}", reason);
                assert!(reason.contains("model not loaded"));
            }
            other => panic!("expected unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_unavailable() {
        let router = Router::new().route(
            "/analyze",
            post(|| async { Json(json!({ "status": "online" })) }),
        );
        let client = client_for(spawn_backend(router).await, 5_000);

        let outcome = client.analyze("0xabc", "ETH", "10", "Ethereum").await.unwrap();
        assert!(matches!(outcome, AnalysisOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let router = Router::new().route(
            "/analyze",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "risk_level": "Normal", "risk_score": 0.1, "explanation": "late" }))
            }),
        );
        let client = client_for(spawn_backend(router).await, 100);

        let outcome = client.analyze("0xabc", "ETH", "10", "Ethereum").await.unwrap();
        assert!(matches!(outcome, AnalysisOutcome::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_invalid_amount_is_not_sent() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let router = Router::new()
            .route(
                "/analyze",
                post(
                    |State(seen): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        StatusCode::OK
                    },
                ),
            )
            .with_state(seen.clone());
        let client = client_for(spawn_backend(router).await, 5_000);

        let err = client.analyze("0xabc", "ETH", "ten", "Ethereum").await.unwrap_err();
        assert_eq!(err, InputError::InvalidAmount("ten".to_string()));
        assert!(seen.lock().unwrap().is_empty());
    }
}
