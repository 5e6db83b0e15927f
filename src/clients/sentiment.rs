/// 外部の感情分類サービスクライアント。
///
/// Hugging Face 推論 API 互換のエンドポイントに `{"inputs": text}` を POST し、
/// 最もスコアの高いラベルを返す。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{BEARER, summarize_validation_errors};
use crate::classification::{RawSentiment, SentimentClassifier};
use crate::schema::{sentiment::PREDICTION_RESPONSE_SCHEMA, validate_json};
use crate::util::error::{CapabilityError, status_error};

#[derive(Debug, Serialize)]
struct PredictionRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct Prediction {
    label: String,
    #[serde(default)]
    score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PredictionResponse {
    Flat(Vec<Prediction>),
    Batched(Vec<Vec<Prediction>>),
}

impl PredictionResponse {
    fn best(self) -> Option<Prediction> {
        let predictions = match self {
            PredictionResponse::Flat(predictions) => predictions,
            PredictionResponse::Batched(batches) => batches.into_iter().next()?,
        };
        predictions
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

#[derive(Debug, Clone)]
pub struct HttpSentimentConfig {
    pub endpoint_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpSentimentClassifier {
    client: Client,
    endpoint: Url,
    service_token: Option<String>,
}

impl HttpSentimentClassifier {
    /// # Errors
    /// URL のパースまたは HTTP クライアントの構築に失敗した場合。
    pub fn new(config: HttpSentimentConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build sentiment HTTP client")?;
        let endpoint =
            Url::parse(&config.endpoint_url).context("invalid sentiment endpoint URL")?;

        Ok(Self {
            client,
            endpoint,
            service_token: config.service_token,
        })
    }
}

#[async_trait]
impl SentimentClassifier for HttpSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<RawSentiment> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .json(&PredictionRequest { inputs: text });
        if let Some(token) = &self.service_token {
            request = request.header(AUTHORIZATION, format!("{BEARER} {token}"));
        }

        let response = request
            .send()
            .await
            .context("sentiment request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body).into());
        }

        let body: Value = response
            .json()
            .await
            .context("failed to decode sentiment response")?;
        let validation = validate_json(&PREDICTION_RESPONSE_SCHEMA, &body);
        if !validation.valid {
            return Err(CapabilityError::Rejected(format!(
                "sentiment response failed schema validation: {}",
                summarize_validation_errors(&validation.errors)
            ))
            .into());
        }

        let prediction = serde_json::from_value::<PredictionResponse>(body)
            .context("failed to parse sentiment predictions")?
            .best()
            .ok_or_else(|| CapabilityError::Rejected("empty prediction list".to_string()))?;

        debug!(label = %prediction.label, score = prediction.score, "sentiment predicted");
        Ok(RawSentiment::Label(prediction.label))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
