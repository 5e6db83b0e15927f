/// 外部トピックサービスクライアント（`POST {base}/fit`）。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url, header::AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{BEARER, summarize_validation_errors};
use crate::clustering::{TopicFit, TopicModel};
use crate::schema::{topic::FIT_RESPONSE_SCHEMA, validate_json};
use crate::util::error::{CapabilityError, status_error};

#[derive(Debug, Serialize)]
struct FitRequest<'a> {
    documents: &'a [String],
    seed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_topics: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct HttpTopicConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpTopicModel {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl HttpTopicModel {
    /// # Errors
    /// URL のパースまたは HTTP クライアントの構築に失敗した場合。
    pub fn new(config: HttpTopicConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build topic HTTP client")?;
        let mut base_url = Url::parse(&config.base_url).context("invalid topic base URL")?;
        // `join` が最後のセグメントを置き換えないよう末尾を揃える
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client,
            base_url,
            service_token: config.service_token,
        })
    }
}

#[async_trait]
impl TopicModel for HttpTopicModel {
    async fn fit(
        &self,
        documents: &[String],
        seed: u64,
        target_topics: Option<usize>,
    ) -> Result<TopicFit> {
        if documents.is_empty() {
            return Ok(TopicFit::empty());
        }

        let url = self
            .base_url
            .join("fit")
            .context("failed to build topic fit URL")?;
        let mut request = self.client.post(url).json(&FitRequest {
            documents,
            seed,
            target_topics,
        });
        if let Some(token) = &self.service_token {
            request = request.header(AUTHORIZATION, format!("{BEARER} {token}"));
        }

        let response = request.send().await.context("topic fit request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body).into());
        }

        let body: Value = response
            .json()
            .await
            .context("failed to decode topic fit response")?;
        let validation = validate_json(&FIT_RESPONSE_SCHEMA, &body);
        if !validation.valid {
            return Err(CapabilityError::Rejected(format!(
                "topic fit response failed schema validation: {}",
                summarize_validation_errors(&validation.errors)
            ))
            .into());
        }

        let fit: TopicFit =
            serde_json::from_value(body).context("failed to parse topic fit response")?;
        fit.validate(documents.len())
            .map_err(|e| CapabilityError::Rejected(e.to_string()))?;

        debug!(
            documents = documents.len(),
            topics = fit.topics.len(),
            "remote topic fit completed"
        );
        Ok(fit)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
