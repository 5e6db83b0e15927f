use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    classification::{LexiconSentimentClassifier, SentimentClassifier},
    clients::{HttpSentimentClassifier, HttpSentimentConfig, HttpTopicConfig, HttpTopicModel},
    clustering::{EmbeddingTopicModel, Embedder, LocalTopicSettings, TfIdfEmbedder, TopicModel},
    config::{Config, EmbedderKind, SentimentBackend, TopicBackend},
    observability::Telemetry,
    pipeline::PipelineOrchestrator,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    pipeline: PipelineOrchestrator,
}

impl ComponentRegistry {
    /// 構成情報から分類器・トピックモデルを選択し、パイプラインを組み立てる。
    ///
    /// # Errors
    /// Telemetry の初期化、HTTP クライアントやローカルモデルの構築が失敗した場合はエラーを返す。
    pub fn build(config: Config, skip_topics: bool) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        let classifier = build_classifier(&config).context("failed to build sentiment classifier")?;
        let topic_model = build_topic_model(&config).context("failed to build topic model")?;
        info!(
            classifier = classifier.name(),
            topic_model = topic_model.name(),
            skip_topics,
            "capabilities selected"
        );

        let pipeline = PipelineOrchestrator::builder(config.clone())
            .with_metrics(telemetry.metrics())
            .with_classifier(classifier)
            .with_topic_model(topic_model)
            .skip_topics(skip_topics)
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            telemetry,
            pipeline,
        })
    }

    #[must_use]
    pub fn pipeline(&self) -> &PipelineOrchestrator {
        &self.pipeline
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}

fn build_classifier(config: &Config) -> Result<Arc<dyn SentimentClassifier>> {
    match config.sentiment_backend() {
        SentimentBackend::Lexicon => Ok(Arc::new(LexiconSentimentClassifier::new())),
        SentimentBackend::Http => {
            let endpoint_url = config
                .sentiment_endpoint_url()
                .context("SENTIMENT_ENDPOINT_URL is required for the http backend")?;
            Ok(Arc::new(HttpSentimentClassifier::new(HttpSentimentConfig {
                endpoint_url: endpoint_url.to_string(),
                connect_timeout: CONNECT_TIMEOUT,
                total_timeout: config.capability_timeout(),
                service_token: config.sentiment_service_token().map(str::to_string),
            })?))
        }
        SentimentBackend::Local => local_classifier(config),
    }
}

#[cfg(feature = "local-model")]
fn local_classifier(config: &Config) -> Result<Arc<dyn SentimentClassifier>> {
    let dir = config
        .local_model_dir()
        .context("LOCAL_MODEL_DIR is required for the local backend")?;
    Ok(Arc::new(
        crate::classification::BertSentimentClassifier::from_dir(dir)?,
    ))
}

#[cfg(not(feature = "local-model"))]
fn local_classifier(_config: &Config) -> Result<Arc<dyn SentimentClassifier>> {
    anyhow::bail!("SENTIMENT_BACKEND=local requires building with the `local-model` feature")
}

fn build_topic_model(config: &Config) -> Result<Arc<dyn TopicModel>> {
    match config.topic_backend() {
        TopicBackend::Local => Ok(Arc::new(EmbeddingTopicModel::new(
            build_embedder(config)?,
            LocalTopicSettings::default(),
        ))),
        TopicBackend::Http => {
            let base_url = config
                .topic_endpoint_url()
                .context("TOPIC_ENDPOINT_URL is required for the http backend")?;
            Ok(Arc::new(HttpTopicModel::new(HttpTopicConfig {
                base_url: base_url.to_string(),
                connect_timeout: CONNECT_TIMEOUT,
                total_timeout: config.capability_timeout(),
                service_token: None,
            })?))
        }
    }
}

fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.topic_embedder() {
        EmbedderKind::TfIdf => Ok(Arc::new(TfIdfEmbedder::default())),
        EmbedderKind::Bert => bert_embedder(config),
    }
}

#[cfg(feature = "local-model")]
fn bert_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    Ok(Arc::new(crate::clustering::BertEmbedder::new(
        config.local_model_dir(),
    )?))
}

#[cfg(not(feature = "local-model"))]
fn bert_embedder(_config: &Config) -> Result<Arc<dyn Embedder>> {
    anyhow::bail!("TOPIC_EMBEDDER=bert requires building with the `local-model` feature")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_selects_offline_capabilities() {
        let registry = ComponentRegistry::build(Config::default(), false).expect("registry builds");

        assert_eq!(registry.config().seed(), 42);
        assert_eq!(registry.pipeline().config().report_top_topics(), 10);
    }

    #[test]
    fn http_backends_build_clients() {
        let config = temp_env::with_vars(
            [
                ("SENTIMENT_BACKEND", Some("http")),
                ("SENTIMENT_ENDPOINT_URL", Some("http://localhost:9100/predict")),
                ("TOPIC_BACKEND", Some("http")),
                ("TOPIC_ENDPOINT_URL", Some("http://localhost:9200")),
            ],
            Config::from_env,
        )
        .expect("config loads");

        assert!(build_classifier(&config).is_ok());
        assert_eq!(
            build_topic_model(&config).expect("topic model builds").name(),
            "http"
        );
    }

    #[cfg(not(feature = "local-model"))]
    #[test]
    fn bert_embedder_requires_feature() {
        let config = temp_env::with_var("TOPIC_EMBEDDER", Some("bert"), Config::from_env)
            .expect("config loads");

        let error = build_topic_model(&config).err().expect("feature is off");
        assert!(format!("{error:#}").contains("local-model"));
    }
}
