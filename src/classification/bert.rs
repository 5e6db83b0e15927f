//! rust-bert sequence classifier loaded from converted local weights.
//!
//! The directory must contain `rust_model.ot`, `config.json` and `vocab.txt`
//! for a BERT five-star review model.
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::sequence_classification::{
    SequenceClassificationConfig, SequenceClassificationModel,
};
use rust_bert::resources::LocalResource;
use tokio::sync::Mutex;

use super::{RawSentiment, SentimentClassifier};
use crate::util::error::CapabilityError;

#[derive(Clone)]
pub struct BertSentimentClassifier {
    model: Arc<Mutex<SequenceClassificationModel>>,
}

impl std::fmt::Debug for BertSentimentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertSentimentClassifier")
            .field("model", &"<SequenceClassificationModel>")
            .finish()
    }
}

impl BertSentimentClassifier {
    /// Loads the model. Blocking and slow, so it runs on its own thread.
    ///
    /// # Errors
    /// Fails when the weights cannot be loaded.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let dir = dir.to_path_buf();
        let model = std::thread::spawn(move || {
            let config = SequenceClassificationConfig::new(
                ModelType::Bert,
                ModelResource::Torch(Box::new(LocalResource::from(dir.join("rust_model.ot")))),
                LocalResource::from(dir.join("config.json")),
                LocalResource::from(dir.join("vocab.txt")),
                None,
                true,
                None,
                None,
            );
            SequenceClassificationModel::new(config)
        })
        .join()
        .map_err(|_| anyhow::anyhow!("failed to join model loading thread"))?
        .context("failed to load sentiment model")?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl SentimentClassifier for BertSentimentClassifier {
    async fn classify(&self, text: &str) -> Result<RawSentiment> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        let label = tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            model.predict([text.as_str()]).into_iter().next()
        })
        .await
        .context("failed to join sentiment task")?
        .ok_or_else(|| CapabilityError::Rejected("model returned no label".to_string()))?;

        Ok(RawSentiment::Label(label.text))
    }

    fn name(&self) -> &'static str {
        "bert"
    }
}
