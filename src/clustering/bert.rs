use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use tokio::sync::Mutex;

use super::Embedder;

/// Sentence embeddings via rust-bert. Runs on CPU.
#[derive(Clone)]
pub struct BertEmbedder {
    model: Arc<Mutex<SentenceEmbeddingsModel>>,
}

impl std::fmt::Debug for BertEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BertEmbedder")
            .field("model", &"<SentenceEmbeddingsModel>")
            .finish()
    }
}

impl BertEmbedder {
    /// Loads from `dir` when given, otherwise downloads all-MiniLM-L6-v2 on
    /// first use.
    ///
    /// # Errors
    /// Fails when the model cannot be loaded.
    pub fn new(dir: Option<&Path>) -> Result<Self> {
        let dir = dir.map(Path::to_path_buf);
        // 重い初期化なので別スレッドで行う
        let model = std::thread::spawn(move || match dir {
            Some(dir) => SentenceEmbeddingsBuilder::local(dir).create_model(),
            None => SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL6V2)
                .create_model(),
        })
        .join()
        .map_err(|_| anyhow::anyhow!("failed to join model creation thread"))?
        .context("failed to load sentence embedding model")?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for BertEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            model.encode(&texts)
        })
        .await
        .context("failed to join embedding task")?
        .context("failed to encode texts")
    }
}
