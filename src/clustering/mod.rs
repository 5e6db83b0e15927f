//! Topic discovery capability.
//!
//! The pipeline only sees [`TopicModel`]. The local implementation embeds
//! documents, reduces them and clusters with seeded k-means; a remote
//! implementation lives in [`crate::clients::topic`].
use anyhow::{Result, bail};
use async_trait::async_trait;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::model::{TopicId, TopicSummary};

#[cfg(feature = "local-model")]
pub mod bert;
pub mod local;
pub(crate) mod naming;
pub(crate) mod projection;
pub mod tfidf;

#[cfg(feature = "local-model")]
pub use bert::BertEmbedder;
pub use local::{EmbeddingTopicModel, LocalTopicSettings};
pub use tfidf::TfIdfEmbedder;

/// Result of fitting a topic model on one document list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFit {
    /// One id per input document, in input order. `-1` is noise.
    pub assignments: Vec<TopicId>,
    pub topics: Vec<TopicSummary>,
}

impl TopicFit {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            assignments: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Checks the fit against the documents it was computed for.
    ///
    /// # Errors
    /// Fails when the assignment count differs from `document_count` or an
    /// assigned id has no summary row.
    pub fn validate(&self, document_count: usize) -> Result<()> {
        if self.assignments.len() != document_count {
            bail!(
                "topic model returned {} assignments for {} documents",
                self.assignments.len(),
                document_count
            );
        }

        let known: FxHashSet<TopicId> = self.topics.iter().map(|topic| topic.id).collect();
        if let Some(unknown) = self
            .assignments
            .iter()
            .find(|id| !id.is_noise() && !known.contains(id))
        {
            bail!("topic model assigned unknown topic {unknown}");
        }
        Ok(())
    }
}

#[async_trait]
pub trait TopicModel: Send + Sync {
    /// Clusters `documents`. `target_topics` caps the topic count when set.
    async fn fit(
        &self,
        documents: &[String],
        seed: u64,
        target_topics: Option<usize>,
    ) -> Result<TopicFit>;

    fn name(&self) -> &'static str;
}

/// Dense text encoder used by the local topic model.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
