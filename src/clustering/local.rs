use std::sync::Arc;

use anyhow::{Result, ensure};
use async_trait::async_trait;
use tracing::debug;

use crate::model::{TopicId, TopicSummary};
use crate::util::kmeans::KMeans;

use super::naming::{class_keywords, topic_name};
use super::projection::sparse_random_projection;
use super::{Embedder, TfIdfEmbedder, TopicFit, TopicModel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTopicSettings {
    /// Target dimension of the random projection.
    pub n_components: usize,
    /// Clusters smaller than this are folded into noise.
    pub min_cluster_size: usize,
    pub max_iterations: usize,
    /// Points farther than `mean + sigma * std` from their centroid are noise.
    pub outlier_sigma: f32,
    pub max_topics: usize,
    pub keywords_per_topic: usize,
}

impl Default for LocalTopicSettings {
    fn default() -> Self {
        Self {
            n_components: 48,
            min_cluster_size: 3,
            max_iterations: 100,
            outlier_sigma: 2.0,
            max_topics: 10,
            keywords_per_topic: 4,
        }
    }
}

/// Embedding + reduction + seeded k-means topic model.
pub struct EmbeddingTopicModel {
    embedder: Arc<dyn Embedder>,
    settings: LocalTopicSettings,
}

impl Default for EmbeddingTopicModel {
    fn default() -> Self {
        Self::new(Arc::new(TfIdfEmbedder::default()), LocalTopicSettings::default())
    }
}

impl EmbeddingTopicModel {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, settings: LocalTopicSettings) -> Self {
        Self { embedder, settings }
    }

    /// `round(sqrt(n / 2))` clamped to `[2, max_topics]`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn auto_topic_count(&self, documents: usize) -> usize {
        let estimate = (documents as f64 / 2.0).sqrt().round() as usize;
        estimate.clamp(2, self.settings.max_topics.max(2))
    }

    /// Cluster ids per embedded document, `None` for noise.
    #[allow(clippy::cast_precision_loss)]
    fn cluster(
        &self,
        vectors: &[Vec<f32>],
        seed: u64,
        target_topics: Option<usize>,
    ) -> Result<Vec<Option<usize>>> {
        let mut labels: Vec<Option<usize>> = vec![None; vectors.len()];

        let usable: Vec<usize> = vectors
            .iter()
            .enumerate()
            .filter(|(_, vector)| vector.iter().any(|v| *v != 0.0))
            .map(|(idx, _)| idx)
            .collect();
        if usable.len() < self.settings.min_cluster_size.max(2) {
            return Ok(labels);
        }

        let points: Vec<Vec<f32>> = usable.iter().map(|&idx| vectors[idx].clone()).collect();
        let reduced = sparse_random_projection(&points, self.settings.n_components, seed)?;

        let k = target_topics
            .unwrap_or_else(|| self.auto_topic_count(reduced.len()))
            .min(reduced.len());
        let kmeans = KMeans::fit(&reduced, k, self.settings.max_iterations, seed);

        let mean = kmeans.distances.iter().sum::<f32>() / kmeans.distances.len() as f32;
        let variance = kmeans
            .distances
            .iter()
            .map(|d| (d - mean).powi(2))
            .sum::<f32>()
            / kmeans.distances.len() as f32;
        let threshold = mean + self.settings.outlier_sigma * variance.sqrt();

        for ((&idx, &cluster), &distance) in usable
            .iter()
            .zip(&kmeans.assignments)
            .zip(&kmeans.distances)
        {
            if distance <= threshold {
                labels[idx] = Some(cluster);
            }
        }

        let mut sizes = vec![0_usize; k];
        for cluster in labels.iter().flatten() {
            sizes[*cluster] += 1;
        }
        for label in &mut labels {
            if label.is_some_and(|cluster| sizes[cluster] < self.settings.min_cluster_size) {
                *label = None;
            }
        }

        Ok(labels)
    }
}

/// Renumbers clusters by descending size (ties by cluster index) so topic 0
/// is always the largest.
fn renumber(labels: &[Option<usize>]) -> Vec<TopicId> {
    let clusters = labels.iter().flatten().max().map_or(0, |max| max + 1);
    let mut sizes: Vec<(usize, usize)> = (0..clusters).map(|c| (c, 0)).collect();
    for cluster in labels.iter().flatten() {
        sizes[*cluster].1 += 1;
    }
    sizes.retain(|(_, size)| *size > 0);
    sizes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut mapping = vec![TopicId::NOISE; clusters];
    for (rank, (cluster, _)) in sizes.iter().enumerate() {
        mapping[*cluster] = TopicId(i32::try_from(rank).unwrap_or(i32::MAX));
    }

    labels
        .iter()
        .map(|label| label.map_or(TopicId::NOISE, |cluster| mapping[cluster]))
        .collect()
}

#[async_trait]
impl TopicModel for EmbeddingTopicModel {
    async fn fit(
        &self,
        documents: &[String],
        seed: u64,
        target_topics: Option<usize>,
    ) -> Result<TopicFit> {
        if documents.is_empty() {
            return Ok(TopicFit::empty());
        }

        let vectors = self.embedder.encode(documents).await?;
        ensure!(
            vectors.len() == documents.len(),
            "embedder returned {} vectors for {} documents",
            vectors.len(),
            documents.len()
        );

        let labels = self.cluster(&vectors, seed, target_topics)?;
        let assignments = renumber(&labels);

        let keywords = class_keywords(documents, &assignments, self.settings.keywords_per_topic);
        let mut topics: Vec<TopicSummary> = keywords
            .into_iter()
            .map(|(id, words)| TopicSummary {
                id,
                count: assignments.iter().filter(|a| **a == id).count(),
                name: topic_name(id, &words),
            })
            .collect();
        topics.sort_by_key(|topic| topic.id);

        debug!(
            documents = documents.len(),
            topics = topics.iter().filter(|t| !t.id.is_noise()).count(),
            noise = assignments.iter().filter(|a| a.is_noise()).count(),
            "fitted local topic model"
        );

        Ok(TopicFit {
            assignments,
            topics,
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<String> {
        let mut documents = Vec::new();
        for i in 0..12 {
            documents.push(format!("queue wait hours line ride{}", i % 3));
        }
        for i in 0..12 {
            documents.push(format!("food expensive burger price meal{}", i % 3));
        }
        for i in 0..12 {
            documents.push(format!("staff rude unhelpful cast member{}", i % 3));
        }
        documents
    }

    #[tokio::test]
    async fn fit_is_deterministic_and_complete() {
        let model = EmbeddingTopicModel::default();
        let documents = corpus();

        let first = model.fit(&documents, 42, None).await.expect("fit succeeds");
        let second = model.fit(&documents, 42, None).await.expect("fit succeeds");

        assert_eq!(first, second);
        assert_eq!(first.assignments.len(), documents.len());
        first.validate(documents.len()).expect("fit is consistent");
        let total: usize = first.topics.iter().map(|t| t.count).sum();
        assert_eq!(total, documents.len());
    }

    #[tokio::test]
    async fn topics_are_numbered_by_size_and_named() {
        let model = EmbeddingTopicModel::default();
        let fit = model
            .fit(&corpus(), 42, Some(3))
            .await
            .expect("fit succeeds");

        let real: Vec<&TopicSummary> = fit.topics.iter().filter(|t| !t.id.is_noise()).collect();
        assert!(!real.is_empty());
        assert!(real.windows(2).all(|w| w[0].count >= w[1].count));
        for topic in real {
            assert!(topic.name.starts_with(&format!("{}_", topic.id)));
        }
    }

    #[tokio::test]
    async fn documents_without_terms_are_noise() {
        let model = EmbeddingTopicModel::default();
        let mut documents = corpus();
        documents.push("zzz".to_string());

        let fit = model.fit(&documents, 42, None).await.expect("fit succeeds");
        assert_eq!(fit.assignments.last(), Some(&TopicId::NOISE));
    }

    #[tokio::test]
    async fn tiny_inputs_are_all_noise() {
        let model = EmbeddingTopicModel::default();
        let fit = model
            .fit(&["queue".to_string(), "queue".to_string()], 1, None)
            .await
            .expect("fit succeeds");
        assert!(fit.assignments.iter().all(|a| a.is_noise()));
    }

    #[test]
    fn renumber_orders_by_size() {
        let labels = vec![Some(2), Some(0), Some(2), None, Some(2), Some(0), Some(1)];
        let ids = renumber(&labels);
        assert_eq!(
            ids,
            vec![
                TopicId(0),
                TopicId(1),
                TopicId(0),
                TopicId::NOISE,
                TopicId(0),
                TopicId(1),
                TopicId(2)
            ]
        );
    }
}
