use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use rustc_hash::FxHashMap;

use super::Embedder;

/// Bag-of-words TF-IDF encoder fitted on the documents it encodes.
///
/// Input is expected to be already cleaned (lowercase tokens separated by
/// spaces). Vectors are L2-normalised; a document with no vocabulary term
/// encodes to the zero vector.
#[derive(Debug, Clone)]
pub struct TfIdfEmbedder {
    min_document_frequency: usize,
    max_features: usize,
}

impl Default for TfIdfEmbedder {
    fn default() -> Self {
        Self {
            min_document_frequency: 2,
            max_features: 2000,
        }
    }
}

impl TfIdfEmbedder {
    #[must_use]
    pub fn new(min_document_frequency: usize, max_features: usize) -> Self {
        Self {
            min_document_frequency: min_document_frequency.max(1),
            max_features: max_features.max(1),
        }
    }

    /// Vocabulary ordered by descending document frequency, then term.
    fn vocabulary(&self, documents: &[Vec<&str>]) -> Vec<(String, usize)> {
        let mut frequencies: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in documents {
            let mut unique = tokens.clone();
            unique.sort_unstable();
            unique.dedup();
            for token in unique {
                *frequencies.entry(token).or_default() += 1;
            }
        }

        let min_df = if documents.len() < 5 {
            1
        } else {
            self.min_document_frequency
        };
        let mut terms: Vec<(String, usize)> = frequencies
            .into_iter()
            .filter(|(_, df)| *df >= min_df)
            .map(|(term, df)| (term.to_string(), df))
            .collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(self.max_features);
        terms
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn encode_sync(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let documents: Vec<Vec<&str>> = texts
            .iter()
            .map(|text| text.split_whitespace().collect())
            .collect();
        let vocabulary = self.vocabulary(&documents);
        let index: FxHashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(idx, (term, _))| (term.as_str(), idx))
            .collect();

        let n = documents.len() as f32;
        // Smoothed idf: ln((1 + n) / (1 + df)) + 1
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|(_, df)| ((1.0 + n) / (1.0 + *df as f32)).ln() + 1.0)
            .collect();

        documents
            .iter()
            .map(|tokens| {
                let mut vector = vec![0.0_f32; vocabulary.len()];
                for token in tokens {
                    if let Some(&idx) = index.get(token) {
                        vector[idx] += 1.0;
                    }
                }
                for (value, weight) in vector.iter_mut().zip(&idf) {
                    *value *= weight;
                }
                let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
                if norm > 0.0 {
                    for value in &mut vector {
                        *value /= norm;
                    }
                }
                vector
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for TfIdfEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.encode_sync(texts))
    }
}
