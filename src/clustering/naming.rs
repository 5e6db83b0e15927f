//! Class-based TF-IDF keywords for naming clusters.
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::model::TopicId;

/// Top `limit` keywords per topic.
///
/// Each topic is treated as one concatenated document. A term scores
/// `tf(t, c) * ln(1 + A / f(t))` where `A` is the average token count per
/// topic and `f(t)` the frequency of `t` across all topics. Ties break
/// alphabetically.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn class_keywords(
    documents: &[String],
    assignments: &[TopicId],
    limit: usize,
) -> BTreeMap<TopicId, Vec<String>> {
    let mut class_terms: BTreeMap<TopicId, FxHashMap<&str, usize>> = BTreeMap::new();
    let mut global: FxHashMap<&str, usize> = FxHashMap::default();

    for (document, topic) in documents.iter().zip(assignments) {
        let terms = class_terms.entry(*topic).or_default();
        for token in document.split_whitespace() {
            *terms.entry(token).or_default() += 1;
            *global.entry(token).or_default() += 1;
        }
    }

    if class_terms.is_empty() {
        return BTreeMap::new();
    }

    let total_tokens: usize = global.values().sum();
    let average = total_tokens as f64 / class_terms.len() as f64;

    class_terms
        .into_iter()
        .map(|(topic, terms)| {
            let class_total: usize = terms.values().sum();
            let mut scored: Vec<(&str, f64)> = terms
                .iter()
                .map(|(term, count)| {
                    let tf = *count as f64 / class_total.max(1) as f64;
                    let frequency = global.get(term).copied().unwrap_or(1) as f64;
                    (*term, tf * (1.0 + average / frequency).ln())
                })
                .collect();
            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            let keywords = scored
                .into_iter()
                .take(limit)
                .map(|(term, _)| term.to_string())
                .collect();
            (topic, keywords)
        })
        .collect()
}

/// `"{id}_{kw1}_{kw2}..."`, or just the id when there are no keywords.
pub(crate) fn topic_name(topic: TopicId, keywords: &[String]) -> String {
    std::iter::once(topic.to_string())
        .chain(keywords.iter().cloned())
        .collect::<Vec<_>>()
        .join("_")
}
