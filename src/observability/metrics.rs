/// Prometheusメトリクス定義。
use std::sync::Arc;

use prometheus::{
    Counter, Encoder, Gauge, Histogram, Registry, TextEncoder, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};

/// メトリクスコレクター。
///
/// 自前の [`Registry`] に登録するので、同一プロセス内で複数の実行を
/// 並べても名前が衝突しない。
#[derive(Debug, Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    // カウンター
    pub reviews_loaded: Counter,
    pub reviews_dropped: Counter,
    pub reviews_duplicated: Counter,
    pub reviews_sampled: Counter,
    pub sentiment_annotated: Counter,
    pub sentiment_failed: Counter,
    pub capability_retries: Counter,
    pub topic_fits_completed: Counter,
    pub topic_fits_failed: Counter,
    pub topic_branches_skipped: Counter,

    // ヒストグラム
    pub preprocess_duration: Histogram,
    pub dedup_duration: Histogram,
    pub sentiment_call_duration: Histogram,
    pub topic_fit_duration: Histogram,
    pub run_duration: Histogram,

    // ゲージ
    pub reviews_surviving: Gauge,
    pub topics_discovered: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    ///
    /// # Errors
    /// 同じレジストリに同名のメトリクスが登録済みの場合。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            reviews_loaded: register_counter_with_registry!(
                "review_rows_loaded_total",
                "Total number of dataset rows loaded",
                registry
            )?,
            reviews_dropped: register_counter_with_registry!(
                "review_rows_dropped_total",
                "Reviews dropped for null, empty or out-of-range text",
                registry
            )?,
            reviews_duplicated: register_counter_with_registry!(
                "review_duplicates_total",
                "Reviews dropped as exact cleaned-text duplicates",
                registry
            )?,
            reviews_sampled: register_counter_with_registry!(
                "review_sampled_total",
                "Reviews drawn into the sentiment sample",
                registry
            )?,
            sentiment_annotated: register_counter_with_registry!(
                "review_sentiment_annotated_total",
                "Reviews labelled by the sentiment classifier",
                registry
            )?,
            sentiment_failed: register_counter_with_registry!(
                "review_sentiment_failed_total",
                "Reviews whose sentiment annotation failed",
                registry
            )?,
            capability_retries: register_counter_with_registry!(
                "review_capability_retries_total",
                "Retried calls to external capabilities",
                registry
            )?,
            topic_fits_completed: register_counter_with_registry!(
                "review_topic_fits_completed_total",
                "Per-branch topic fits that completed",
                registry
            )?,
            topic_fits_failed: register_counter_with_registry!(
                "review_topic_fits_failed_total",
                "Per-branch topic fits that failed",
                registry
            )?,
            topic_branches_skipped: register_counter_with_registry!(
                "review_topic_branches_skipped_total",
                "Branches skipped for having too few documents",
                registry
            )?,
            preprocess_duration: register_histogram_with_registry!(
                "review_preprocess_duration_seconds",
                "Duration of cleaning and visitor classification",
                registry
            )?,
            dedup_duration: register_histogram_with_registry!(
                "review_dedup_duration_seconds",
                "Duration of deduplication",
                registry
            )?,
            sentiment_call_duration: register_histogram_with_registry!(
                "review_sentiment_call_duration_seconds",
                "Duration of a single sentiment annotation including retries",
                registry
            )?,
            topic_fit_duration: register_histogram_with_registry!(
                "review_topic_fit_duration_seconds",
                "Duration of one per-branch topic fit",
                registry
            )?,
            run_duration: register_histogram_with_registry!(
                "review_run_duration_seconds",
                "Duration of a full analysis run",
                registry
            )?,
            reviews_surviving: register_gauge_with_registry!(
                "review_rows_surviving",
                "Reviews left after cleaning, filtering and dedup",
                registry
            )?,
            topics_discovered: register_gauge_with_registry!(
                "review_topics_discovered",
                "Non-noise topics discovered across branches",
                registry
            )?,
            registry,
        })
    }

    /// 専用レジストリのテキスト形式スナップショット。
    #[must_use]
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
