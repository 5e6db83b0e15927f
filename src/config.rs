use std::{env, num::NonZeroUsize, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::classification::SentimentPolicy;
use crate::language_detection::LanguageThresholds;
use crate::model::SentimentLabel;

/// 感情分類バックエンドの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentimentBackend {
    Lexicon,
    Http,
    Local,
}

/// トピック抽出バックエンドの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicBackend {
    Local,
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    TfIdf,
    Bert,
}

/// トピック抽出の対象にする感情ラベル。`None` は全件。
pub type TopicSentimentFilter = Option<SentimentLabel>;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    max_review_chars: usize,
    min_review_words: Option<NonZeroUsize>,
    extra_stopwords: Vec<String>,
    language_min_chars: usize,
    language_min_confidence: f64,
    seed: u64,
    sentiment_sample_size: NonZeroUsize,
    sentiment_char_budget: NonZeroUsize,
    sentiment_policy: SentimentPolicy,
    sentiment_backend: SentimentBackend,
    sentiment_endpoint_url: Option<String>,
    sentiment_service_token: Option<String>,
    topic_backend: TopicBackend,
    topic_endpoint_url: Option<String>,
    topic_sentiment: TopicSentimentFilter,
    topic_max_documents: NonZeroUsize,
    topic_min_documents: usize,
    topic_target_count: Option<NonZeroUsize>,
    topic_embedder: EmbedderKind,
    local_model_dir: Option<PathBuf>,
    capability_timeout: Duration,
    capability_max_retries: usize,
    capability_backoff_base_ms: u64,
    capability_backoff_cap_ms: u64,
    report_top_topics: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_review_chars: 1734,
            min_review_words: None,
            extra_stopwords: Vec::new(),
            language_min_chars: LanguageThresholds::default().min_chars,
            language_min_confidence: LanguageThresholds::default().min_confidence,
            seed: 42,
            sentiment_sample_size: NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN),
            sentiment_char_budget: NonZeroUsize::new(450).unwrap_or(NonZeroUsize::MIN),
            sentiment_policy: SentimentPolicy::FiveStar,
            sentiment_backend: SentimentBackend::Lexicon,
            sentiment_endpoint_url: None,
            sentiment_service_token: None,
            topic_backend: TopicBackend::Local,
            topic_endpoint_url: None,
            topic_sentiment: Some(SentimentLabel::Negative),
            topic_max_documents: NonZeroUsize::new(500).unwrap_or(NonZeroUsize::MIN),
            topic_min_documents: 10,
            topic_target_count: None,
            topic_embedder: EmbedderKind::TfIdf,
            local_model_dir: None,
            capability_timeout: Duration::from_millis(30_000),
            capability_max_retries: 3,
            capability_backoff_base_ms: 250,
            capability_backoff_cap_ms: 10_000,
            report_top_topics: 10,
        }
    }
}

impl Config {
    /// 環境変数から分析設定を読み込み、検証する。
    ///
    /// 未設定の値は [`Config::default`] の値を使う。
    ///
    /// # Errors
    /// 値のパースに失敗した場合、または HTTP バックエンド選択時にエンドポイントが
    /// 未設定の場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        // Cleaning
        let max_review_chars = parse_usize("REVIEW_MAX_CHARS", defaults.max_review_chars)?;
        let min_review_words = NonZeroUsize::new(parse_usize("REVIEW_MIN_WORDS", 0)?);
        let extra_stopwords = parse_csv("REVIEW_EXTRA_STOPWORDS", "")
            .into_iter()
            .map(|word| word.to_lowercase())
            .collect();
        let language_min_chars =
            parse_usize("REVIEW_LANG_DETECT_MIN_CHARS", defaults.language_min_chars)?;
        let language_min_confidence = parse_f64(
            "REVIEW_LANG_DETECT_MIN_CONFIDENCE",
            defaults.language_min_confidence,
        )?;
        if !(0.0..=1.0).contains(&language_min_confidence) {
            return Err(ConfigError::Invalid {
                name: "REVIEW_LANG_DETECT_MIN_CONFIDENCE",
                source: anyhow::anyhow!("must be within 0.0..=1.0"),
            });
        }

        let seed = parse_u64("ANALYSIS_SEED", defaults.seed)?;

        // Sentiment
        let sentiment_sample_size =
            parse_non_zero_usize("SENTIMENT_SAMPLE_SIZE", defaults.sentiment_sample_size.get())?;
        let sentiment_char_budget =
            parse_non_zero_usize("SENTIMENT_CHAR_BUDGET", defaults.sentiment_char_budget.get())?;
        let sentiment_policy = parse_enum("SENTIMENT_POLICY", "five_star", |raw| match raw {
            "five_star" | "five-star" | "stars" => Some(SentimentPolicy::FiveStar),
            "three_class" | "three-class" | "labels" => Some(SentimentPolicy::ThreeClass),
            _ => None,
        })?;
        let sentiment_backend = parse_enum("SENTIMENT_BACKEND", "lexicon", |raw| match raw {
            "lexicon" => Some(SentimentBackend::Lexicon),
            "http" => Some(SentimentBackend::Http),
            "local" => Some(SentimentBackend::Local),
            _ => None,
        })?;
        let sentiment_endpoint_url = env::var("SENTIMENT_ENDPOINT_URL").ok();
        let sentiment_service_token = env::var("SENTIMENT_SERVICE_TOKEN").ok();
        if sentiment_backend == SentimentBackend::Http && sentiment_endpoint_url.is_none() {
            return Err(ConfigError::Missing("SENTIMENT_ENDPOINT_URL"));
        }

        // Topics
        let topic_backend = parse_enum("TOPIC_BACKEND", "local", |raw| match raw {
            "local" => Some(TopicBackend::Local),
            "http" => Some(TopicBackend::Http),
            _ => None,
        })?;
        let topic_endpoint_url = env::var("TOPIC_ENDPOINT_URL").ok();
        if topic_backend == TopicBackend::Http && topic_endpoint_url.is_none() {
            return Err(ConfigError::Missing("TOPIC_ENDPOINT_URL"));
        }
        let topic_sentiment = parse_enum("TOPIC_SENTIMENT", "negative", |raw| match raw {
            "all" => Some(None),
            label => label.parse::<SentimentLabel>().ok().map(Some),
        })?;
        let topic_max_documents =
            parse_non_zero_usize("TOPIC_MAX_DOCUMENTS", defaults.topic_max_documents.get())?;
        let topic_min_documents = parse_usize("TOPIC_MIN_DOCUMENTS", defaults.topic_min_documents)?;
        let topic_target_count = NonZeroUsize::new(parse_usize("TOPIC_TARGET_COUNT", 0)?);
        let topic_embedder = parse_enum("TOPIC_EMBEDDER", "tfidf", |raw| match raw {
            "tfidf" | "tf-idf" => Some(EmbedderKind::TfIdf),
            "bert" => Some(EmbedderKind::Bert),
            _ => None,
        })?;
        let local_model_dir = env::var("LOCAL_MODEL_DIR").ok().map(PathBuf::from);
        if local_model_dir.is_none() && sentiment_backend == SentimentBackend::Local {
            return Err(ConfigError::Missing("LOCAL_MODEL_DIR"));
        }

        // External capability calls (timeout + exponential backoff + jitter)
        let capability_timeout = parse_duration_ms("CAPABILITY_TIMEOUT_MS", 30_000)?;
        let capability_max_retries =
            parse_usize("CAPABILITY_MAX_RETRIES", defaults.capability_max_retries)?;
        let capability_backoff_base_ms =
            parse_u64("CAPABILITY_BACKOFF_BASE_MS", defaults.capability_backoff_base_ms)?;
        let capability_backoff_cap_ms =
            parse_u64("CAPABILITY_BACKOFF_CAP_MS", defaults.capability_backoff_cap_ms)?;

        let report_top_topics = parse_usize("REPORT_TOP_TOPICS", defaults.report_top_topics)?;

        Ok(Self {
            max_review_chars,
            min_review_words,
            extra_stopwords,
            language_min_chars,
            language_min_confidence,
            seed,
            sentiment_sample_size,
            sentiment_char_budget,
            sentiment_policy,
            sentiment_backend,
            sentiment_endpoint_url,
            sentiment_service_token,
            topic_backend,
            topic_endpoint_url,
            topic_sentiment,
            topic_max_documents,
            topic_min_documents,
            topic_target_count,
            topic_embedder,
            local_model_dir,
            capability_timeout,
            capability_max_retries,
            capability_backoff_base_ms,
            capability_backoff_cap_ms,
            report_top_topics,
        })
    }

    #[must_use]
    pub fn max_review_chars(&self) -> usize {
        self.max_review_chars
    }

    #[must_use]
    pub fn min_review_words(&self) -> Option<NonZeroUsize> {
        self.min_review_words
    }

    #[must_use]
    pub fn extra_stopwords(&self) -> &[String] {
        &self.extra_stopwords
    }

    /// 言語判定のしきい値。
    #[must_use]
    pub fn language_thresholds(&self) -> LanguageThresholds {
        LanguageThresholds {
            min_chars: self.language_min_chars,
            min_confidence: self.language_min_confidence,
        }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn sentiment_sample_size(&self) -> NonZeroUsize {
        self.sentiment_sample_size
    }

    #[must_use]
    pub fn sentiment_char_budget(&self) -> NonZeroUsize {
        self.sentiment_char_budget
    }

    #[must_use]
    pub fn sentiment_policy(&self) -> SentimentPolicy {
        self.sentiment_policy
    }

    #[must_use]
    pub fn sentiment_backend(&self) -> SentimentBackend {
        self.sentiment_backend
    }

    #[must_use]
    pub fn sentiment_endpoint_url(&self) -> Option<&str> {
        self.sentiment_endpoint_url.as_deref()
    }

    #[must_use]
    pub fn sentiment_service_token(&self) -> Option<&str> {
        self.sentiment_service_token.as_deref()
    }

    #[must_use]
    pub fn topic_backend(&self) -> TopicBackend {
        self.topic_backend
    }

    #[must_use]
    pub fn topic_endpoint_url(&self) -> Option<&str> {
        self.topic_endpoint_url.as_deref()
    }

    #[must_use]
    pub fn topic_sentiment(&self) -> TopicSentimentFilter {
        self.topic_sentiment
    }

    #[must_use]
    pub fn topic_max_documents(&self) -> NonZeroUsize {
        self.topic_max_documents
    }

    #[must_use]
    pub fn topic_min_documents(&self) -> usize {
        self.topic_min_documents
    }

    #[must_use]
    pub fn topic_target_count(&self) -> Option<NonZeroUsize> {
        self.topic_target_count
    }

    #[must_use]
    pub fn topic_embedder(&self) -> EmbedderKind {
        self.topic_embedder
    }

    /// Directory holding the converted local model weights.
    #[must_use]
    pub fn local_model_dir(&self) -> Option<&std::path::Path> {
        self.local_model_dir.as_deref()
    }

    #[must_use]
    pub fn capability_timeout(&self) -> Duration {
        self.capability_timeout
    }

    #[must_use]
    pub fn capability_max_retries(&self) -> usize {
        self.capability_max_retries
    }

    #[must_use]
    pub fn capability_backoff_base_ms(&self) -> u64 {
        self.capability_backoff_base_ms
    }

    #[must_use]
    pub fn capability_backoff_cap_ms(&self) -> u64 {
        self.capability_backoff_cap_ms
    }

    #[must_use]
    pub fn report_top_topics(&self) -> usize {
        self.report_top_topics
    }
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let ms = parse_u64(name, default_ms)?;
    Ok(Duration::from_millis(ms))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_enum<T>(
    name: &'static str,
    default: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    parse(raw.trim().to_lowercase().as_str()).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("unsupported value: {raw}"),
    })
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 25] = [
        "REVIEW_MAX_CHARS",
        "REVIEW_MIN_WORDS",
        "REVIEW_EXTRA_STOPWORDS",
        "REVIEW_LANG_DETECT_MIN_CHARS",
        "REVIEW_LANG_DETECT_MIN_CONFIDENCE",
        "ANALYSIS_SEED",
        "SENTIMENT_SAMPLE_SIZE",
        "SENTIMENT_CHAR_BUDGET",
        "SENTIMENT_POLICY",
        "SENTIMENT_BACKEND",
        "SENTIMENT_ENDPOINT_URL",
        "SENTIMENT_SERVICE_TOKEN",
        "TOPIC_BACKEND",
        "TOPIC_ENDPOINT_URL",
        "TOPIC_SENTIMENT",
        "TOPIC_MAX_DOCUMENTS",
        "TOPIC_MIN_DOCUMENTS",
        "TOPIC_TARGET_COUNT",
        "TOPIC_EMBEDDER",
        "LOCAL_MODEL_DIR",
        "CAPABILITY_TIMEOUT_MS",
        "CAPABILITY_MAX_RETRIES",
        "CAPABILITY_BACKOFF_BASE_MS",
        "CAPABILITY_BACKOFF_CAP_MS",
        "REPORT_TOP_TOPICS",
    ];

    fn with_env<R>(overrides: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
        let vars: Vec<(&str, Option<&str>)> = VARS
            .iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| *value);
                (*name, value)
            })
            .collect();
        temp_env::with_vars(vars, f)
    }

    #[test]
    fn from_env_uses_defaults_when_unset() {
        let config = with_env(&[], Config::from_env).expect("config should load");

        assert_eq!(config, Config::default());
        assert_eq!(config.max_review_chars(), 1734);
        assert!(config.min_review_words().is_none());
        assert_eq!(config.seed(), 42);
        assert_eq!(config.sentiment_char_budget().get(), 450);
        assert_eq!(config.sentiment_policy(), SentimentPolicy::FiveStar);
        assert_eq!(config.topic_sentiment(), Some(SentimentLabel::Negative));
        assert_eq!(config.capability_timeout(), Duration::from_secs(30));
        assert_eq!(config.language_thresholds(), LanguageThresholds::default());
    }

    #[test]
    fn language_thresholds_read_from_env() {
        let config = with_env(
            &[
                ("REVIEW_LANG_DETECT_MIN_CHARS", "40"),
                ("REVIEW_LANG_DETECT_MIN_CONFIDENCE", "0.8"),
            ],
            Config::from_env,
        )
        .expect("config should load");

        let thresholds = config.language_thresholds();
        assert_eq!(thresholds.min_chars, 40);
        assert!((thresholds.min_confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn language_confidence_outside_unit_range_is_rejected() {
        let error = with_env(
            &[("REVIEW_LANG_DETECT_MIN_CONFIDENCE", "1.5")],
            Config::from_env,
        )
        .expect_err("confidence above one");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "REVIEW_LANG_DETECT_MIN_CONFIDENCE",
                ..
            }
        ));
    }

    #[test]
    fn from_env_overrides_values() {
        let config = with_env(
            &[
                ("REVIEW_MAX_CHARS", "900"),
                ("REVIEW_MIN_WORDS", "10"),
                ("REVIEW_EXTRA_STOPWORDS", "Castle, mickey"),
                ("ANALYSIS_SEED", "7"),
                ("SENTIMENT_POLICY", "three_class"),
                ("SENTIMENT_BACKEND", "http"),
                ("SENTIMENT_ENDPOINT_URL", "http://localhost:8080/classify"),
                ("TOPIC_SENTIMENT", "all"),
                ("TOPIC_TARGET_COUNT", "6"),
                ("CAPABILITY_MAX_RETRIES", "5"),
            ],
            Config::from_env,
        )
        .expect("config should load");

        assert_eq!(config.max_review_chars(), 900);
        assert_eq!(config.min_review_words().map(NonZeroUsize::get), Some(10));
        assert_eq!(config.extra_stopwords(), &["castle", "mickey"]);
        assert_eq!(config.seed(), 7);
        assert_eq!(config.sentiment_policy(), SentimentPolicy::ThreeClass);
        assert_eq!(config.sentiment_backend(), SentimentBackend::Http);
        assert_eq!(
            config.sentiment_endpoint_url(),
            Some("http://localhost:8080/classify")
        );
        assert_eq!(config.topic_sentiment(), None);
        assert_eq!(config.topic_target_count().map(NonZeroUsize::get), Some(6));
        assert_eq!(config.capability_max_retries(), 5);
    }

    #[test]
    fn from_env_errors_when_http_endpoint_missing() {
        let error = with_env(&[("TOPIC_BACKEND", "http")], Config::from_env)
            .expect_err("missing endpoint should fail");

        assert!(matches!(error, ConfigError::Missing("TOPIC_ENDPOINT_URL")));
    }

    #[test]
    fn from_env_rejects_zero_sample_size() {
        let error = with_env(&[("SENTIMENT_SAMPLE_SIZE", "0")], Config::from_env)
            .expect_err("zero sample should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "SENTIMENT_SAMPLE_SIZE",
                ..
            }
        ));
    }

    #[test]
    fn from_env_rejects_unknown_policy() {
        let error = with_env(&[("SENTIMENT_POLICY", "vibes")], Config::from_env)
            .expect_err("unknown policy should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "SENTIMENT_POLICY",
                ..
            }
        ));
    }

    #[test]
    fn local_sentiment_backend_requires_model_dir() {
        let error = with_env(&[("SENTIMENT_BACKEND", "local")], Config::from_env)
            .expect_err("local backend without weights should fail");
        assert!(matches!(error, ConfigError::Missing("LOCAL_MODEL_DIR")));

        let config = with_env(
            &[("TOPIC_EMBEDDER", "bert"), ("LOCAL_MODEL_DIR", "/models")],
            Config::from_env,
        )
        .expect("config should load");
        assert_eq!(config.topic_embedder(), EmbedderKind::Bert);
        assert_eq!(
            config.local_model_dir(),
            Some(std::path::Path::new("/models"))
        );
    }
}
