//! `lingua`ベースの言語判定ラッパ。
//!
//! レビューに現れる主要言語に限定して検出し、信頼度が低い場合は`und`を返す。
use lingua::{Language, LanguageDetector, LanguageDetectorBuilder};
use once_cell::sync::Lazy;

/// 判定不能を表す言語コード。
pub const UNDETERMINED: &str = "und";

static DETECTOR: Lazy<LanguageDetector> = Lazy::new(|| {
    LanguageDetectorBuilder::from_languages(&[
        Language::English,
        Language::French,
        Language::German,
        Language::Spanish,
        Language::Chinese,
    ])
    .with_minimum_relative_distance(0.01)
    .build()
});

/// 判定を打ち切るしきい値。`Config`から渡される。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LanguageThresholds {
    /// これより短いテキストは`und`
    pub min_chars: usize,
    /// 検出言語の信頼度がこれ未満なら`und`
    pub min_confidence: f64,
}

impl Default for LanguageThresholds {
    fn default() -> Self {
        Self {
            min_chars: 20,
            min_confidence: 0.5,
        }
    }
}

impl LanguageThresholds {
    /// テキストの言語を ISO 639-1 コードで返す。
    ///
    /// 文字数が少ない、または信頼度が低い場合は [`UNDETERMINED`]。
    #[must_use]
    pub fn detect(&self, text: &str) -> String {
        if text.chars().count() < self.min_chars {
            return UNDETERMINED.to_string();
        }

        let Some(language) = DETECTOR.detect_language_of(text) else {
            return UNDETERMINED.to_string();
        };

        let confidence = DETECTOR
            .compute_language_confidence_values(text)
            .iter()
            .find(|(candidate, _)| *candidate == language)
            .map_or(0.0, |(_, conf)| *conf);

        if confidence < self.min_confidence {
            return UNDETERMINED.to_string();
        }

        language.iso_code_639_1().to_string().to_lowercase()
    }
}

/// 既定のしきい値で判定する。
#[must_use]
pub fn detect_language_code(text: &str) -> String {
    LanguageThresholds::default().detect(text)
}
