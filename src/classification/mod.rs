//! 感情分類ケイパビリティと、その出力を3クラスへ写像するラベリングポリシー。
//!
//! 分類器そのものは差し替え可能で、パイプラインは [`SentimentClassifier`]
//! トレイト越しにしか触らない。
use async_trait::async_trait;
use serde::Serialize;

use crate::model::SentimentLabel;
use crate::util::error::CapabilityError;

pub mod lexicon;

#[cfg(feature = "local-model")]
pub mod bert;

#[cfg(feature = "local-model")]
pub use bert::BertSentimentClassifier;
pub use lexicon::LexiconSentimentClassifier;

/// 分類器が返す生の出力。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSentiment {
    /// 文字列ラベル（例: `"4 stars"`, `"NEGATIVE"`）
    Label(String),
    /// 1〜5の星評価
    Stars(u8),
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// 1件のテキストを分類する。
    async fn classify(&self, text: &str) -> anyhow::Result<RawSentiment>;

    /// ログとサマリに出すバックエンド名。
    fn name(&self) -> &'static str;
}

/// 生の分類結果を [`SentimentLabel`] へ写像する規則。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentPolicy {
    /// 1〜5の星: 1-2 Negative, 3 Neutral, 4-5 Positive
    FiveStar,
    /// 3クラスのラベルをそのまま採用する
    ThreeClass,
}

impl SentimentPolicy {
    /// # Errors
    /// 出力がポリシーの想定外なら [`CapabilityError::PolicyMismatch`]。
    pub fn map(self, raw: &RawSentiment) -> Result<SentimentLabel, CapabilityError> {
        match self {
            SentimentPolicy::FiveStar => {
                let stars = match raw {
                    RawSentiment::Stars(stars) => Some(*stars),
                    RawSentiment::Label(label) => parse_star_label(label),
                };
                match stars {
                    Some(1 | 2) => Ok(SentimentLabel::Negative),
                    Some(3) => Ok(SentimentLabel::Neutral),
                    Some(4 | 5) => Ok(SentimentLabel::Positive),
                    _ => Err(CapabilityError::PolicyMismatch(describe(raw))),
                }
            }
            SentimentPolicy::ThreeClass => match raw {
                RawSentiment::Label(label) => parse_class_label(label)
                    .ok_or_else(|| CapabilityError::PolicyMismatch(describe(raw))),
                RawSentiment::Stars(_) => Err(CapabilityError::PolicyMismatch(describe(raw))),
            },
        }
    }
}

/// `"4 stars"`, `"1 star"`, `"5"` のような星ラベルを読む。
fn parse_star_label(label: &str) -> Option<u8> {
    let mut parts = label.split_whitespace();
    let stars = parts.next()?.parse::<u8>().ok()?;
    match parts.next() {
        None => Some(stars),
        Some(unit) if unit.eq_ignore_ascii_case("star") || unit.eq_ignore_ascii_case("stars") => {
            Some(stars)
        }
        Some(_) => None,
    }
}

fn parse_class_label(label: &str) -> Option<SentimentLabel> {
    match label.trim().to_lowercase().as_str() {
        "pos" => Some(SentimentLabel::Positive),
        "neu" => Some(SentimentLabel::Neutral),
        "neg" => Some(SentimentLabel::Negative),
        other => other.parse().ok(),
    }
}

fn describe(raw: &RawSentiment) -> String {
    match raw {
        RawSentiment::Label(label) => format!("label {label:?}"),
        RawSentiment::Stars(stars) => format!("{stars} stars"),
    }
}
