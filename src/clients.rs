pub mod sentiment;
pub mod topic;

pub use sentiment::{HttpSentimentClassifier, HttpSentimentConfig};
pub use topic::{HttpTopicConfig, HttpTopicModel};

/// `Authorization` の値を組み立てる際のトークン接頭辞。
const BEARER: &str = "Bearer";

/// バリデーションエラーのリストを1行に要約する。
fn summarize_validation_errors(errors: &[String]) -> String {
    errors
        .iter()
        .take(5)
        .map(|e| crate::util::error::truncate_error_message(e))
        .collect::<Vec<_>>()
        .join("; ")
}
