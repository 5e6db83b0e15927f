/// 感情分類サービスのレスポンス JSON Schema。
///
/// Hugging Face 推論 API 互換の `[{label, score}]` と、バッチ形式の
/// `[[{label, score}, ...]]` の両方を受け付ける。
use std::sync::LazyLock;

use serde_json::{Value, json};

pub(crate) static PREDICTION_RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://review-insight.dev/schemas/sentiment/prediction-response.json",
        "title": "Sentiment Prediction Response",
        "oneOf": [
            { "$ref": "#/$defs/predictions" },
            {
                "type": "array",
                "minItems": 1,
                "items": { "$ref": "#/$defs/predictions" }
            }
        ],
        "$defs": {
            "predictions": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "score": { "type": "number" }
                    },
                    "required": ["label"]
                }
            }
        }
    })
});
