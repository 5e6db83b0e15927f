/// トピックサービス `/fit` レスポンスの JSON Schema。
use std::sync::LazyLock;

use serde_json::{Value, json};

pub(crate) static FIT_RESPONSE_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://review-insight.dev/schemas/topic/fit-response.json",
        "title": "Topic Fit Response",
        "type": "object",
        "properties": {
            "assignments": {
                "type": "array",
                "description": "Topic id per input document, in input order",
                "items": { "type": "integer", "minimum": -1 }
            },
            "topics": {
                "type": "array",
                "items": { "$ref": "#/$defs/topic" }
            }
        },
        "required": ["assignments", "topics"],
        "$defs": {
            "topic": {
                "type": "object",
                "properties": {
                    "id": { "type": "integer", "minimum": -1 },
                    "count": { "type": "integer", "minimum": 0 },
                    "name": { "type": "string" }
                },
                "required": ["id", "count", "name"]
            }
        }
    })
});
