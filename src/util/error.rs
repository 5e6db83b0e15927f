/// エラー分類とリトライ判定ユーティリティ。
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// 外部ケイパビリティ（感情分類器・トピックモデル）呼び出しのエラー。
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability call timed out after {0:?}")]
    Timeout(Duration),
    #[error("transient capability failure: {0}")]
    Transient(String),
    #[error("capability rejected input: {0}")]
    Rejected(String),
    #[error("classifier output does not fit the labeling policy: {0}")]
    PolicyMismatch(String),
}

/// エラーの種類。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// リトライ可能なエラー（タイムアウト、接続失敗、5xx、429）
    Retryable,
    /// リトライ不可能なエラー（入力拒否、ラベル不一致など）
    NonRetryable,
    /// 致命的なエラー（認証エラー）
    Fatal,
}

/// エラーがリトライ可能かどうかを判定する。
#[must_use]
pub(crate) fn classify_error(error: &anyhow::Error) -> ErrorKind {
    if let Some(capability_err) = error.downcast_ref::<CapabilityError>() {
        return match capability_err {
            CapabilityError::Timeout(_) | CapabilityError::Transient(_) => ErrorKind::Retryable,
            CapabilityError::Rejected(_) | CapabilityError::PolicyMismatch(_) => {
                ErrorKind::NonRetryable
            }
        };
    }

    if let Some(reqwest_err) = error.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() || reqwest_err.is_connect() {
            return ErrorKind::Retryable;
        }

        if let Some(status) = reqwest_err.status() {
            return classify_status(status);
        }
    }

    // デフォルトはリトライ不可能
    ErrorKind::NonRetryable
}

/// HTTPステータスコードを分類する。
#[must_use]
pub(crate) fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::Fatal,
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::Retryable,
        status if status.is_server_error() => ErrorKind::Retryable,
        _ => ErrorKind::NonRetryable,
    }
}

/// エラーがリトライ可能かどうかを判定する。
#[must_use]
pub(crate) fn is_retryable(error: &anyhow::Error) -> bool {
    matches!(classify_error(error), ErrorKind::Retryable)
}

/// ステータスコードから外部ケイパビリティのエラーを組み立てる。
#[must_use]
pub(crate) fn status_error(status: StatusCode, body: &str) -> CapabilityError {
    let message = format!("status {status}: {}", truncate_error_message(body));
    match classify_status(status) {
        ErrorKind::Retryable => CapabilityError::Transient(message),
        ErrorKind::NonRetryable | ErrorKind::Fatal => CapabilityError::Rejected(message),
    }
}

const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// エラーレスポンス本文をログ向けに切り詰める。
#[must_use]
pub(crate) fn truncate_error_message(body: &str) -> String {
    let truncated = super::text::truncate_chars(body, MAX_ERROR_MESSAGE_CHARS);
    if truncated.len() < body.len() {
        format!("{truncated}... (truncated)")
    } else {
        truncated.to_string()
    }
}
