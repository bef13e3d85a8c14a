//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。レスポンスは `{"error": "..."}` 形式のJSON。

use axum::http::StatusCode;
use axum::Json;
use xeroq_core::LifecycleError;
use xeroq_types::ErrorResponse;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// 不正なリクエスト（ファイル未指定、非対応形式、サイズ超過、OTP未指定等）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),
    /// ジョブが存在しない、または期限切れ
    #[error("{0}")]
    NotFound(String),
    /// ストレージ操作に失敗
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<LifecycleError> for GatewayError {
    fn from(e: LifecycleError) -> Self {
        if e.is_validation() {
            return GatewayError::BadRequest(e.to_string());
        }
        match e {
            LifecycleError::Upstream(inner) => GatewayError::Storage(inner.to_string()),
            other @ LifecycleError::NotFound => GatewayError::NotFound(other.to_string()),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Storage(_) | GatewayError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "リクエスト処理に失敗");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
