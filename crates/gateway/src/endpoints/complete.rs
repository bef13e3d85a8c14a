//! # POST /admin/complete
//!
//! 印刷所がジョブの印刷完了を記録する。

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use xeroq_types::{CompleteRequest, CompleteResponse};

use super::parse_otp;
use crate::config::GatewayState;
use crate::error::GatewayError;

/// POST /admin/complete — 完了記録。
///
/// 完了済みのジョブに対しても成功し、完了日時のみ更新される。
pub async fn handle_complete(
    State(state): State<Arc<GatewayState>>,
    payload: Result<Json<CompleteRequest>, JsonRejection>,
) -> Result<Json<CompleteResponse>, GatewayError> {
    let Json(body) = payload.map_err(|e| GatewayError::BadRequest(e.body_text()))?;
    let otp = parse_otp(body.otp.as_deref())?;

    state.lifecycle.complete(&otp).await?;

    Ok(Json(CompleteResponse {
        success: true,
        message: "印刷完了として記録しました".to_string(),
    }))
}
