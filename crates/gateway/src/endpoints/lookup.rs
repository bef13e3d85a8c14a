//! # GET /admin/lookup
//!
//! OTPに対応するジョブのメタデータを返す。ファイル本体はダウンロードURLで取得する。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use xeroq_types::{LookupResponse, OtpQuery};

use super::{parse_otp, DOWNLOAD_PATH};
use crate::config::GatewayState;
use crate::error::GatewayError;

pub async fn handle_lookup(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<OtpQuery>,
) -> Result<Json<LookupResponse>, GatewayError> {
    let otp = parse_otp(query.otp.as_deref())?;
    let job = state.lifecycle.lookup(&otp).await?;

    Ok(Json(LookupResponse {
        file_url: format!("{DOWNLOAD_PATH}?otp={}", job.otp),
        otp: job.otp,
        filename: job.filename,
        print_options: job.print_options,
        upload_time: job.created_at,
        status: job.status,
    }))
}
