//! # GET /admin/download
//!
//! ジョブのファイル本体を添付ファイルとして返す。

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use xeroq_types::OtpQuery;

use super::parse_otp;
use crate::config::GatewayState;
use crate::error::GatewayError;

pub async fn handle_download(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<OtpQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let otp = parse_otp(query.otp.as_deref())?;
    let file = state.lifecycle.download(&otp).await?;

    tracing::info!(otp = %otp, size = file.bytes.len(), "ファイルをダウンロード");

    Ok((
        [
            (header::CONTENT_TYPE, file.job.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&file.job.filename),
            ),
        ],
        file.bytes,
    ))
}

/// `Content-Disposition` の値を組み立てる。
///
/// `filename` はASCIIに置換した代替名、`filename*` に元のファイル名（UTF-8）を入れる。
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    let mut encoded = String::with_capacity(filename.len() * 3);
    for byte in filename.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}
