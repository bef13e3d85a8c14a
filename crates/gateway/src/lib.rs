//! # XeroQ Gateway
//!
//! 印刷ファイルの受付と印刷所向けAPIを提供するHTTPサーバー。
//!
//! ## 役割
//! - アップロードの受付（形式・サイズ・印刷オプションの検証）とOTP発行
//! - OTPによるジョブ検索・ファイル取得・完了記録
//! - レコードストアの死活監視
//!
//! ## API エンドポイント
//! - `POST /upload` — ファイル登録
//! - `GET /admin/lookup` — ジョブ情報の取得
//! - `GET /admin/download` — ファイル本体の取得
//! - `POST /admin/complete` — 印刷完了の記録
//! - `GET /health` — ヘルスチェック

pub mod config;
pub mod endpoints;
pub mod error;
pub mod storage;


use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::GatewayState;
use crate::endpoints::*;

/// multipartの境界・ヘッダ・印刷オプション分の余裕
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Gatewayのルーターを構築する。
///
/// リクエストボディの上限は最大のファイルサイズ上限にmultipartの余裕を加えた値。
pub fn build_router(
    state: Arc<GatewayState>,
    cors_origins: &[String],
) -> anyhow::Result<axum::Router> {
    let origins = cors_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|e| anyhow::anyhow!("CORSオリジンが不正です: {origin:?} ({e})"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = state
        .lifecycle
        .content_policy()
        .max_upload_bytes()
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Ok(axum::Router::new()
        .route(UPLOAD_PATH, post(handle_upload))
        .route(LOOKUP_PATH, get(handle_lookup))
        .route(DOWNLOAD_PATH, get(handle_download))
        .route(COMPLETE_PATH, post(handle_complete))
        .route(HEALTH_PATH, get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
