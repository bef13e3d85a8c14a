//! # POST /upload
//!
//! multipartで受け取ったファイルと印刷オプションを登録し、OTPを発行する。
//!
//! - `file`: ファイル本体（パートの `Content-Type` で種別を判定）
//! - `printOptions`: 印刷オプションのJSON文字列

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::Json;
use xeroq_core::{ContentPolicy, LifecycleError, NewUpload};
use xeroq_types::{PrintOptions, UploadResponse};

use crate::config::GatewayState;
use crate::error::GatewayError;

/// ファイル名が送られなかった場合の表示名
const FALLBACK_FILENAME: &str = "upload";

/// 受信済みのファイルパート
struct ReceivedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// POST /upload — ファイル登録。
///
/// ファイルパートはチャンク単位で読み込み、種別ごとの上限を超えた時点で拒否する。
pub async fn handle_upload(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, GatewayError> {
    let policy = state.lifecycle.content_policy();
    let mut file: Option<ReceivedFile> = None;
    let mut raw_options: Option<String> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(FALLBACK_FILENAME)
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();

                let kind = ContentPolicy::classify(&content_type)
                    .ok_or_else(|| LifecycleError::UnsupportedType(content_type.clone()))?;
                let limit = policy.max_bytes(kind);

                let mut bytes = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                    let size = (bytes.len() + chunk.len()) as u64;
                    if size > limit {
                        return Err(LifecycleError::TooLarge { size, limit }.into());
                    }
                    bytes.extend_from_slice(&chunk);
                }

                file = Some(ReceivedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            "printOptions" => {
                raw_options = Some(field.text().await.map_err(multipart_error)?);
            }
            other => {
                tracing::debug!(field = %other, "未知のmultipartフィールドを無視");
            }
        }
    }

    let file =
        file.ok_or_else(|| GatewayError::BadRequest("ファイルが指定されていません".to_string()))?;
    let raw_options = raw_options
        .ok_or_else(|| GatewayError::BadRequest("印刷オプションが指定されていません".to_string()))?;
    let print_options = PrintOptions::from_json(&raw_options)
        .map_err(|e| GatewayError::BadRequest(e.to_string()))?;

    let otp = state
        .lifecycle
        .create(NewUpload {
            filename: file.filename,
            content_type: file.content_type,
            bytes: file.bytes,
            print_options,
        })
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        otp,
        message: "ファイルのアップロードに成功しました".to_string(),
    }))
}

fn multipart_error(e: MultipartError) -> GatewayError {
    GatewayError::BadRequest(format!("multipartの読み込みに失敗: {}", e.body_text()))
}
