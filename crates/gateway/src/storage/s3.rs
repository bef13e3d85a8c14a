//! # S3互換ブロブストア実装
//!
//! AWS S3, MinIO, Cloudflare R2, Supabase Storage（`/storage/v1/s3`）等の
//! S3互換APIにファイル本体を保存する。

use async_trait::async_trait;
use xeroq_core::{BlobStore, StoreError};

/// S3互換ストレージによるブロブストア実装。
pub struct S3BlobStore {
    bucket: s3::Bucket,
}

impl S3BlobStore {
    pub fn new(bucket: s3::Bucket) -> Self {
        Self { bucket }
    }

    /// S3互換バケットに接続する。`region` が `None` ならエンドポイントから決定する。
    pub fn connect(
        endpoint: &str,
        region: Option<String>,
        access_key: &str,
        secret_key: &str,
        bucket_name: &str,
    ) -> anyhow::Result<Self> {
        let region = resolve_region(endpoint, region);

        tracing::info!(
            s3_endpoint = %endpoint,
            s3_bucket = %bucket_name,
            s3_region = %region,
            "S3互換ブロブストアを設定"
        );

        let bucket = Self::init_bucket(endpoint, region, access_key, secret_key, bucket_name)?;
        Ok(Self::new(bucket))
    }

    /// S3互換バケットを初期化する。
    fn init_bucket(
        endpoint: &str,
        region: String,
        access_key: &str,
        secret_key: &str,
        bucket_name: &str,
    ) -> anyhow::Result<s3::Bucket> {
        let region = s3::Region::Custom {
            region,
            endpoint: endpoint.to_string(),
        };

        let credentials = s3::creds::Credentials::new(
            Some(access_key),
            Some(secret_key),
            None,
            None,
            None,
        )?;

        let bucket = s3::Bucket::new(bucket_name, region, credentials)?.with_path_style();

        Ok(*bucket)
    }

    /// 環境変数から構築する。
    ///
    /// - `S3_ENDPOINT`（デフォルト `http://localhost:9000`）
    /// - `S3_ACCESS_KEY` / `S3_SECRET_KEY`
    /// - `S3_BUCKET`（デフォルト `print-files`）
    /// - `S3_REGION`（任意）
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint = std::env::var("S3_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:9000".to_string());
        let access_key =
            std::env::var("S3_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let secret_key =
            std::env::var("S3_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());
        let bucket_name =
            std::env::var("S3_BUCKET").unwrap_or_else(|_| "print-files".to_string());

        Self::connect(
            &endpoint,
            std::env::var("S3_REGION").ok(),
            &access_key,
            &secret_key,
            &bucket_name,
        )
    }
}

/// リージョンを決定する。明示指定がなければAWS S3エンドポイント
/// （`s3.REGION.amazonaws.com`）から検出し、非AWSエンドポイントでは `us-east-1`。
fn resolve_region(endpoint: &str, explicit: Option<String>) -> String {
    explicit.unwrap_or_else(|| {
        endpoint
            .find("s3.")
            .and_then(|start| {
                let rest = &endpoint[start + 3..];
                rest.find(".amazonaws.com").map(|end| rest[..end].to_string())
            })
            .unwrap_or_else(|| "us-east-1".to_string())
    })
}

fn ensure_success(op: &str, content_ref: &str, status: u16) -> Result<(), StoreError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(StoreError::Backend(format!(
            "{op}が失敗しました: {content_ref} (HTTP {status})"
        )))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(
        &self,
        content_ref: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError> {
        let response = self
            .bucket
            .put_object_with_content_type(content_ref, bytes, content_type)
            .await
            .map_err(|e| StoreError::Backend(format!("オブジェクトのアップロードに失敗: {e}")))?;
        ensure_success("アップロード", content_ref, response.status_code())
    }

    async fn download(&self, content_ref: &str) -> Result<Vec<u8>, StoreError> {
        let response = self
            .bucket
            .get_object(content_ref)
            .await
            .map_err(|e| StoreError::Backend(format!("オブジェクトの取得に失敗: {e}")))?;
        ensure_success("ダウンロード", content_ref, response.status_code())?;
        Ok(response.bytes().to_vec())
    }

    async fn delete(&self, content_ref: &str) -> Result<(), StoreError> {
        let response = self
            .bucket
            .delete_object(content_ref)
            .await
            .map_err(|e| StoreError::Backend(format!("オブジェクトの削除に失敗: {e}")))?;
        // 既に存在しない場合も削除済みとみなす
        if response.status_code() == 404 {
            return Ok(());
        }
        ensure_success("削除", content_ref, response.status_code())
    }
}
