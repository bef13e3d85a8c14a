//! # ストレージバックエンド
//!
//! 運用者が選択可能なレコードストア・ブロブストアの実装。
//! - `postgrest`: PostgREST互換API（Supabase等）によるレコードストア
//! - `s3`: S3互換APIによるブロブストア（`vendor-aws` feature）
//! - メモリ: `xeroq_core::memory`（開発用）

pub mod postgrest;
#[cfg(feature = "vendor-aws")]
pub mod s3;

use std::sync::Arc;

use xeroq_core::{BlobStore, JobStore, MemoryBlobStore, MemoryJobStore};

pub use self::postgrest::PostgrestJobStore;
#[cfg(feature = "vendor-aws")]
pub use self::s3::S3BlobStore;

use crate::config::StorageBackend;

/// 選択されたバックエンドのストアを環境変数から構築する。
pub fn build_stores(
    backend: StorageBackend,
) -> anyhow::Result<(Arc<dyn JobStore>, Arc<dyn BlobStore>)> {
    match backend {
        StorageBackend::Memory => {
            tracing::warn!("メモリストアで起動します（再起動でジョブは失われます）");
            Ok((
                Arc::new(MemoryJobStore::new()),
                Arc::new(MemoryBlobStore::new()),
            ))
        }
        StorageBackend::Supabase => {
            let jobs = PostgrestJobStore::from_env()?;
            let blobs = supabase_blob_store()?;
            Ok((Arc::new(jobs), blobs))
        }
    }
}

#[cfg(feature = "vendor-aws")]
fn supabase_blob_store() -> anyhow::Result<Arc<dyn BlobStore>> {
    Ok(Arc::new(S3BlobStore::from_env()?))
}

#[cfg(not(feature = "vendor-aws"))]
fn supabase_blob_store() -> anyhow::Result<Arc<dyn BlobStore>> {
    anyhow::bail!("S3互換ブロブストアは vendor-aws feature が無効のため利用できません")
}
