//! # ストアの抽象インターフェース
//!
//! ジョブのメタデータを保持するレコードストアと、ファイル本体を保持する
//! ブロブストア。運用者はPostgREST互換DB・S3互換ストレージ等の実装を選択できる。

use chrono::{DateTime, Utc};
use xeroq_types::{JobStats, JobUpdate, Otp, PrintJob};

use crate::error::StoreError;

/// OTPをキーとする印刷ジョブのレコードストア。
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// レコードを挿入する。同じOTPが既に存在する場合は `StoreError::Conflict`。
    async fn put(&self, job: &PrintJob) -> Result<(), StoreError>;

    /// レコードを取得する。存在しない場合は `Ok(None)`。
    async fn get(&self, otp: &Otp) -> Result<Option<PrintJob>, StoreError>;

    /// 部分更新を適用する。更新対象が存在しなかった場合は `Ok(false)`。
    /// 楽観的排他制御は行わない（後勝ち）。
    async fn update(&self, otp: &Otp, update: &JobUpdate) -> Result<bool, StoreError>;

    /// レコードを削除する。存在しない場合もエラーにしない。
    async fn delete(&self, otp: &Otp) -> Result<(), StoreError>;

    /// `expires_at < now` のレコードを列挙する。
    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<PrintJob>, StoreError>;

    /// 状態ごとの件数を集計する。
    async fn stats(&self) -> Result<JobStats, StoreError>;
}

/// ファイル本体のブロブストア。キーはレコードの `content_ref`。
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(
        &self,
        content_ref: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn download(&self, content_ref: &str) -> Result<Vec<u8>, StoreError>;

    /// ブロブを削除する。存在しない場合もエラーにしない。
    async fn delete(&self, content_ref: &str) -> Result<(), StoreError>;
}
