//! # 印刷ジョブのライフサイクル
//!
//! 登録（Create）・検索（Lookup）・ダウンロード（Download）・完了（Complete）と、
//! 外部スケジューラから呼ばれる期限切れジョブの一括削除（sweep）。
//!
//! ## 状態遷移
//! - 登録直後は `pending`
//! - `pending` →（Complete）→ `completed`
//! - `pending` / `completed` →（読み取り時に期限切れを検出、またはsweep）→ 削除
//!
//! レコード削除とブロブ削除は独立した2回の呼び出しであり、原子性はない。
//! 期限切れ時の削除失敗はログに記録して呼び出し元には返さない。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use xeroq_types::{JobStats, JobStatus, JobUpdate, Otp, PrintJob, PrintOptions};

use crate::clock::{Clock, SystemClock};
use crate::content::{self, ContentPolicy};
use crate::error::{LifecycleError, StoreError};
use crate::expiry::{is_expired, RetentionPolicy};
use crate::store::{BlobStore, JobStore};


/// アップロードされたファイルと印刷オプション
#[derive(Debug, Clone)]
pub struct NewUpload {
    /// 元のファイル名
    pub filename: String,
    /// クライアントが申告したMIMEタイプ
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub print_options: PrintOptions,
}

/// ダウンロード結果。レスポンスヘッダ用にレコードも返す。
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub job: PrintJob,
    pub bytes: Vec<u8>,
}

/// 期限切れジョブ一括削除の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// 期限切れとして検出されたジョブ数
    pub expired: usize,
    /// レコードを削除できたジョブ数
    pub removed: usize,
    /// ブロブ削除に失敗した数
    pub blob_failures: usize,
    /// レコード削除に失敗した数
    pub record_failures: usize,
}

/// ライフサイクル操作の窓口。ストアは外部から注入する。
pub struct LifecycleService {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
    content_policy: ContentPolicy,
    retention: RetentionPolicy,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    /// デフォルトのポリシー（文書10 MiB・画像15 MiB、保持1時間）とシステム時計で構築する。
    pub fn new(jobs: Arc<dyn JobStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            jobs,
            blobs,
            content_policy: ContentPolicy::default(),
            retention: RetentionPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_content_policy(mut self, content_policy: ContentPolicy) -> Self {
        self.content_policy = content_policy;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn content_policy(&self) -> &ContentPolicy {
        &self.content_policy
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// ジョブを登録し、OTPを返す。
    ///
    /// 種別→サイズ→印刷オプションの順に検証し、ブロブを書き込んでからレコードを挿入する。
    /// 挿入に失敗した場合は書き込んだブロブを削除する。OTPの衝突時も再試行しない。
    pub async fn create(&self, upload: NewUpload) -> Result<Otp, LifecycleError> {
        let size = upload.bytes.len() as u64;
        self.content_policy.check(&upload.content_type, size)?;
        if size == 0 {
            return Err(LifecycleError::InvalidRequest(
                "ファイルが空です".to_string(),
            ));
        }
        upload
            .print_options
            .validate()
            .map_err(|e| LifecycleError::InvalidRequest(e.to_string()))?;

        let otp = Otp::generate(&mut rand::thread_rng());
        let now = self.clock.now();
        let content_ref = content::blob_name(&otp, &upload.filename, now);

        self.blobs
            .upload(&content_ref, &upload.bytes, &upload.content_type)
            .await?;

        let job = PrintJob {
            otp: otp.clone(),
            filename: upload.filename,
            content_ref,
            content_type: upload.content_type,
            print_options: upload.print_options,
            created_at: now,
            expires_at: self.retention.expires_at(now),
            status: JobStatus::Pending,
            completed_at: None,
        };

        if let Err(e) = self.jobs.put(&job).await {
            if matches!(e, StoreError::Conflict(_)) {
                tracing::warn!(otp = %otp, "OTPが既存ジョブと衝突しました（再試行なし）");
            }
            if let Err(cleanup) = self.blobs.delete(&job.content_ref).await {
                tracing::warn!(
                    otp = %otp,
                    content_ref = %job.content_ref,
                    error = %cleanup,
                    "レコード登録失敗後のブロブ削除に失敗"
                );
            }
            return Err(e.into());
        }

        tracing::info!(
            otp = %otp,
            content_type = %job.content_type,
            size,
            expires_at = %job.expires_at,
            "印刷ジョブを登録しました"
        );
        Ok(otp)
    }

    /// ジョブのメタデータを返す。ファイル本体は含まない。
    pub async fn lookup(&self, otp: &Otp) -> Result<PrintJob, LifecycleError> {
        self.live_job(otp).await
    }

    /// ジョブのファイル本体を返す。
    pub async fn download(&self, otp: &Otp) -> Result<DownloadedFile, LifecycleError> {
        let job = self.live_job(otp).await?;
        let bytes = self.blobs.download(&job.content_ref).await?;
        Ok(DownloadedFile { job, bytes })
    }

    /// ジョブを完了済みにし、記録した完了日時を返す。
    ///
    /// 直前の状態は確認しない。完了済みのジョブに対しては完了日時のみ更新される。
    pub async fn complete(&self, otp: &Otp) -> Result<DateTime<Utc>, LifecycleError> {
        if self.jobs.get(otp).await?.is_none() {
            return Err(LifecycleError::NotFound);
        }

        let completed_at = self.clock.now();
        let updated = self
            .jobs
            .update(otp, &JobUpdate::completed(completed_at))
            .await?;
        if !updated {
            // 取得から更新までの間に削除された
            return Err(LifecycleError::NotFound);
        }

        tracing::info!(otp = %otp, "印刷ジョブを完了にしました");
        Ok(completed_at)
    }

    /// 期限切れのジョブをレコード・ブロブともに削除する。
    ///
    /// 個々の削除失敗は集計のみ行い、処理は継続する。
    pub async fn sweep_expired(&self) -> Result<SweepReport, LifecycleError> {
        let now = self.clock.now();
        let expired = self.jobs.list_expired(now).await?;

        let mut report = SweepReport {
            expired: expired.len(),
            ..SweepReport::default()
        };
        for job in &expired {
            let (record_removed, blob_removed) = self.discard(job).await;
            if record_removed {
                report.removed += 1;
            } else {
                report.record_failures += 1;
            }
            if !blob_removed {
                report.blob_failures += 1;
            }
        }

        tracing::info!(
            expired = report.expired,
            removed = report.removed,
            blob_failures = report.blob_failures,
            record_failures = report.record_failures,
            "期限切れジョブの削除が完了"
        );
        Ok(report)
    }

    /// 状態ごとのジョブ件数
    pub async fn stats(&self) -> Result<JobStats, LifecycleError> {
        Ok(self.jobs.stats().await?)
    }

    /// 有効なジョブを取得する。期限切れなら削除して `NotFound` を返す。
    async fn live_job(&self, otp: &Otp) -> Result<PrintJob, LifecycleError> {
        let job = self
            .jobs
            .get(otp)
            .await?
            .ok_or(LifecycleError::NotFound)?;

        if is_expired(&job, self.clock.now()) {
            tracing::info!(otp = %otp, expires_at = %job.expires_at, "期限切れのジョブを削除します");
            self.discard(&job).await;
            return Err(LifecycleError::NotFound);
        }
        Ok(job)
    }

    /// レコードとブロブを削除する。失敗はログに記録し、
    /// それぞれの成否（レコード, ブロブ）を返す。
    async fn discard(&self, job: &PrintJob) -> (bool, bool) {
        let record_removed = match self.jobs.delete(&job.otp).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(otp = %job.otp, error = %e, "期限切れレコードの削除に失敗");
                false
            }
        };
        let blob_removed = match self.blobs.delete(&job.content_ref).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    otp = %job.otp,
                    content_ref = %job.content_ref,
                    error = %e,
                    "期限切れブロブの削除に失敗"
                );
                false
            }
        };
        (record_removed, blob_removed)
    }
}
