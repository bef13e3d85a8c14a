//! # 有効期限ポリシー
//!
//! ジョブは作成時刻 + 保持期間を過ぎると期限切れとなる。
//! 判定は読み取り時（検索・ダウンロード）にのみ行い、能動的な削除は行わない。

use chrono::{DateTime, Duration, Utc};
use xeroq_types::PrintJob;

/// `now` が有効期限を過ぎているか。期限ちょうどの時刻はまだ有効。
pub fn is_expired(job: &PrintJob, now: DateTime<Utc>) -> bool {
    now > job.expires_at
}

/// 保持期間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    window: Duration,
}

impl RetentionPolicy {
    /// デフォルトの保持期間（1時間）
    pub const DEFAULT_WINDOW_SECS: u64 = 60 * 60;

    /// 保持期間を秒数で指定する。`i64` に収まらない値や0は `None`。
    pub fn from_secs(secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs).ok().filter(|s| *s > 0)?;
        Duration::try_seconds(secs).map(|window| Self { window })
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 作成時刻から有効期限を求める。
    pub fn expires_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.window
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(1),
        }
    }
}
