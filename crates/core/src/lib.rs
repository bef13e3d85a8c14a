//! # XeroQ Core
//!
//! OTPをキーとする印刷ジョブのライフサイクルを実装する。
//!
//! ## 処理フロー
//! 1. アップロード: 種別・サイズ・印刷オプションを検証し、OTPを生成してブロブとレコードを保存する
//! 2. 検索・ダウンロード: レコードを取得し、期限切れであればブロブと共に削除して「存在しない」と扱う
//! 3. 完了: ステータスを `completed` に遷移させる
//!
//! レコードストアとブロブストアはトレイトで抽象化され、`LifecycleService` に注入される。
//! プロセス全体で共有される可変状態は持たない。

pub mod clock;
pub mod content;
pub mod error;
pub mod expiry;
pub mod lifecycle;
pub mod memory;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{ContentPolicy, FileKind};
pub use error::{LifecycleError, StoreError};
pub use expiry::{is_expired, RetentionPolicy};
pub use lifecycle::{DownloadedFile, LifecycleService, NewUpload, SweepReport};
pub use memory::{MemoryBlobStore, MemoryJobStore};
pub use store::{BlobStore, JobStore};
