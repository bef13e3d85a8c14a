//! # Core エラー型
//!
//! ストア層のエラーとライフサイクル操作のエラー。
//! HTTPステータスへの対応付けはGateway側で行う。

/// レコードストア・ブロブストアのエラー。
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 一意制約違反（同じOTPのレコードが既に存在する等）
    #[error("キーが重複しています: {0}")]
    Conflict(String),
    /// 通信失敗・バックエンドのエラー応答
    #[error("ストレージバックエンドのエラー: {0}")]
    Backend(String),
}

/// ライフサイクル操作のエラー。
///
/// 期限切れのジョブと存在しないジョブは区別せず、どちらも `NotFound` になる。
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// 許可されていないMIMEタイプ
    #[error("対応していないファイル形式です: {0}（PDF, DOCX, 画像のみ）")]
    UnsupportedType(String),
    /// 種別ごとのサイズ上限を超過
    #[error("ファイルサイズが上限を超えています: {size} bytes (上限: {limit} bytes)")]
    TooLarge {
        /// 受信したサイズ
        size: u64,
        /// 適用された上限
        limit: u64,
    },
    /// ファイル未指定、OTP未指定、印刷オプション不正等
    #[error("{0}")]
    InvalidRequest(String),
    /// ジョブが存在しない、または期限切れ
    #[error("印刷ジョブが見つからないか、期限切れです")]
    NotFound,
    /// ストア操作の失敗
    #[error("ストレージ操作に失敗: {0}")]
    Upstream(#[from] StoreError),
}

impl LifecycleError {
    /// 入力検証エラー（HTTP 400相当）かどうか
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LifecycleError::UnsupportedType(_)
                | LifecycleError::TooLarge { .. }
                | LifecycleError::InvalidRequest(_)
        )
    }
}
