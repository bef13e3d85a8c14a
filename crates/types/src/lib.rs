//! # XeroQ 共有型定義
//!
//! 印刷ジョブのデータモデルとHTTP APIのリクエスト/レスポンス構造体を提供する。
//!
//! ## シリアライズ規則
//! - 永続化レコード（`PrintJob`）: snake_caseのカラム名（`otp`, `file_path`, `upload_time` 等）
//! - HTTP API（`LookupResponse` 等）: camelCase
//! - 日時: RFC 3339（UTC）

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// OTP（ジョブ参照コード）
// ---------------------------------------------------------------------------

/// OTPに使用する36文字のアルファベット（A–Z, 0–9）
pub const OTP_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// OTPの文字数
pub const OTP_LEN: usize = 6;

/// 印刷ジョブを参照する6文字のコード。
///
/// 暗号学的なワンタイムパスワードではなく、アップロード者と印刷所の間で
/// 共有する短い参照キー。値は常に `[A-Z0-9]{6}` を満たす。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Otp(String);

impl Otp {
    /// 各文字をアルファベットから独立・一様に選んでコードを生成する。
    /// 一意性は保証しない（レコードストアの挿入時に判定される）。
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let code = (0..OTP_LEN)
            .map(|_| OTP_ALPHABET[rng.gen_range(0..OTP_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// ユーザー入力をOTPとして解釈する。
    ///
    /// 前後の空白を除去し大文字化した上で `[A-Z0-9]{6}` に一致する場合のみ `Some`。
    pub fn parse(input: &str) -> Option<Self> {
        let code = input.trim().to_ascii_uppercase();
        let valid = code.len() == OTP_LEN && code.bytes().all(|b| OTP_ALPHABET.contains(&b));
        valid.then_some(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Otp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Otp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Otp::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("不正なOTP形式: {raw:?}")))
    }
}

// ---------------------------------------------------------------------------
// 印刷オプション
// ---------------------------------------------------------------------------

/// カラーモード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// 白黒
    Bw,
    /// カラー
    Color,
}

/// 両面印刷（文書のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duplex {
    Yes,
    No,
}

/// 用紙サイズ（画像のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A2,
    A3,
    A4,
    Letter,
    Legal,
    /// 4×6インチ写真
    #[serde(rename = "4x6")]
    Photo4x6,
    /// 5×7インチ写真
    #[serde(rename = "5x7")]
    Photo5x7,
}

/// 画像の配置方法（画像のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSize {
    /// 用紙に収まるよう縮小
    Fit,
    /// 用紙全体を埋める（はみ出し部分は切り取り）
    Fill,
    /// 原寸
    Actual,
}

/// 印刷オプションの検証エラー
#[derive(Debug, thiserror::Error)]
pub enum PrintOptionsError {
    /// JSONとして解釈できない、または未知のフィールド・値を含む
    #[error("印刷オプションの形式が不正です: {0}")]
    Malformed(String),
    /// 部数が正の整数ではない
    #[error("部数は正の整数である必要があります: {0:?}")]
    InvalidCopies(String),
}

/// アップロード時に指定される印刷オプション。
///
/// 未指定の任意フィールドはシリアライズ時にも省略されるため、
/// 検索結果では送信されたオプションがそのまま返る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrintOptions {
    pub color_mode: ColorMode,
    /// 部数（正の整数の文字列表現）
    pub copies: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplex: Option<Duplex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_size: Option<PaperSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
}

impl PrintOptions {
    /// multipartの `printOptions` フィールド（JSON文字列）を解釈し検証する。
    pub fn from_json(raw: &str) -> Result<Self, PrintOptionsError> {
        let options: PrintOptions =
            serde_json::from_str(raw).map_err(|e| PrintOptionsError::Malformed(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// 型で表現できない制約（部数）を検証する。
    pub fn validate(&self) -> Result<(), PrintOptionsError> {
        match self.copies() {
            Some(_) => Ok(()),
            None => Err(PrintOptionsError::InvalidCopies(self.copies.clone())),
        }
    }

    /// 部数を数値として返す。正の整数でない場合は `None`。
    pub fn copies(&self) -> Option<u32> {
        self.copies.parse::<u32>().ok().filter(|n| *n > 0)
    }
}

// ---------------------------------------------------------------------------
// 印刷ジョブ
// ---------------------------------------------------------------------------

/// ジョブの状態。`Pending` → `Completed` の一方向にのみ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
}

/// 印刷ジョブのレコード。1ジョブにつき1レコードと1ブロブ。
///
/// フィールド名は永続化先テーブル `print_jobs` のカラム名に合わせる。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    /// 主キー
    pub otp: Otp,
    /// アップロードされた元のファイル名（表示用）
    pub filename: String,
    /// オブジェクトストア上のキー
    #[serde(rename = "file_path")]
    pub content_ref: String,
    /// MIMEタイプ
    #[serde(rename = "file_type")]
    pub content_type: String,
    pub print_options: PrintOptions,
    /// アップロード日時
    #[serde(rename = "upload_time")]
    pub created_at: DateTime<Utc>,
    /// 有効期限。作成時に一度だけ計算され、以後再計算されない。
    pub expires_at: DateTime<Utc>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// レコードへの部分更新。
///
/// 構築手段は [`JobUpdate::completed`] のみで、`Completed` から `Pending` に
/// 戻す更新は表現できない。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobUpdate {
    status: JobStatus,
    completed_at: DateTime<Utc>,
}

impl JobUpdate {
    /// 完了済みへの遷移。既に完了済みのジョブでは `completed_at` を更新する。
    pub fn completed(at: DateTime<Utc>) -> Self {
        Self {
            status: JobStatus::Completed,
            completed_at: at,
        }
    }

    /// 更新内容をレコードに適用する。
    pub fn apply_to(&self, job: &mut PrintJob) {
        job.status = self.status;
        job.completed_at = Some(self.completed_at);
    }
}

/// ジョブ件数の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub total: u64,
    pub pending: u64,
    pub completed: u64,
}

impl JobStats {
    /// 状態の一覧から集計する。
    pub fn from_statuses<I: IntoIterator<Item = JobStatus>>(statuses: I) -> Self {
        statuses.into_iter().fold(Self::default(), |mut stats, status| {
            stats.total += 1;
            match status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Completed => stats.completed += 1,
            }
            stats
        })
    }
}

// ---------------------------------------------------------------------------
// HTTP API 構造体
// ---------------------------------------------------------------------------

/// POST /upload レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub otp: Otp,
    pub message: String,
}

/// GET /admin/lookup, GET /admin/download のクエリパラメータ
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtpQuery {
    #[serde(default)]
    pub otp: Option<String>,
}

/// GET /admin/lookup レスポンス。ファイル本体は含まず、ダウンロード先のみを返す。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub otp: Otp,
    pub filename: String,
    pub print_options: PrintOptions,
    pub upload_time: DateTime<Utc>,
    pub status: JobStatus,
    pub file_url: String,
}

/// POST /admin/complete リクエスト
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteRequest {
    #[serde(default)]
    pub otp: Option<String>,
}

/// POST /admin/complete レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteResponse {
    pub success: bool,
    pub message: String,
}

/// 全エンドポイント共通のエラーレスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// GET /health レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "healthy" または "unhealthy"
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_jobs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
