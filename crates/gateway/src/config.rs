//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。

use std::str::FromStr;

use xeroq_core::{ContentPolicy, LifecycleService, RetentionPolicy};

/// CORS許可オリジンのデフォルト（フロントエンドの開発サーバー）
const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

/// Gatewayの共有状態。
pub struct GatewayState {
    /// ジョブのライフサイクル操作（ストアは注入済み）
    pub lifecycle: LifecycleService,
}

/// ストレージバックエンドの選択
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgREST互換DB（Supabase）+ S3互換オブジェクトストレージ
    Supabase,
    /// プロセス内メモリ（開発用。再起動で消える）
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(StorageBackend::Supabase),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!(
                "不明なストレージバックエンド: {other}（supabase / memory）"
            )),
        }
    }
}

/// Gatewayの起動設定
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// リッスンアドレス
    pub bind_addr: String,
    pub storage_backend: StorageBackend,
    /// 種別ごとのファイルサイズ上限
    pub content_policy: ContentPolicy,
    /// ジョブの保持期間
    pub retention: RetentionPolicy,
    /// CORS許可オリジン
    pub cors_origins: Vec<String>,
}

impl GatewayConfig {
    /// 環境変数から構築する。
    ///
    /// - `BIND_ADDR`（デフォルト `0.0.0.0:3000`）
    /// - `STORAGE_BACKEND`（`supabase` / `memory`、デフォルト `supabase`）
    /// - `MAX_FILE_SIZE_DOCUMENTS` / `MAX_FILE_SIZE_IMAGES`（バイト）
    /// - `JOB_RETENTION_SECS`（デフォルト3600）
    /// - `CORS_ORIGINS`（カンマ区切り）
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let storage_backend = match std::env::var("STORAGE_BACKEND") {
            Ok(raw) => raw.parse::<StorageBackend>().map_err(anyhow::Error::msg)?,
            Err(_) => StorageBackend::Supabase,
        };

        let content_policy = ContentPolicy::new(
            env_u64(
                "MAX_FILE_SIZE_DOCUMENTS",
                ContentPolicy::DEFAULT_MAX_DOCUMENT_BYTES,
            )?,
            env_u64("MAX_FILE_SIZE_IMAGES", ContentPolicy::DEFAULT_MAX_IMAGE_BYTES)?,
        );

        let retention_secs = env_u64("JOB_RETENTION_SECS", RetentionPolicy::DEFAULT_WINDOW_SECS)?;
        let retention = RetentionPolicy::from_secs(retention_secs).ok_or_else(|| {
            anyhow::anyhow!("JOB_RETENTION_SECSが範囲外です: {retention_secs}")
        })?;

        let cors_origins = std::env::var("CORS_ORIGINS")
            .ok()
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect());

        Ok(Self {
            bind_addr,
            storage_backend,
            content_policy,
            retention,
            cors_origins,
        })
    }
}

/// 数値の環境変数を読む。未設定ならデフォルト値。
fn env_u64(name: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("{name}は正の整数である必要があります: {raw:?} ({e})")),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
