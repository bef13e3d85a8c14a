//! # XeroQ CLI
//!
//! 運用者向けのコマンドラインツール。
//!
//! - `sweep` — 期限切れジョブのレコードとファイルを削除する（cron等の外部スケジューラから実行）
//! - `stats` — 状態ごとのジョブ件数をJSONで出力する
//!
//! 接続先はGatewayと同じ環境変数で指定し、各値はフラグで上書きできる。

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xeroq_core::{BlobStore, JobStore, LifecycleService, MemoryBlobStore, MemoryJobStore};
use xeroq_gateway::config::StorageBackend;
use xeroq_gateway::storage::{PostgrestJobStore, S3BlobStore};

#[derive(Debug, Parser)]
#[command(name = "xeroq-cli", version, about = "XeroQ 運用CLI")]
struct Cli {
    #[command(flatten)]
    storage: StorageArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 期限切れジョブを削除する
    Sweep,
    /// 状態ごとのジョブ件数を表示する
    Stats,
}

/// ストレージ接続設定
#[derive(Debug, Args)]
struct StorageArgs {
    /// ストレージバックエンド（supabase / memory）
    #[arg(long, env = "STORAGE_BACKEND", default_value = "supabase")]
    backend: StorageBackend,

    /// SupabaseプロジェクトのURL
    #[arg(long, env = "SUPABASE_URL")]
    supabase_url: Option<String>,

    /// Supabaseのservice roleキー
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    service_role_key: Option<String>,

    /// ジョブテーブル名
    #[arg(long, env = "JOBS_TABLE", default_value = "print_jobs")]
    jobs_table: String,

    /// S3互換エンドポイント
    #[arg(long, env = "S3_ENDPOINT", default_value = "http://localhost:9000")]
    s3_endpoint: String,

    #[arg(
        long,
        env = "S3_ACCESS_KEY",
        default_value = "minioadmin",
        hide_env_values = true
    )]
    s3_access_key: String,

    #[arg(
        long,
        env = "S3_SECRET_KEY",
        default_value = "minioadmin",
        hide_env_values = true
    )]
    s3_secret_key: String,

    /// ファイルを保存するバケット
    #[arg(long, env = "S3_BUCKET", default_value = "print-files")]
    s3_bucket: String,

    /// リージョン（省略時はエンドポイントから決定）
    #[arg(long, env = "S3_REGION")]
    s3_region: Option<String>,
}

impl StorageArgs {
    fn build_stores(&self) -> anyhow::Result<(Arc<dyn JobStore>, Arc<dyn BlobStore>)> {
        match self.backend {
            StorageBackend::Memory => {
                tracing::warn!("メモリストアが選択されました（対象ジョブは常に0件です）");
                Ok((
                    Arc::new(MemoryJobStore::new()),
                    Arc::new(MemoryBlobStore::new()),
                ))
            }
            StorageBackend::Supabase => {
                let url = self
                    .supabase_url
                    .as_deref()
                    .context("SUPABASE_URL（--supabase-url）が設定されていません")?;
                let key = self.service_role_key.clone().context(
                    "SUPABASE_SERVICE_ROLE_KEY（--service-role-key）が設定されていません",
                )?;
                let jobs =
                    PostgrestJobStore::new(reqwest::Client::new(), url, &self.jobs_table, key);
                let blobs = S3BlobStore::connect(
                    &self.s3_endpoint,
                    self.s3_region.clone(),
                    &self.s3_access_key,
                    &self.s3_secret_key,
                    &self.s3_bucket,
                )?;
                Ok((Arc::new(jobs), Arc::new(blobs)))
            }
        }
    }
}

/// サブコマンドを実行し、標準出力に書く内容を返す。
async fn execute(command: &Command, lifecycle: &LifecycleService) -> anyhow::Result<String> {
    match command {
        Command::Sweep => {
            let report = lifecycle.sweep_expired().await?;
            let summary = format!(
                "期限切れ: {}件, 削除: {}件, レコード削除失敗: {}件, ファイル削除失敗: {}件",
                report.expired, report.removed, report.record_failures, report.blob_failures
            );
            if report.record_failures > 0 || report.blob_failures > 0 {
                anyhow::bail!("一部の削除に失敗しました（{summary}）");
            }
            Ok(summary)
        }
        Command::Stats => {
            let stats = lifecycle.stats().await?;
            Ok(serde_json::to_string_pretty(&stats)?)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (jobs, blobs) = cli.storage.build_stores()?;
    let lifecycle = LifecycleService::new(jobs, blobs);

    let output = execute(&cli.command, &lifecycle).await?;
    println!("{output}");

    Ok(())
}
