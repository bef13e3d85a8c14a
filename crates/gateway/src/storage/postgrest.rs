//! # PostgRESTレコードストア実装
//!
//! Supabase等のPostgREST互換APIでテーブル `print_jobs` を操作する。
//! `otp` カラムに一意制約がある前提で、重複挿入は HTTP 409 として返る。

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use xeroq_core::{JobStore, StoreError};
use xeroq_types::{JobStats, JobStatus, JobUpdate, Otp, PrintJob};

/// 集計用に `status` カラムのみを取得する行
#[derive(Deserialize)]
struct StatusRow {
    status: JobStatus,
}

/// PostgREST互換APIによるレコードストア実装。
pub struct PostgrestJobStore {
    http: reqwest::Client,
    /// テーブルのエンドポイント（`{url}/rest/v1/{table}`）
    endpoint: String,
    /// service roleキー（`apikey` ヘッダとBearerトークンの両方に使う）
    api_key: String,
}

impl PostgrestJobStore {
    pub fn new(http: reqwest::Client, base_url: &str, table: &str, api_key: String) -> Self {
        Self {
            http,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key,
        }
    }

    /// 環境変数から構築する。
    ///
    /// - `SUPABASE_URL`（未設定なら `NEXT_PUBLIC_SUPABASE_URL`）
    /// - `SUPABASE_SERVICE_ROLE_KEY`
    /// - `JOBS_TABLE`（デフォルト `print_jobs`）
    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = std::env::var("SUPABASE_URL")
            .or_else(|_| std::env::var("NEXT_PUBLIC_SUPABASE_URL"))
            .map_err(|_| anyhow::anyhow!("SUPABASE_URLが設定されていません"))?;
        let api_key = std::env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| anyhow::anyhow!("SUPABASE_SERVICE_ROLE_KEYが設定されていません"))?;
        let table = std::env::var("JOBS_TABLE").unwrap_or_else(|_| "print_jobs".to_string());

        tracing::info!(supabase_url = %base_url, table = %table, "PostgRESTレコードストアを設定");
        Ok(Self::new(reqwest::Client::new(), &base_url, &table, api_key))
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.http
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("HTTP送信失敗: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::CONFLICT {
            return Err(StoreError::Conflict(body));
        }
        Err(StoreError::Backend(format!(
            "PostgRESTがエラーを返しました: HTTP {status} - {body}"
        )))
    }

    async fn fetch_rows<T: for<'de> Deserialize<'de>>(
        &self,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let response = self.send(self.request(Method::GET).query(query)).await?;
        response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("レスポンスのパースに失敗: {e}")))
    }
}

fn otp_filter(otp: &Otp) -> (&'static str, String) {
    ("otp", format!("eq.{otp}"))
}

#[async_trait]
impl JobStore for PostgrestJobStore {
    async fn put(&self, job: &PrintJob) -> Result<(), StoreError> {
        self.send(
            self.request(Method::POST)
                .header("Prefer", "return=minimal")
                .json(job),
        )
        .await?;
        Ok(())
    }

    async fn get(&self, otp: &Otp) -> Result<Option<PrintJob>, StoreError> {
        let rows: Vec<PrintJob> = self
            .fetch_rows(&[otp_filter(otp), ("select", "*".to_string())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update(&self, otp: &Otp, update: &JobUpdate) -> Result<bool, StoreError> {
        let response = self
            .send(
                self.request(Method::PATCH)
                    .query(&[otp_filter(otp)])
                    .header("Prefer", "return=representation")
                    .json(update),
            )
            .await?;
        let rows: Vec<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("レスポンスのパースに失敗: {e}")))?;
        Ok(!rows.is_empty())
    }

    async fn delete(&self, otp: &Otp) -> Result<(), StoreError> {
        self.send(self.request(Method::DELETE).query(&[otp_filter(otp)]))
            .await?;
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<PrintJob>, StoreError> {
        let cutoff = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        self.fetch_rows(&[
            ("expires_at", format!("lt.{cutoff}")),
            ("select", "*".to_string()),
        ])
        .await
    }

    async fn stats(&self) -> Result<JobStats, StoreError> {
        let rows: Vec<StatusRow> = self
            .fetch_rows(&[("select", "status".to_string())])
            .await?;
        Ok(JobStats::from_statuses(rows.into_iter().map(|row| row.status)))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::Json;
    use chrono::Duration;
    use serde_json::Value;
    use xeroq_types::PrintOptions;

    use super::*;

    type Rows = Arc<Mutex<Vec<Value>>>;

    /// `otp=eq.X` / `expires_at=lt.T` フィルタのみを解釈するモック
    fn matches(row: &Value, params: &HashMap<String, String>) -> bool {
        if let Some(otp) = params.get("otp").and_then(|f| f.strip_prefix("eq.")) {
            if row["otp"] != otp {
                return false;
            }
        }
        if let Some(cutoff) = params.get("expires_at").and_then(|f| f.strip_prefix("lt.")) {
            let cutoff = DateTime::parse_from_rfc3339(cutoff).unwrap();
            let expires_at =
                DateTime::parse_from_rfc3339(row["expires_at"].as_str().unwrap()).unwrap();
            if expires_at >= cutoff {
                return false;
            }
        }
        true
    }

    fn check_auth(headers: &HeaderMap) {
        assert_eq!(headers.get("apikey").unwrap(), "service-key");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer service-key");
    }

    /// テスト用のモックPostgRESTサーバーを起動する
    async fn start_mock_postgrest(rows: Rows) -> String {
        async fn select(
            State(rows): State<Rows>,
            headers: HeaderMap,
            Query(params): Query<HashMap<String, String>>,
        ) -> Json<Vec<Value>> {
            check_auth(&headers);
            let rows = rows.lock().unwrap();
            Json(rows.iter().filter(|r| matches(r, &params)).cloned().collect())
        }

        async fn insert(
            State(rows): State<Rows>,
            headers: HeaderMap,
            Json(row): Json<Value>,
        ) -> (AxumStatus, String) {
            check_auth(&headers);
            let mut rows = rows.lock().unwrap();
            if rows.iter().any(|r| r["otp"] == row["otp"]) {
                return (
                    AxumStatus::CONFLICT,
                    r#"{"code":"23505","message":"duplicate key value"}"#.to_string(),
                );
            }
            rows.push(row);
            (AxumStatus::CREATED, String::new())
        }

        async fn patch(
            State(rows): State<Rows>,
            Query(params): Query<HashMap<String, String>>,
            Json(update): Json<Value>,
        ) -> Json<Vec<Value>> {
            let mut rows = rows.lock().unwrap();
            let mut updated = Vec::new();
            for row in rows.iter_mut().filter(|r| matches(r, &params)) {
                for (key, value) in update.as_object().unwrap() {
                    row[key] = value.clone();
                }
                updated.push(row.clone());
            }
            Json(updated)
        }

        async fn remove(
            State(rows): State<Rows>,
            Query(params): Query<HashMap<String, String>>,
        ) -> AxumStatus {
            rows.lock().unwrap().retain(|r| !matches(r, &params));
            AxumStatus::NO_CONTENT
        }

        let app = axum::Router::new()
            .route(
                "/rest/v1/print_jobs",
                axum::routing::get(select)
                    .post(insert)
                    .patch(patch)
                    .delete(remove),
            )
            .with_state(rows);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        format!("http://127.0.0.1:{port}/")
    }

    fn job(otp: &str, expires_at: DateTime<Utc>) -> PrintJob {
        PrintJob {
            otp: Otp::parse(otp).unwrap(),
            filename: "flyer.png".to_string(),
            content_ref: format!("{otp}_1700000000000.png"),
            content_type: "image/png".to_string(),
            print_options: PrintOptions::from_json(
                r#"{"colorMode":"color","copies":"3","paperSize":"a4","imageSize":"fit"}"#,
            )
            .unwrap(),
            created_at: expires_at - Duration::hours(1),
            expires_at,
            status: JobStatus::Pending,
            completed_at: None,
        }
    }

    async fn store() -> (PostgrestJobStore, Rows) {
        let rows: Rows = Arc::default();
        let base_url = start_mock_postgrest(rows.clone()).await;
        let store = PostgrestJobStore::new(
            reqwest::Client::new(),
            &base_url,
            "print_jobs",
            "service-key".to_string(),
        );
        (store, rows)
    }

    #[tokio::test]
    async fn test_put_get_and_conflict() {
        let (store, rows) = store().await;
        let record = job("PG0001", Utc::now() + Duration::hours(1));

        store.put(&record).await.unwrap();
        assert_eq!(rows.lock().unwrap()[0]["file_path"], "PG0001_1700000000000.png");

        let fetched = store.get(&record.otp).await.unwrap().unwrap();
        assert_eq!(fetched, record);

        let duplicate = store.put(&record).await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        let missing = store.get(&Otp::parse("PG9999").unwrap()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_update_reports_matched_rows() {
        let (store, _rows) = store().await;
        let record = job("PG0002", Utc::now() + Duration::hours(1));
        store.put(&record).await.unwrap();

        let at = Utc::now();
        assert!(store
            .update(&record.otp, &JobUpdate::completed(at))
            .await
            .unwrap());
        let fetched = store.get(&record.otp).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
        assert_eq!(fetched.completed_at, Some(at));

        assert!(!store
            .update(&Otp::parse("PG9999").unwrap(), &JobUpdate::completed(at))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, rows) = store().await;
        let record = job("PG0003", Utc::now() + Duration::hours(1));
        store.put(&record).await.unwrap();

        store.delete(&record.otp).await.unwrap();
        store.delete(&record.otp).await.unwrap();
        assert!(rows.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_expired_and_stats() {
        let (store, _rows) = store().await;
        let now = Utc::now();
        store.put(&job("PGOLD1", now - Duration::minutes(5))).await.unwrap();
        store.put(&job("PGNEW1", now + Duration::minutes(5))).await.unwrap();
        store
            .update(&Otp::parse("PGNEW1").unwrap(), &JobUpdate::completed(now))
            .await
            .unwrap();

        let expired = store.list_expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].otp.as_str(), "PGOLD1");

        let stats = store.stats().await.unwrap();
        assert_eq!(
            stats,
            JobStats {
                total: 2,
                pending: 1,
                completed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_backend_error_is_reported() {
        let app = axum::Router::new().route(
            "/rest/v1/print_jobs",
            axum::routing::get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let store = PostgrestJobStore::new(
            reqwest::Client::new(),
            &format!("http://127.0.0.1:{port}"),
            "print_jobs",
            "service-key".to_string(),
        );
        let result = store.get(&Otp::parse("PG0004").unwrap()).await;
        assert!(matches!(result, Err(StoreError::Backend(msg)) if msg.contains("500")));
    }
}
