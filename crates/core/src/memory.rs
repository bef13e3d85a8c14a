//! # インメモリストア
//!
//! ローカル開発（`STORAGE_BACKEND=memory`）とテスト用のストア実装。
//! インスタンスは `LifecycleService` に注入して使い、プロセス全体では共有しない。

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use xeroq_types::{JobStats, JobUpdate, Otp, PrintJob};

use crate::error::StoreError;
use crate::store::{BlobStore, JobStore};

/// `HashMap` によるレコードストア
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Otp, PrintJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保持しているレコード数
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: &PrintJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.otp) {
            return Err(StoreError::Conflict(job.otp.to_string()));
        }
        jobs.insert(job.otp.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, otp: &Otp) -> Result<Option<PrintJob>, StoreError> {
        Ok(self.jobs.read().await.get(otp).cloned())
    }

    async fn update(&self, otp: &Otp, update: &JobUpdate) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(otp) {
            Some(job) => {
                update.apply_to(job);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, otp: &Otp) -> Result<(), StoreError> {
        self.jobs.write().await.remove(otp);
        Ok(())
    }

    async fn list_expired(&self, now: DateTime<Utc>) -> Result<Vec<PrintJob>, StoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.expires_at < now)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<JobStats, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(JobStats::from_statuses(jobs.values().map(|job| job.status)))
    }
}

/// `HashMap` によるブロブストア
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, content_ref: &str) -> bool {
        self.blobs.read().await.contains_key(content_ref)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(
        &self,
        content_ref: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StoreError> {
        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(content_ref) {
            return Err(StoreError::Conflict(content_ref.to_string()));
        }
        blobs.insert(content_ref.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn download(&self, content_ref: &str) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(content_ref)
            .cloned()
            .ok_or_else(|| StoreError::Backend(format!("ブロブが存在しません: {content_ref}")))
    }

    async fn delete(&self, content_ref: &str) -> Result<(), StoreError> {
        self.blobs.write().await.remove(content_ref);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xeroq_types::{JobStatus, PrintOptions};

    fn job(otp: &str, expires_at: DateTime<Utc>) -> PrintJob {
        PrintJob {
            otp: Otp::parse(otp).unwrap(),
            filename: "doc.pdf".to_string(),
            content_ref: format!("{otp}_0.pdf"),
            content_type: "application/pdf".to_string(),
            print_options: PrintOptions::from_json(r#"{"colorMode":"bw","copies":"1"}"#).unwrap(),
            created_at: expires_at - chrono::Duration::hours(1),
            expires_at,
            status: JobStatus::Pending,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_put_rejects_duplicate_otp() {
        let store = MemoryJobStore::new();
        let record = job("AAAAAA", Utc::now());
        store.put(&record).await.unwrap();

        let result = store.put(&record).await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = MemoryJobStore::new();
        let record = job("BBBBBB", Utc::now());
        let at = Utc::now();

        // 存在しないレコードの更新は false
        assert!(!store.update(&record.otp, &JobUpdate::completed(at)).await.unwrap());

        store.put(&record).await.unwrap();
        assert!(store.update(&record.otp, &JobUpdate::completed(at)).await.unwrap());
        let stored = store.get(&record.otp).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.completed_at, Some(at));

        store.delete(&record.otp).await.unwrap();
        // 冪等
        store.delete(&record.otp).await.unwrap();
        assert!(store.get(&record.otp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_expired_and_stats() {
        let store = MemoryJobStore::new();
        let now = Utc::now();
        store.put(&job("OLD001", now - chrono::Duration::minutes(1))).await.unwrap();
        store.put(&job("NEW001", now + chrono::Duration::minutes(1))).await.unwrap();
        store
            .update(&Otp::parse("NEW001").unwrap(), &JobUpdate::completed(now))
            .await
            .unwrap();

        let expired = store.list_expired(now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].otp.as_str(), "OLD001");

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completed, 1);
    }

    #[tokio::test]
    async fn test_blob_roundtrip_and_delete() {
        let blobs = MemoryBlobStore::new();
        blobs.upload("k.pdf", b"%PDF-1.7", "application/pdf").await.unwrap();
        assert_eq!(blobs.download("k.pdf").await.unwrap(), b"%PDF-1.7");

        blobs.delete("k.pdf").await.unwrap();
        blobs.delete("k.pdf").await.unwrap();
        assert!(!blobs.contains("k.pdf").await);
        assert!(blobs.download("k.pdf").await.is_err());
    }
}
