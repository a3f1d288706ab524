// ==========================================
// 钱币收藏管理 - 批量提交
// ==========================================
// 职责: 将完整记录集一次性交给 CoinRecordStore
// 红线: 单次调用，无部分提交；失败不修改调用方持有的记录
// ==========================================

use crate::domain::{CoinRecord, Collection};
use crate::importer::error::{ImportError, ImportResult};
use crate::repository::coin_repo::CoinRecordStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// 提交结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitResult {
    pub batch_id: String,
    pub collection_id: String,
    pub inserted_count: usize,
    pub elapsed_ms: u64,
}

// ==========================================
// BatchCommitter
// ==========================================
pub struct BatchCommitter {
    store: Arc<dyn CoinRecordStore>,
}

impl BatchCommitter {
    pub fn new(store: Arc<dyn CoinRecordStore>) -> Self {
        Self { store }
    }

    /// 提交全部记录（一次 create_many 调用）
    ///
    /// # 返回
    /// - Ok(CommitResult): 存储确认写入
    /// - Err(CommitRejected): 存储拒绝，原始原因保留在 source 中
    #[instrument(skip(self, collection, records), fields(collection_id = %collection.id, total = records.len()))]
    pub async fn commit(
        &self,
        collection: &Collection,
        records: &[CoinRecord],
    ) -> ImportResult<CommitResult> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();

        info!(batch_id = %batch_id, count = records.len(), "开始批量提交");

        match self.store.create_many(&collection.id, records).await {
            Ok(inserted_count) => {
                let elapsed_ms = start_time.elapsed().as_millis() as u64;
                info!(
                    batch_id = %batch_id,
                    inserted_count,
                    elapsed_ms,
                    "批量提交完成"
                );
                Ok(CommitResult {
                    batch_id,
                    collection_id: collection.id.clone(),
                    inserted_count,
                    elapsed_ms,
                })
            }
            Err(e) => {
                error!(batch_id = %batch_id, error = %e, "批量提交被拒绝");
                Err(ImportError::CommitRejected(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<usize>>,
        reject: bool,
    }

    #[async_trait]
    impl CoinRecordStore for RecordingStore {
        async fn create_many(
            &self,
            _collection_id: &str,
            records: &[CoinRecord],
        ) -> RepositoryResult<usize> {
            self.calls.lock().unwrap().push(records.len());
            if self.reject {
                Err(RepositoryError::ConstraintViolation("CHECK constraint failed".into()))
            } else {
                Ok(records.len())
            }
        }
    }

    fn collection() -> Collection {
        Collection {
            id: "col-1".to_string(),
            name: "Main".to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    fn records(n: usize) -> Vec<CoinRecord> {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        (1..=n)
            .map(|i| CoinRecord::placeholder("col-1", "Untitled Coin", i, today, 2026))
            .collect()
    }

    #[tokio::test]
    async fn test_commit_single_call_with_all_records() {
        let store = Arc::new(RecordingStore::default());
        let committer = BatchCommitter::new(store.clone());

        let result = committer.commit(&collection(), &records(7)).await.unwrap();

        assert_eq!(result.inserted_count, 7);
        assert_eq!(result.collection_id, "col-1");
        assert_eq!(*store.calls.lock().unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn test_commit_rejection_surfaces_store_error() {
        let store = Arc::new(RecordingStore {
            reject: true,
            ..Default::default()
        });
        let committer = BatchCommitter::new(store.clone());
        let batch = records(3);
        let before = batch.clone();

        let err = committer.commit(&collection(), &batch).await.unwrap_err();

        assert!(matches!(
            err,
            ImportError::CommitRejected(RepositoryError::ConstraintViolation(_))
        ));
        assert_eq!(batch, before);
        assert_eq!(*store.calls.lock().unwrap(), vec![3]);
    }
}
