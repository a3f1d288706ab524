// ==========================================
// 集成测试 - 批量提交原子性
// ==========================================
// 测试目标: 存储拒绝时整批回滚、会话状态不变；重试时恰好一次整批写入
// ==========================================


use async_trait::async_trait;
use chrono::Utc;
use coin_collection_import::domain::{CoinRecord, Collection};
use coin_collection_import::importer::{
    BatchCommitter, ImportError, ImportSession, ImportStage, UniversalFileParser,
};
use coin_collection_import::logging;
use coin_collection_import::repository::{
    CoinRecordStore, CollectionProvider, RepositoryError, RepositoryResult, SqliteCoinRepository,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use test_helpers::{count_all_coins, create_test_db, fixed_today, write_input};

const INPUT: &str = "denomination,year,grade\nQuarter,1964,MS-63\nDime,1950,VF\nNickel,1938,\nCent,1909,G\n";

/// 前 N 次调用失败的存储
struct FailingThenOkStore {
    failures_left: AtomicUsize,
    batches: Mutex<Vec<Vec<CoinRecord>>>,
}

impl FailingThenOkStore {
    fn new(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            batches: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CoinRecordStore for FailingThenOkStore {
    async fn create_many(
        &self,
        _collection_id: &str,
        records: &[CoinRecord],
    ) -> RepositoryResult<usize> {
        if self.failures_left.load(Ordering::SeqCst) > 0 {
            self.failures_left.fetch_sub(1, Ordering::SeqCst);
            return Err(RepositoryError::DatabaseConnectionError(
                "connection reset by peer".to_string(),
            ));
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(records.len())
    }
}

fn collection() -> Collection {
    Collection {
        id: "col-main".to_string(),
        name: "Main".to_string(),
        description: None,
        created_at: Utc::now(),
    }
}

async fn previewing_session(collection: Collection, input: &tempfile::NamedTempFile) -> ImportSession {
    let mut session = ImportSession::default();
    session.select_file(input.path()).unwrap();
    session.parse(&UniversalFileParser).await.unwrap();
    session.begin_mapping(Some(collection)).unwrap();
    session.confirm_mapping(fixed_today()).unwrap();
    session
}

#[tokio::test]
async fn test_failed_commit_then_retry_inserts_exactly_once() {
    logging::init_test();

    let input = write_input(".csv", INPUT);
    let mut session = previewing_session(collection(), &input).await;
    let before = session.records().to_vec();

    let store = Arc::new(FailingThenOkStore::new(2));
    let committer = BatchCommitter::new(store.clone());

    for _ in 0..2 {
        let err = session.commit(&committer).await.unwrap_err();
        assert!(matches!(err, ImportError::CommitRejected(_)));
        assert_eq!(session.stage(), ImportStage::Previewing);
        assert_eq!(session.records(), before.as_slice());
        assert!(session
            .last_error()
            .unwrap()
            .contains("connection reset by peer"));
    }

    let result = session.commit(&committer).await.unwrap();
    assert_eq!(result.inserted_count, before.len());

    let batches = store.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], before);
}

#[tokio::test]
async fn test_sqlite_rejection_rolls_back_whole_batch() {
    logging::init_test();

    let (_db_file, db_path) = create_test_db().unwrap();
    let repo = Arc::new(SqliteCoinRepository::new(&db_path).unwrap());
    let collection = repo.create_collection("Main", None).unwrap();

    // 第三行触发拒绝，前两行必须一并回滚
    {
        let conn = repo.connection();
        let conn = conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER reject_nickel BEFORE INSERT ON coins
             WHEN NEW.denomination = 'Nickel'
             BEGIN SELECT RAISE(ABORT, 'nickel rejected'); END;",
        )
        .unwrap();
    }

    let input = write_input(".csv", INPUT);
    let current = repo.current_collection().await.unwrap();
    let mut session = previewing_session(current.unwrap(), &input).await;
    let before = session.records().to_vec();
    let committer = BatchCommitter::new(repo.clone());

    let err = session.commit(&committer).await.unwrap_err();
    assert!(matches!(err, ImportError::CommitRejected(_)));
    assert!(session.last_error().unwrap().contains("nickel rejected"));
    assert_eq!(session.stage(), ImportStage::Previewing);
    assert_eq!(session.records(), before.as_slice());
    {
        let conn = repo.connection();
        let conn = conn.lock().unwrap();
        assert_eq!(count_all_coins(&conn), 0);
        conn.execute_batch("DROP TRIGGER reject_nickel;").unwrap();
    }

    let result = session.commit(&committer).await.unwrap();
    assert_eq!(result.inserted_count, 4);
    assert_eq!(repo.count_coins(&collection.id).unwrap(), 4);
    assert_eq!(repo.list_coins(&collection.id).unwrap(), before);
}
