// ==========================================
// 钱币收藏管理 - 导入会话（状态机）
// ==========================================
// 职责: 持有会话内状态（文件 / 表 / 映射 / 收藏集 / 预览），驱动各阶段
// 状态流: Idle → FileSelected → Parsed → Mapping → Validated → Previewing
//         → Committing → Done | Committing → Failed → Previewing
//         任意交互阶段 → Cancelled
// 红线: 非法调用一律 InvalidStateTransition，不做隐式重试
// ==========================================

use crate::domain::{CoinRecord, Collection, ParsedTable};
use crate::importer::batch_committer::{BatchCommitter, CommitResult};
use crate::importer::column_mapper::{ColumnMapper, ColumnMapping};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::preview::{ImportPreview, DEFAULT_PAGE_INCREMENT, DEFAULT_PAGE_SIZE};
use crate::importer::row_transformer::{RowTransformer, TransformContext, TransformOptions};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

// ==========================================
// ImportStage - 会话阶段
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStage {
    Idle,
    FileSelected,
    Parsed,
    Mapping,
    Validated,
    Previewing,
    Committing,
    Done,
    Failed,
    Cancelled,
}

impl ImportStage {
    /// 可以开始新会话的阶段
    pub fn is_initial(self) -> bool {
        matches!(self, ImportStage::Idle | ImportStage::Done | ImportStage::Cancelled)
    }

    /// 可被用户取消的阶段
    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            ImportStage::FileSelected
                | ImportStage::Parsed
                | ImportStage::Mapping
                | ImportStage::Validated
                | ImportStage::Previewing
                | ImportStage::Failed
        )
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ImportStage::Idle => "IDLE",
            ImportStage::FileSelected => "FILE_SELECTED",
            ImportStage::Parsed => "PARSED",
            ImportStage::Mapping => "MAPPING",
            ImportStage::Validated => "VALIDATED",
            ImportStage::Previewing => "PREVIEWING",
            ImportStage::Committing => "COMMITTING",
            ImportStage::Done => "DONE",
            ImportStage::Failed => "FAILED",
            ImportStage::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// 会话参数（来自配置）
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub preview_page_size: usize,
    pub preview_increment: usize,
    pub transform: TransformOptions,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            preview_page_size: DEFAULT_PAGE_SIZE,
            preview_increment: DEFAULT_PAGE_INCREMENT,
            transform: TransformOptions::default(),
        }
    }
}

// ==========================================
// ImportSession
// ==========================================
pub struct ImportSession {
    id: String,
    stage: ImportStage,
    mapper: ColumnMapper,
    transformer: RowTransformer,
    options: SessionOptions,

    // ===== 会话内状态（Done / Cancelled 时丢弃）=====
    file_path: Option<PathBuf>,
    table: Option<ParsedTable>,
    mapping: ColumnMapping,
    collection: Option<Collection>,
    preview: Option<ImportPreview>,
    last_error: Option<String>,
}

impl Default for ImportSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl ImportSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stage: ImportStage::Idle,
            mapper: ColumnMapper::default(),
            transformer: RowTransformer::new(options.transform.clone()),
            options,
            file_path: None,
            table: None,
            mapping: ColumnMapping::new(),
            collection: None,
            preview: None,
            last_error: None,
        }
    }

    // ===== 只读访问 =====

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stage(&self) -> ImportStage {
        self.stage
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn table(&self) -> Option<&ParsedTable> {
        self.table.as_ref()
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    pub fn mapper(&self) -> &ColumnMapper {
        &self.mapper
    }

    pub fn collection(&self) -> Option<&Collection> {
        self.collection.as_ref()
    }

    pub fn preview(&self) -> Option<&ImportPreview> {
        self.preview.as_ref()
    }

    /// 最近一次失败的文本（解析失败 / 提交失败）
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure_stage(&self, allowed: &[ImportStage], to: ImportStage) -> ImportResult<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(ImportError::InvalidStateTransition {
                from: self.stage.to_string(),
                to: to.to_string(),
            })
        }
    }

    fn discard_state(&mut self) {
        self.file_path = None;
        self.table = None;
        self.mapping = ColumnMapping::new();
        self.collection = None;
        self.preview = None;
    }

    fn transition(&mut self, to: ImportStage) {
        info!(session_id = %self.id, from = %self.stage, to = %to, "导入会话状态转换");
        self.stage = to;
    }

    // ==========================================
    // 阶段操作
    // ==========================================

    /// 选择文件（Idle / Done / Cancelled → FileSelected）
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> ImportResult<()> {
        if !self.stage.is_initial() {
            return Err(ImportError::InvalidStateTransition {
                from: self.stage.to_string(),
                to: ImportStage::FileSelected.to_string(),
            });
        }
        self.discard_state();
        self.last_error = None;
        self.file_path = Some(path.into());
        self.transition(ImportStage::FileSelected);
        Ok(())
    }

    /// 解析已选文件（FileSelected → Parsed；失败回到 Idle）
    pub async fn parse(&mut self, parser: &UniversalFileParser) -> ImportResult<&ParsedTable> {
        self.ensure_stage(&[ImportStage::FileSelected], ImportStage::Parsed)?;
        let path = match self.file_path.clone() {
            Some(path) => path,
            None => {
                return Err(ImportError::InvalidStateTransition {
                    from: self.stage.to_string(),
                    to: ImportStage::Parsed.to_string(),
                })
            }
        };

        match parser.parse(&path).await {
            Ok(table) => {
                self.transition(ImportStage::Parsed);
                Ok(&*self.table.insert(table))
            }
            Err(e) => {
                warn!(session_id = %self.id, file = %path.display(), error = %e, "文件解析失败，会话重置");
                self.discard_state();
                self.last_error = Some(e.to_string());
                self.transition(ImportStage::Idle);
                Err(e.into())
            }
        }
    }

    /// 进入映射阶段（Parsed → Mapping），按表头自动预填映射
    ///
    /// 未提供收藏集时返回 NoCollection，会话停留在 Parsed
    pub fn begin_mapping(&mut self, collection: Option<Collection>) -> ImportResult<&ColumnMapping> {
        self.ensure_stage(&[ImportStage::Parsed], ImportStage::Mapping)?;
        let Some(collection) = collection else {
            warn!(session_id = %self.id, "尚未创建收藏集，无法进入映射阶段");
            return Err(ImportError::NoCollection);
        };

        let columns = self
            .table
            .as_ref()
            .map(|t| t.columns.as_slice())
            .unwrap_or_default();
        self.mapping = self.mapper.auto_map(columns);
        self.collection = Some(collection);
        self.transition(ImportStage::Mapping);
        Ok(&self.mapping)
    }

    /// 覆写单个字段映射（仅 Mapping 阶段；column 为空串表示取消映射）
    pub fn assign_mapping(&mut self, field: &str, column: &str) -> ImportResult<()> {
        self.ensure_stage(&[ImportStage::Mapping], ImportStage::Mapping)?;
        let columns = self
            .table
            .as_ref()
            .map(|t| t.columns.as_slice())
            .unwrap_or_default();
        self.mapper.assign(&mut self.mapping, columns, field, column)
    }

    /// 确认映射（Mapping → Validated → Previewing）
    ///
    /// 校验失败时停留在 Mapping，错误内含每个缺失必填字段
    pub fn confirm_mapping(&mut self, today: NaiveDate) -> ImportResult<&ImportPreview> {
        self.ensure_stage(&[ImportStage::Mapping], ImportStage::Validated)?;
        self.mapper.validate(&self.mapping)?;
        self.transition(ImportStage::Validated);

        let context = self
            .collection
            .as_ref()
            .map(|c| TransformContext::new(c.id.clone(), today));
        let table = match self.table.as_ref() {
            Some(table) => table,
            None => {
                return Err(ImportError::InvalidStateTransition {
                    from: self.stage.to_string(),
                    to: ImportStage::Previewing.to_string(),
                })
            }
        };

        let records = match self.transformer.transform(table, &self.mapping, context.as_ref()) {
            Ok(records) => records,
            Err(e) => {
                self.transition(ImportStage::Mapping);
                return Err(e);
            }
        };

        let preview = ImportPreview::with_increment(
            records,
            self.options.preview_page_size,
            self.options.preview_increment,
        );
        self.transition(ImportStage::Previewing);
        Ok(&*self.preview.insert(preview))
    }

    /// 从预览返回映射阶段（Previewing → Mapping，丢弃预览）
    pub fn back_to_mapping(&mut self) -> ImportResult<()> {
        self.ensure_stage(&[ImportStage::Previewing], ImportStage::Mapping)?;
        self.preview = None;
        self.transition(ImportStage::Mapping);
        Ok(())
    }

    /// 预览 "显示更多"；返回新的可见行数
    pub fn show_more(&mut self) -> ImportResult<usize> {
        self.ensure_stage(&[ImportStage::Previewing], ImportStage::Previewing)?;
        match self.preview.as_mut() {
            Some(preview) => Ok(preview.show_more()),
            None => Ok(0),
        }
    }

    /// 提交预览中的全部记录
    ///
    /// - 成功: Committing → Done，丢弃会话内状态
    /// - 失败: Committing → Failed → Previewing，状态保持不变，可原样重试或取消
    pub async fn commit(&mut self, committer: &BatchCommitter) -> ImportResult<CommitResult> {
        self.ensure_stage(&[ImportStage::Previewing], ImportStage::Committing)?;
        let collection = match (self.collection.as_ref(), self.preview.is_some()) {
            (Some(collection), true) => collection.clone(),
            _ => {
                return Err(ImportError::InvalidStateTransition {
                    from: self.stage.to_string(),
                    to: ImportStage::Committing.to_string(),
                })
            }
        };

        self.transition(ImportStage::Committing);
        let outcome = committer.commit(&collection, self.records()).await;

        match outcome {
            Ok(result) => {
                self.transition(ImportStage::Done);
                self.discard_state();
                self.last_error = None;
                Ok(result)
            }
            Err(e) => {
                self.transition(ImportStage::Failed);
                self.last_error = Some(e.to_string());
                self.transition(ImportStage::Previewing);
                Err(e)
            }
        }
    }

    /// 取消会话（任意交互阶段 → Cancelled），丢弃会话内状态
    pub fn cancel(&mut self) -> ImportResult<()> {
        if !self.stage.is_interactive() {
            return Err(ImportError::InvalidStateTransition {
                from: self.stage.to_string(),
                to: ImportStage::Cancelled.to_string(),
            });
        }
        self.discard_state();
        self.last_error = None;
        self.transition(ImportStage::Cancelled);
        Ok(())
    }

    /// 预览中的全部记录（未进入预览时为空）
    pub fn records(&self) -> &[CoinRecord] {
        self.preview.as_ref().map(|p| p.records()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::field_names;
    use crate::repository::coin_repo::CoinRecordStore;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    struct FlakyStore {
        fail: AtomicBool,
        batches: Mutex<Vec<Vec<CoinRecord>>>,
    }

    #[async_trait]
    impl CoinRecordStore for FlakyStore {
        async fn create_many(
            &self,
            _collection_id: &str,
            records: &[CoinRecord],
        ) -> RepositoryResult<usize> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(RepositoryError::DatabaseConnectionError("offline".into()));
            }
            self.batches.lock().unwrap().push(records.to_vec());
            Ok(records.len())
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

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn csv_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    async fn parsed_session(file: &tempfile::NamedTempFile) -> ImportSession {
        let mut session = ImportSession::default();
        session.select_file(file.path()).unwrap();
        session.parse(&UniversalFileParser).await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_happy_path_reaches_done_and_discards_state() {
        let file = csv_file("denomination,year,grade\nQuarter,1964,MS-63\nDime,1950,VF\n");
        let mut session = parsed_session(&file).await;

        session.begin_mapping(Some(collection())).unwrap();
        assert_eq!(session.stage(), ImportStage::Mapping);
        assert_eq!(session.mapping().get(field_names::YEAR), Some("year"));

        let preview = session.confirm_mapping(today()).unwrap();
        assert_eq!(preview.total(), 2);
        assert_eq!(session.stage(), ImportStage::Previewing);

        let store = Arc::new(FlakyStore {
            fail: AtomicBool::new(false),
            batches: Mutex::new(Vec::new()),
        });
        let result = session.commit(&BatchCommitter::new(store.clone())).await.unwrap();

        assert_eq!(result.inserted_count, 2);
        assert_eq!(session.stage(), ImportStage::Done);
        assert!(session.table().is_none());
        assert!(session.preview().is_none());
        assert!(session.mapping().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_returns_to_idle() {
        let mut session = ImportSession::default();
        session.select_file("/nonexistent/coins.csv").unwrap();

        let err = session.parse(&UniversalFileParser).await.unwrap_err();
        assert!(matches!(err, ImportError::Parse(_)));
        assert_eq!(session.stage(), ImportStage::Idle);
        assert!(session.last_error().is_some());
        assert!(session.file_path().is_none());
    }

    #[tokio::test]
    async fn test_no_collection_stays_parsed() {
        let file = csv_file("denomination,year\nQuarter,1964\n");
        let mut session = parsed_session(&file).await;

        let err = session.begin_mapping(None).unwrap_err();
        assert!(matches!(err, ImportError::NoCollection));
        assert_eq!(session.stage(), ImportStage::Parsed);
    }

    #[tokio::test]
    async fn test_validation_failure_stays_in_mapping() {
        let file = csv_file("Denomination,year\nQuarter,1964\n");
        let mut session = parsed_session(&file).await;
        session.begin_mapping(Some(collection())).unwrap();

        let err = session.confirm_mapping(today()).unwrap_err();
        assert_eq!(err.missing_field_messages(), vec!["Denomination is required"]);
        assert_eq!(session.stage(), ImportStage::Mapping);

        session
            .assign_mapping(field_names::DENOMINATION, "Denomination")
            .unwrap();
        session.confirm_mapping(today()).unwrap();
        assert_eq!(session.stage(), ImportStage::Previewing);
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_state_for_retry() {
        let file = csv_file("denomination,year\nQuarter,1964\nDime,1950\nNickel,1938\n");
        let mut session = parsed_session(&file).await;
        session.begin_mapping(Some(collection())).unwrap();
        session.confirm_mapping(today()).unwrap();
        let before = session.records().to_vec();

        let store = Arc::new(FlakyStore {
            fail: AtomicBool::new(true),
            batches: Mutex::new(Vec::new()),
        });
        let committer = BatchCommitter::new(store.clone());

        let err = session.commit(&committer).await.unwrap_err();
        assert!(matches!(err, ImportError::CommitRejected(_)));
        assert_eq!(session.stage(), ImportStage::Previewing);
        assert_eq!(session.records(), before.as_slice());
        assert!(session.last_error().unwrap().contains("offline"));

        store.fail.store(false, Ordering::SeqCst);
        session.commit(&committer).await.unwrap();

        let batches = store.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], before);
    }

    /// 收集 fmt 输出的内存缓冲
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_commit_transitions_are_logged() {
        let buffer = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let file = csv_file("denomination,year\nQuarter,1964\n");
        let mut session = parsed_session(&file).await;
        session.begin_mapping(Some(collection())).unwrap();
        session.confirm_mapping(today()).unwrap();

        let store = Arc::new(FlakyStore {
            fail: AtomicBool::new(false),
            batches: Mutex::new(Vec::new()),
        });
        session.commit(&BatchCommitter::new(store)).await.unwrap();

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("from=PREVIEWING to=COMMITTING"));
        assert!(output.contains("from=COMMITTING to=DONE"));
    }

    #[tokio::test]
    async fn test_illegal_calls_rejected() {
        let mut session = ImportSession::default();

        assert!(matches!(
            session.confirm_mapping(today()),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            session.show_more(),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            session.cancel(),
            Err(ImportError::InvalidStateTransition { .. })
        ));
        assert_eq!(session.stage(), ImportStage::Idle);
    }

    #[tokio::test]
    async fn test_cancel_discards_state() {
        let file = csv_file("denomination,year\nQuarter,1964\n");
        let mut session = parsed_session(&file).await;
        session.begin_mapping(Some(collection())).unwrap();

        session.cancel().unwrap();
        assert_eq!(session.stage(), ImportStage::Cancelled);
        assert!(session.table().is_none());
        assert!(session.collection().is_none());

        session.select_file(file.path()).unwrap();
        assert_eq!(session.stage(), ImportStage::FileSelected);
    }

    #[tokio::test]
    async fn test_show_more_and_back_to_mapping() {
        let body: String = (1..=12).map(|i| format!("Cent,{}\n", 1900 + i)).collect();
        let file = csv_file(&format!("denomination,year\n{}", body));
        let mut session = parsed_session(&file).await;
        session.begin_mapping(Some(collection())).unwrap();
        session.confirm_mapping(today()).unwrap();

        assert_eq!(session.preview().unwrap().visible_count(), 5);
        assert_eq!(session.show_more().unwrap(), 10);

        session.back_to_mapping().unwrap();
        assert_eq!(session.stage(), ImportStage::Mapping);
        assert!(session.preview().is_none());
    }
}
