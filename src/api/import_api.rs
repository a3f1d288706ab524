// ==========================================
// 钱币收藏管理 - 导入API
// ==========================================
// 职责: 封装导入会话的各阶段操作，供 CLI / 上层界面调用
// 约束: 同一 ImportApi 同一时间仅一个活动会话
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::{CoinRecord, Collection};
use crate::importer::{
    BatchCommitter, ColumnMapping, CommitResult, ImportSession, ImportStage, SessionOptions,
    UniversalFileParser,
};
use crate::repository::{CollectionProvider, SqliteCoinRepository};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// 文件解析 + 自动映射后的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportStartResponse {
    pub session_id: String,
    pub collection_id: String,
    /// 源文件表头（原始顺序）
    pub columns: Vec<String>,
    pub row_count: usize,
    /// 自动预填的映射
    pub mapping: ColumnMapping,
    /// 仍未映射的必填字段提示
    pub missing_required: Vec<String>,
}

/// 预览响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub total: usize,
    pub visible: Vec<CoinRecord>,
    pub has_more: bool,
}

/// 导入API
pub struct ImportApi {
    repo: Arc<SqliteCoinRepository>,
    config: ConfigManager,
    parser: UniversalFileParser,
    committer: BatchCommitter,
    session: Mutex<ImportSession>,
}

impl ImportApi {
    /// 打开数据库并创建 ImportApi 实例
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let repo = Arc::new(SqliteCoinRepository::new(db_path)?);
        Self::from_repository(repo)
    }

    /// 基于已有仓储创建（配置读取共享同一连接）
    pub fn from_repository(repo: Arc<SqliteCoinRepository>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(repo.connection())?;
        let committer = BatchCommitter::new(repo.clone());

        Ok(Self {
            repo,
            config,
            parser: UniversalFileParser,
            committer,
            session: Mutex::new(ImportSession::default()),
        })
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn repository(&self) -> &SqliteCoinRepository {
        &self.repo
    }

    // ==========================================
    // 收藏集
    // ==========================================

    /// 创建收藏集（"尚无收藏集" 时的前置操作）
    pub fn create_collection(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> ApiResult<Collection> {
        if name.trim().is_empty() {
            return Err(ApiError::InvalidInput("收藏集名称不能为空".to_string()));
        }
        Ok(self.repo.create_collection(name, description)?)
    }

    pub async fn current_collection(&self) -> ApiResult<Option<Collection>> {
        Ok(self.repo.current_collection().await?)
    }

    // ==========================================
    // 导入会话
    // ==========================================

    /// 当前会话阶段
    pub async fn stage(&self) -> ImportStage {
        self.session.lock().await.stage()
    }

    /// 开始导入: 选择文件 → 解析 → 自动映射
    ///
    /// 已有的未完成会话会被替换
    pub async fn start_import(&self, file_path: impl AsRef<Path>) -> ApiResult<ImportStartResponse> {
        let file_path = file_path.as_ref();
        let options = self.session_options().await?;

        let mut session = self.session.lock().await;
        *session = ImportSession::new(options);
        info!(session_id = %session.id(), file = %file_path.display(), "开始导入会话");

        session.select_file(file_path)?;
        let (columns, row_count) = {
            let table = session.parse(&self.parser).await?;
            (table.columns.clone(), table.row_count())
        };

        let collection = self.repo.current_collection().await?;
        let collection_id = collection.as_ref().map(|c| c.id.clone()).unwrap_or_default();
        let mapping = session.begin_mapping(collection)?.clone();
        let missing_required = session
            .mapper()
            .missing_required(&mapping)
            .into_iter()
            .map(|f| format!("{} is required", f.label))
            .collect();

        Ok(ImportStartResponse {
            session_id: session.id().to_string(),
            collection_id,
            columns,
            row_count,
            mapping,
            missing_required,
        })
    }

    /// 覆写单个字段映射（column 为空串表示取消映射）
    pub async fn assign_mapping(&self, field: &str, column: &str) -> ApiResult<ColumnMapping> {
        let mut session = self.session.lock().await;
        session.assign_mapping(field, column)?;
        Ok(session.mapping().clone())
    }

    /// 确认映射并生成预览（today 取本地日期）
    pub async fn confirm_mapping(&self) -> ApiResult<PreviewResponse> {
        self.confirm_mapping_at(Local::now().date_naive()).await
    }

    /// 确认映射并生成预览（指定 today）
    pub async fn confirm_mapping_at(&self, today: NaiveDate) -> ApiResult<PreviewResponse> {
        let mut session = self.session.lock().await;
        session.confirm_mapping(today)?;
        Ok(Self::preview_response(&session))
    }

    /// 预览 "显示更多"
    pub async fn show_more(&self) -> ApiResult<PreviewResponse> {
        let mut session = self.session.lock().await;
        session.show_more()?;
        Ok(Self::preview_response(&session))
    }

    /// 从预览返回映射编辑（保留当前映射）
    pub async fn back_to_mapping(&self) -> ApiResult<ColumnMapping> {
        let mut session = self.session.lock().await;
        session.back_to_mapping()?;
        Ok(session.mapping().clone())
    }

    /// 提交预览中的全部记录
    pub async fn commit(&self) -> ApiResult<CommitResult> {
        let mut session = self.session.lock().await;
        Ok(session.commit(&self.committer).await?)
    }

    /// 取消当前会话
    pub async fn cancel(&self) -> ApiResult<()> {
        let mut session = self.session.lock().await;
        Ok(session.cancel()?)
    }

    /// 最近一次失败文本
    pub async fn last_error(&self) -> Option<String> {
        self.session.lock().await.last_error().map(str::to_string)
    }

    async fn session_options(&self) -> ApiResult<SessionOptions> {
        Ok(SessionOptions {
            preview_page_size: self.config.get_preview_page_size().await?,
            preview_increment: self.config.get_preview_increment().await?,
            transform: self.config.get_transform_options().await?,
        })
    }

    fn preview_response(session: &ImportSession) -> PreviewResponse {
        match session.preview() {
            Some(preview) => PreviewResponse {
                total: preview.total(),
                visible: preview.visible_records().to_vec(),
                has_more: preview.has_more(),
            },
            None => PreviewResponse {
                total: 0,
                visible: Vec::new(),
                has_more: false,
            },
        }
    }
}
