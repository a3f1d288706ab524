// ==========================================
// 钱币收藏管理 - 外部协作者 Repository Trait
// ==========================================
// 职责: 定义导入管道依赖的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{CoinRecord, Collection};
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// CoinRecordStore Trait
// ==========================================
// 用途: "批量创建记录" 写入操作
// 实现者: SqliteCoinRepository
#[async_trait]
pub trait CoinRecordStore: Send + Sync {
    /// 批量插入钱币记录（单次原子写入）
    ///
    /// # 参数
    /// - collection_id: 所属收藏集
    /// - records: 记录列表
    ///
    /// # 返回
    /// - Ok(usize): 插入的记录数
    /// - Err: 任一记录被拒绝时整批失败（不返回逐行结果）
    async fn create_many(
        &self,
        collection_id: &str,
        records: &[CoinRecord],
    ) -> RepositoryResult<usize>;
}

// ==========================================
// CollectionProvider Trait
// ==========================================
// 用途: 提供当前收藏集身份
// 实现者: SqliteCoinRepository
#[async_trait]
pub trait CollectionProvider: Send + Sync {
    /// 当前收藏集；尚未创建时返回 None
    async fn current_collection(&self) -> RepositoryResult<Option<Collection>>;
}
