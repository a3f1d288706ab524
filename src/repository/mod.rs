// ==========================================
// 钱币收藏管理 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod coin_repo;
pub mod coin_repo_impl;
pub mod error;

// 重导出核心仓储
pub use coin_repo::{CoinRecordStore, CollectionProvider};
pub use coin_repo_impl::SqliteCoinRepository;
pub use error::{RepositoryError, RepositoryResult};
