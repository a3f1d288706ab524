// ==========================================
// 钱币收藏管理 - 领域模型层
// ==========================================
// 职责: 定义导入管道涉及的实体与值类型
// 红线: 不含数据访问逻辑，不含导入流程逻辑
// ==========================================

pub mod coin;
pub mod collection;
pub mod schema;
pub mod table;

// 重导出核心类型
pub use coin::CoinRecord;
pub use collection::Collection;
pub use schema::{field_names, FieldKind, SchemaField, COIN_SCHEMA};
pub use table::{CellValue, ParsedTable};
