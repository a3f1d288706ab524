// ==========================================
// 钱币收藏管理 - 收藏集身份
// ==========================================
// 用途: 导入目标收藏集（由外部 CollectionProvider 提供）
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}
