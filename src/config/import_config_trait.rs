// ==========================================
// 钱币收藏管理 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::row_transformer::TransformOptions;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    // ===== 预览配置 =====

    /// 预览初始可见行数
    ///
    /// # 默认值
    /// - 5
    async fn get_preview_page_size(&self) -> RepositoryResult<usize>;

    /// "显示更多" 每次增加的行数
    ///
    /// # 默认值
    /// - 5
    async fn get_preview_increment(&self) -> RepositoryResult<usize>;

    // ===== 标题合成配置 =====

    /// 空行占位标题前缀（完整标题为 "{前缀} {行号}"）
    ///
    /// # 默认值
    /// - "Untitled Coin"
    async fn get_placeholder_title_prefix(&self) -> RepositoryResult<String>;

    /// 合成标题时跳过的洲级 region 值
    ///
    /// # 默认值
    /// - ["Americas", "Europe", "Asia"]
    async fn get_continent_placeholders(&self) -> RepositoryResult<Vec<String>>;

    /// 组装 RowTransformer 选项
    async fn get_transform_options(&self) -> RepositoryResult<TransformOptions> {
        Ok(TransformOptions {
            placeholder_title_prefix: self.get_placeholder_title_prefix().await?,
            continent_placeholders: self.get_continent_placeholders().await?,
        })
    }
}
