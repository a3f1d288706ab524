// ==========================================
// 钱币收藏管理 - 钱币记录领域模型
// ==========================================
// 用途: RowTransformer 输出，预览只读，BatchCommitter 一次性消费
// 红线: 不在本地持久化
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// CoinRecord - 转换后的钱币记录
// ==========================================
// 未映射字段为 None，序列化时省略
// 系统注入字段: collection_id / images / purchase_date（必有）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinRecord {
    // ===== 注入字段 =====
    pub collection_id: String,
    pub images: Vec<String>,

    // ===== 标题（可合成，可能为空串）=====
    pub title: String,

    // ===== Schema 字段 =====
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub denomination: Option<String>,
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_mark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<f64>,
    pub purchase_date: NaiveDate, // 序列化为 YYYY-MM-DD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CoinRecord {
    /// 空行占位记录: "Untitled Coin {行号}" + 当年 + 今日
    pub fn placeholder(
        collection_id: &str,
        title_prefix: &str,
        row_number: usize,
        today: NaiveDate,
        current_year: i32,
    ) -> Self {
        Self {
            collection_id: collection_id.to_string(),
            images: Vec::new(),
            title: format!("{} {}", title_prefix, row_number),
            denomination: None,
            year: current_year,
            mint_mark: None,
            grade: None,
            purchase_price: None,
            purchase_date: today,
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_skips_unmapped_fields() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let record = CoinRecord::placeholder("col-1", "Untitled Coin", 3, today, 2026);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["title"], "Untitled Coin 3");
        assert_eq!(json["purchase_date"], "2026-10-18");
        assert_eq!(json["images"], serde_json::json!([]));
        assert!(json.get("denomination").is_none());
        assert!(json.get("purchase_price").is_none());
    }
}
