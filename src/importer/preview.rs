// ==========================================
// 钱币收藏管理 - 导入预览
// ==========================================
// 职责: 转换结果的只读分页视图（确认提交前人工核对）
// 红线: 不修改、不重新派生记录
// ==========================================

use crate::domain::coin::CoinRecord;

pub const DEFAULT_PAGE_SIZE: usize = 5;
pub const DEFAULT_PAGE_INCREMENT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportPreview {
    records: Vec<CoinRecord>,
    visible: usize,
    increment: usize,
}

impl ImportPreview {
    pub fn new(records: Vec<CoinRecord>, page_size: usize) -> Self {
        Self::with_increment(records, page_size, DEFAULT_PAGE_INCREMENT)
    }

    pub fn with_increment(records: Vec<CoinRecord>, page_size: usize, increment: usize) -> Self {
        let visible = page_size.min(records.len());
        Self {
            records,
            visible,
            increment: increment.max(1),
        }
    }

    /// 当前可见的记录
    pub fn visible_records(&self) -> &[CoinRecord] {
        &self.records[..self.visible]
    }

    /// 显示更多（按固定增量，封顶为总数）；返回新的可见数
    pub fn show_more(&mut self) -> usize {
        self.visible = (self.visible + self.increment).min(self.records.len());
        self.visible
    }

    pub fn visible_count(&self) -> usize {
        self.visible
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    pub fn has_more(&self) -> bool {
        self.visible < self.records.len()
    }

    /// 完整记录集（提交使用，与可见范围无关）
    pub fn records(&self) -> &[CoinRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CoinRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn records(n: usize) -> Vec<CoinRecord> {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        (1..=n)
            .map(|i| CoinRecord::placeholder("col-1", "Untitled Coin", i, today, 2026))
            .collect()
    }

    #[test]
    fn test_show_more_caps_at_total() {
        let mut preview = ImportPreview::new(records(12), DEFAULT_PAGE_SIZE);
        assert_eq!(preview.visible_count(), 5);
        assert!(preview.has_more());

        assert_eq!(preview.show_more(), 10);
        assert_eq!(preview.show_more(), 12);
        assert_eq!(preview.show_more(), 12);
        assert!(!preview.has_more());
        assert_eq!(preview.visible_records().len(), 12);
    }

    #[test]
    fn test_small_set_fully_visible() {
        let preview = ImportPreview::new(records(3), DEFAULT_PAGE_SIZE);
        assert_eq!(preview.visible_count(), 3);
        assert!(!preview.has_more());
    }

    #[test]
    fn test_records_untouched_by_paging() {
        let original = records(7);
        let mut preview = ImportPreview::new(original.clone(), 2);
        preview.show_more();

        assert_eq!(preview.records(), original.as_slice());
        assert_eq!(preview.into_records(), original);
    }
}
