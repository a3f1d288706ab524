// ==========================================
// 钱币收藏管理 - 列映射器实现
// ==========================================
// 职责: Schema 字段 → 源列 映射（自动预填 + 用户覆写 + 必填校验）
// 红线: 不做 I/O；映射值由调用方在阶段之间显式传递
// ==========================================

use crate::domain::schema::{find_field, required_fields, SchemaField, COIN_SCHEMA};
use crate::importer::error::{ImportError, ImportResult, MissingField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ==========================================
// ColumnMapping - 字段名 → 源列名
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    entries: BTreeMap<String, String>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已映射的源列（空字符串视为未映射）
    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries
            .get(field)
            .map(String::as_str)
            .filter(|c| !c.is_empty())
    }

    pub fn is_mapped(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// 写入映射；空列名等价于清除
    pub fn set(&mut self, field: &str, column: &str) {
        if column.is_empty() {
            self.entries.remove(field);
        } else {
            self.entries.insert(field.to_string(), column.to_string());
        }
    }

    pub fn clear(&mut self, field: &str) {
        self.entries.remove(field);
    }

    pub fn len(&self) -> usize {
        self.entries.values().filter(|c| !c.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter(|(_, c)| !c.is_empty())
            .map(|(f, c)| (f.as_str(), c.as_str()))
    }
}

// ==========================================
// ColumnMapper
// ==========================================
pub struct ColumnMapper {
    schema: &'static [SchemaField],
}

impl Default for ColumnMapper {
    fn default() -> Self {
        Self::new(COIN_SCHEMA)
    }
}

impl ColumnMapper {
    pub fn new(schema: &'static [SchemaField]) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'static [SchemaField] {
        self.schema
    }

    /// 自动映射: 表头与字段名完全一致（区分大小写）时预填
    pub fn auto_map(&self, columns: &[String]) -> ColumnMapping {
        let mut mapping = ColumnMapping::new();
        for field in self.schema {
            if let Some(column) = columns.iter().find(|c| c.as_str() == field.name) {
                mapping.set(field.name, column);
            }
        }
        debug!(mapped = mapping.len(), total = self.schema.len(), "自动映射完成");
        mapping
    }

    /// 用户覆写单个字段的映射（column 为空则清除）
    pub fn assign(
        &self,
        mapping: &mut ColumnMapping,
        columns: &[String],
        field: &str,
        column: &str,
    ) -> ImportResult<()> {
        if find_field(self.schema, field).is_none() {
            return Err(ImportError::UnknownField(field.to_string()));
        }
        if !column.is_empty() && !columns.iter().any(|c| c == column) {
            return Err(ImportError::UnknownColumn(column.to_string()));
        }
        mapping.set(field, column);
        Ok(())
    }

    /// 未映射的必填字段（按 Schema 顺序）
    pub fn missing_required(&self, mapping: &ColumnMapping) -> Vec<MissingField> {
        required_fields(self.schema)
            .filter(|f| !mapping.is_mapped(f.name))
            .map(|f| MissingField {
                name: f.name.to_string(),
                label: f.label.to_string(),
            })
            .collect()
    }

    /// 确认前校验: 每个缺失的必填字段一条错误
    pub fn validate(&self, mapping: &ColumnMapping) -> ImportResult<()> {
        let missing = self.missing_required(mapping);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingRequiredFields(missing))
        }
    }
}
