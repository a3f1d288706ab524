// ==========================================
// 钱币收藏管理 - 目标记录 Schema 注册表
// ==========================================
// 职责: 编译期固定、有序的目标字段列表（字段名 / 显示名 / 是否必填）
// 红线: 进程级常量，不随导入会话创建或销毁
// ==========================================

use serde::Serialize;

/// 字段名常量（同时也是记录的键）
pub mod field_names {
    pub const DENOMINATION: &str = "denomination";
    pub const YEAR: &str = "year";
    pub const MINT_MARK: &str = "mint_mark";
    pub const GRADE: &str = "grade";
    pub const PURCHASE_PRICE: &str = "purchase_price";
    pub const PURCHASE_DATE: &str = "purchase_date";
    pub const NOTES: &str = "notes";
}

/// 字段值类型（决定 RowTransformer 的标准化方式）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Year,
    Decimal,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
}

// ==========================================
// COIN_SCHEMA - 钱币记录字段（顺序即界面顺序）
// ==========================================
pub const COIN_SCHEMA: &[SchemaField] = &[
    SchemaField {
        name: field_names::DENOMINATION,
        label: "Denomination",
        required: true,
        kind: FieldKind::Text,
    },
    SchemaField {
        name: field_names::YEAR,
        label: "Year",
        required: true,
        kind: FieldKind::Year,
    },
    SchemaField {
        name: field_names::MINT_MARK,
        label: "Mint Mark",
        required: false,
        kind: FieldKind::Text,
    },
    SchemaField {
        name: field_names::GRADE,
        label: "Grade",
        required: false,
        kind: FieldKind::Text,
    },
    SchemaField {
        name: field_names::PURCHASE_PRICE,
        label: "Purchase Price",
        required: false,
        kind: FieldKind::Decimal,
    },
    SchemaField {
        name: field_names::PURCHASE_DATE,
        label: "Purchase Date",
        required: false,
        kind: FieldKind::Date,
    },
    SchemaField {
        name: field_names::NOTES,
        label: "Notes",
        required: false,
        kind: FieldKind::Text,
    },
];

/// 按字段名查找
pub fn find_field(schema: &[SchemaField], name: &str) -> Option<SchemaField> {
    schema.iter().find(|f| f.name == name).copied()
}

pub fn required_fields(schema: &[SchemaField]) -> impl Iterator<Item = &SchemaField> {
    schema.iter().filter(|f| f.required)
}
