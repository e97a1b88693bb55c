// ==========================================
// 商品目录批量导入系统 - 模板列约定
// ==========================================
// 职责: 定义 Products/Variants 双表的列约定(版本化)
// 红线: 规范模板列名必须是别名表的第一项 —— 这是结构性契约,
//       由测试强制,不是软约定;违反即构建期失败
// ==========================================

use std::collections::HashMap;

/// 列约定版本(模板与报告 Data 表携带)
pub const CONTRACT_VERSION: &str = "v1";

/// 工作表名称
pub const SHEET_PRODUCTS: &str = "Products";
pub const SHEET_VARIANTS: &str = "Variants";
pub const SHEET_REFERENCE: &str = "Reference";

/// 开放规格列前缀(Variants 表第 9 列之后)
pub const SPEC_COLUMN_PREFIX: &str = "Spec:";

// ==========================================
// ColumnSpec - 单列约定
// ==========================================
// aliases[0] 必须等于 canonical(规范名即首别名)
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

/// Products 表列约定(顺序即模板顺序,不可调整)
pub const PRODUCT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { canonical: "Brand", aliases: &["Brand", "品牌"] },
    ColumnSpec { canonical: "Category", aliases: &["Category", "类目", "类目路径"] },
    ColumnSpec { canonical: "Series", aliases: &["Series", "系列"] },
    ColumnSpec { canonical: "Product Name", aliases: &["Product Name", "商品名称"] },
    ColumnSpec { canonical: "Product Slug", aliases: &["Product Slug", "商品标识"] },
    ColumnSpec { canonical: "Title (primary)", aliases: &["Title (primary)", "主标题"] },
    ColumnSpec { canonical: "Title (secondary)", aliases: &["Title (secondary)", "副标题"] },
    ColumnSpec { canonical: "Status", aliases: &["Status", "状态"] },
    ColumnSpec { canonical: "Is Featured", aliases: &["Is Featured", "是否推荐"] },
    ColumnSpec { canonical: "Long Description", aliases: &["Long Description", "详细描述"] },
    ColumnSpec { canonical: "General Features", aliases: &["General Features", "通用特性"] },
    ColumnSpec { canonical: "Short Specs", aliases: &["Short Specs", "简要规格"] },
    ColumnSpec { canonical: "Taxonomy", aliases: &["Taxonomy", "分类标签"] },
];

/// Variants 表固定列约定(前 9 列;其后为开放的 Spec:<key> 列)
pub const VARIANT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec { canonical: "Product Slug", aliases: &["Product Slug", "商品标识"] },
    ColumnSpec { canonical: "Model Code", aliases: &["Model Code", "型号编码"] },
    ColumnSpec { canonical: "Variant Name (primary)", aliases: &["Variant Name (primary)", "型号名称(主)"] },
    ColumnSpec { canonical: "Variant Name (secondary)", aliases: &["Variant Name (secondary)", "型号名称(副)"] },
    ColumnSpec { canonical: "SKU", aliases: &["SKU"] },
    ColumnSpec { canonical: "Dimensions", aliases: &["Dimensions", "尺寸"] },
    ColumnSpec { canonical: "Weight", aliases: &["Weight", "重量"] },
    ColumnSpec { canonical: "List Price", aliases: &["List Price", "标价"] },
    ColumnSpec { canonical: "Stock Qty", aliases: &["Stock Qty", "库存数量"] },
];

// ==========================================
// ColumnIndex - 表头 → 规范列位置索引
// ==========================================
// 别名匹配大小写不敏感;未识别列单独记录(供校验产出 info 问题)
#[derive(Debug, Default)]
pub struct ColumnIndex {
    by_canonical: HashMap<&'static str, usize>,
    pub spec_columns: Vec<(usize, String)>, // (列位置, 规格键)
    pub unknown_columns: Vec<String>,
}

impl ColumnIndex {
    /// 依据列约定解析表头
    ///
    /// # 参数
    /// - header: 表头单元格
    /// - specs: 该表的列约定
    /// - allow_spec_columns: Variants 表允许 Spec:<key> 开放列
    pub fn build(header: &[String], specs: &[ColumnSpec], allow_spec_columns: bool) -> Self {
        let mut index = ColumnIndex::default();
        for (pos, cell) in header.iter().enumerate() {
            let cell_trimmed = cell.trim();
            if cell_trimmed.is_empty() {
                continue;
            }

            if allow_spec_columns {
                if let Some(key) = cell_trimmed.strip_prefix(SPEC_COLUMN_PREFIX) {
                    let key = key.trim();
                    if !key.is_empty() {
                        index.spec_columns.push((pos, key.to_string()));
                        continue;
                    }
                }
            }

            let matched = specs.iter().find(|spec| {
                spec.aliases
                    .iter()
                    .any(|alias| alias.eq_ignore_ascii_case(cell_trimmed))
            });
            match matched {
                // 同名列以首次出现为准
                Some(spec) if !index.by_canonical.contains_key(spec.canonical) => {
                    index.by_canonical.insert(spec.canonical, pos);
                }
                Some(_) => {}
                None => index.unknown_columns.push(cell_trimmed.to_string()),
            }
        }
        index
    }

    /// 取某规范列的单元格原始文本
    pub fn cell<'a>(&self, row: &'a [String], canonical: &str) -> Option<&'a str> {
        self.by_canonical
            .get(canonical)
            .and_then(|pos| row.get(*pos))
            .map(|s| s.as_str())
    }

    /// 规范列是否出现在表头中
    pub fn has(&self, canonical: &str) -> bool {
        self.by_canonical.contains_key(canonical)
    }
}
