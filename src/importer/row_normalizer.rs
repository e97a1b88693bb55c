// ==========================================
// 商品目录批量导入系统 - 行规范化器
// ==========================================
// 职责: 原始工作簿 → 类型化行记录
// - 空值哨兵规范化(全列统一,无列级例外)
// - 列别名映射(规范名为首别名)
// - 同 slug 连续商品行合并
// - 同商品重名型号消歧
// ==========================================

use crate::domain::import::{NormalizationStats, ProductRow, VariantRow};
use crate::importer::columns::{
    ColumnIndex, PRODUCT_COLUMNS, SHEET_PRODUCTS, SHEET_VARIANTS, VARIANT_COLUMNS,
};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::workbook::Workbook;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// 空值哨兵集(裁剪后大小写不敏感比较;命中即视为缺失)
/// 对每一列无条件生效 —— 这是覆盖全部单元格的全函数,没有列级例外
pub const EMPTY_SENTINELS: &[&str] = &[
    "", "-", "–", "—", "n/a", "null", "none", "nan", "undefined",
];

/// 单元格是否为空值哨兵
pub fn is_empty_sentinel(trimmed: &str) -> bool {
    let lowered = trimmed.to_lowercase();
    EMPTY_SENTINELS.iter().any(|s| *s == lowered)
}

/// 规范化单元格: 哨兵 → 缺失
///
/// # 返回
/// - (规范值, 是否发生了非平凡替换) —— 纯空白不计为替换,"-"/"N/A" 等计入
fn normalize_cell(raw: &str) -> (Option<String>, bool) {
    let trimmed = raw.trim();
    if is_empty_sentinel(trimmed) {
        (None, !trimmed.is_empty())
    } else {
        (Some(trimmed.to_string()), false)
    }
}

// ==========================================
// NormalizedInput - 规范化结果
// ==========================================
#[derive(Debug, Default)]
pub struct NormalizedInput {
    pub products: Vec<ProductRow>,
    pub variants: Vec<VariantRow>,
    pub stats: NormalizationStats,
    /// 合并时发现的同键不同值冲突(保留首值): (行号, 模板列名, 被放弃的值)
    pub merge_conflicts: Vec<(usize, String, String)>,
    /// 未识别的表头列: (表名, 列名)
    pub unknown_columns: Vec<(String, String)>,
    /// 规范化前的非空数据行数(合并会减少记录数,总行数以此为准)
    pub raw_product_row_count: usize,
    pub raw_variant_row_count: usize,
}

// ==========================================
// RowNormalizer
// ==========================================
pub struct RowNormalizer;

impl RowNormalizer {
    /// 规范化双表工作簿
    ///
    /// # 错误
    /// - 缺少 Products/Variants 表或必需列时报作业级错误(不创建作业)
    pub fn normalize(&self, workbook: &Workbook) -> ImportResult<NormalizedInput> {
        let products_sheet = workbook.require_sheet(SHEET_PRODUCTS)?;
        let variants_sheet = workbook.require_sheet(SHEET_VARIANTS)?;

        let mut input = NormalizedInput::default();

        // === Products 表 ===
        let header = products_sheet
            .header()
            .ok_or_else(|| ImportError::WorkbookUnreadable("Products 表无表头".to_string()))?;
        let index = ColumnIndex::build(header, PRODUCT_COLUMNS, false);
        for spec in PRODUCT_COLUMNS {
            if !index.has(spec.canonical) {
                return Err(ImportError::ColumnMissing {
                    sheet: SHEET_PRODUCTS.to_string(),
                    column: spec.canonical.to_string(),
                });
            }
        }
        for col in &index.unknown_columns {
            input
                .unknown_columns
                .push((SHEET_PRODUCTS.to_string(), col.clone()));
        }

        for (row_number, cells) in products_sheet.data_rows() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue; // 跳过完全空白的行
            }
            input.raw_product_row_count += 1;

            let mut take = |canonical: &str| -> Option<String> {
                let raw = index.cell(cells, canonical).unwrap_or("");
                let (value, substituted) = normalize_cell(raw);
                if substituted {
                    input.stats.empty_sentinels_normalized += 1;
                }
                value
            };

            let row = ProductRow {
                brand_ref: take("Brand"),
                category_ref: take("Category"),
                series_ref: take("Series"),
                name: take("Product Name"),
                slug: take("Product Slug"),
                title_primary: take("Title (primary)"),
                title_secondary: take("Title (secondary)"),
                status: take("Status"),
                is_featured: take("Is Featured"),
                long_description: take("Long Description"),
                general_features: take("General Features"),
                short_specs: take("Short Specs"),
                taxonomy_tags: take("Taxonomy"),
                row_number,
                merged_rows: Vec::new(),
            };

            self.push_or_merge_product(&mut input, row);
        }

        // === Variants 表 ===
        let header = variants_sheet
            .header()
            .ok_or_else(|| ImportError::WorkbookUnreadable("Variants 表无表头".to_string()))?;
        let index = ColumnIndex::build(header, VARIANT_COLUMNS, true);
        for spec in VARIANT_COLUMNS {
            if !index.has(spec.canonical) {
                return Err(ImportError::ColumnMissing {
                    sheet: SHEET_VARIANTS.to_string(),
                    column: spec.canonical.to_string(),
                });
            }
        }
        for col in &index.unknown_columns {
            input
                .unknown_columns
                .push((SHEET_VARIANTS.to_string(), col.clone()));
        }

        for (row_number, cells) in variants_sheet.data_rows() {
            if cells.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            input.raw_variant_row_count += 1;

            let mut take = |canonical: &str| -> Option<String> {
                let raw = index.cell(cells, canonical).unwrap_or("");
                let (value, substituted) = normalize_cell(raw);
                if substituted {
                    input.stats.empty_sentinels_normalized += 1;
                }
                value
            };

            let mut row = VariantRow {
                product_slug: take("Product Slug"),
                model_code: take("Model Code"),
                name_primary: take("Variant Name (primary)"),
                name_secondary: take("Variant Name (secondary)"),
                sku: take("SKU"),
                dimensions: take("Dimensions"),
                weight: take("Weight"),
                list_price: take("List Price"),
                stock_qty: take("Stock Qty"),
                specs: BTreeMap::new(),
                row_number,
            };

            // 开放的 Spec:<key> 列(同键重复时首列为准)
            for (pos, key) in &index.spec_columns {
                let raw = cells.get(*pos).map(|s| s.as_str()).unwrap_or("");
                let (value, substituted) = normalize_cell(raw);
                if substituted {
                    input.stats.empty_sentinels_normalized += 1;
                }
                if let Some(value) = value {
                    row.specs.entry(key.clone()).or_insert(value);
                }
            }

            input.variants.push(row);
        }

        self.disambiguate_variant_names(&mut input);

        debug!(
            products = input.products.len(),
            variants = input.variants.len(),
            sentinels = input.stats.empty_sentinels_normalized,
            merged = input.stats.merged_product_rows,
            "行规范化完成"
        );
        Ok(input)
    }

    /// 同 slug 连续商品行合并: 后行仅填补前行缺失字段,同键不同值记冲突并保留首值
    fn push_or_merge_product(&self, input: &mut NormalizedInput, row: ProductRow) {
        let same_slug_as_last = match (input.products.last(), &row.slug) {
            (Some(prev), Some(slug)) => prev.slug.as_deref() == Some(slug.as_str()),
            _ => false,
        };
        if !same_slug_as_last {
            input.products.push(row);
            return;
        }

        let row_number = row.row_number;
        input.stats.merged_product_rows += 1;
        let mut conflicts: Vec<(usize, String, String)> = Vec::new();
        let prev = input.products.last_mut().expect("上一行已存在");
        prev.merged_rows.push(row_number);

        let mut merge_field = |column: &str,
                               target: &mut Option<String>,
                               incoming: Option<String>| {
            if let Some(value) = incoming {
                match target {
                    None => *target = Some(value),
                    Some(kept) if *kept != value => {
                        conflicts.push((row_number, column.to_string(), value));
                    }
                    Some(_) => {}
                }
            }
        };

        merge_field("Brand", &mut prev.brand_ref, row.brand_ref);
        merge_field("Category", &mut prev.category_ref, row.category_ref);
        merge_field("Series", &mut prev.series_ref, row.series_ref);
        merge_field("Product Name", &mut prev.name, row.name);
        merge_field("Title (primary)", &mut prev.title_primary, row.title_primary);
        merge_field(
            "Title (secondary)",
            &mut prev.title_secondary,
            row.title_secondary,
        );
        merge_field("Status", &mut prev.status, row.status);
        merge_field("Is Featured", &mut prev.is_featured, row.is_featured);
        merge_field(
            "Long Description",
            &mut prev.long_description,
            row.long_description,
        );
        merge_field(
            "General Features",
            &mut prev.general_features,
            row.general_features,
        );
        merge_field("Short Specs", &mut prev.short_specs, row.short_specs);
        merge_field("Taxonomy", &mut prev.taxonomy_tags, row.taxonomy_tags);

        input.merge_conflicts.extend(conflicts);
    }

    /// 同商品下重名型号消歧: 第二次出现起追加 " (2)"、" (3)" …
    fn disambiguate_variant_names(&self, input: &mut NormalizedInput) {
        let mut seen: HashMap<(String, String), usize> = HashMap::new();
        for row in &mut input.variants {
            let (Some(product_slug), Some(name)) = (row.product_slug.clone(), row.name_primary.clone())
            else {
                continue; // 缺省显示名走提交阶段的父标题回填,不参与消歧
            };
            let count = seen.entry((product_slug, name.clone())).or_insert(0);
            *count += 1;
            if *count > 1 {
                row.name_primary = Some(format!("{} ({})", name, count));
                input.stats.renamed_duplicate_names += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::workbook::Sheet;

    fn product_header() -> Vec<String> {
        PRODUCT_COLUMNS
            .iter()
            .map(|c| c.canonical.to_string())
            .collect()
    }

    fn variant_header(extra: &[&str]) -> Vec<String> {
        VARIANT_COLUMNS
            .iter()
            .map(|c| c.canonical.to_string())
            .chain(extra.iter().map(|s| s.to_string()))
            .collect()
    }

    fn product_row(cells: [&str; 13]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn workbook_with(products: Vec<Vec<String>>, variants: Vec<Vec<String>>) -> Workbook {
        let mut wb = Workbook::new();
        let mut sheet = Sheet::new(SHEET_PRODUCTS);
        sheet.rows = products;
        wb.push_sheet(sheet);
        let mut sheet = Sheet::new(SHEET_VARIANTS);
        sheet.rows = variants;
        wb.push_sheet(sheet);
        wb
    }

    #[test]
    fn test_empty_sentinels_normalized_for_every_column() {
        // 每个哨兵值在任意列都归一为缺失
        for sentinel in ["", "-", "N/A", "null", "NaN", "–", "—", "NONE", "Undefined"] {
            let wb = workbook_with(
                vec![
                    product_header(),
                    product_row([
                        sentinel, sentinel, sentinel, sentinel, sentinel, sentinel, sentinel,
                        sentinel, sentinel, sentinel, sentinel, sentinel, "x",
                    ]),
                ],
                vec![variant_header(&[])],
            );
            let input = RowNormalizer.normalize(&wb).unwrap();
            let row = &input.products[0];
            assert_eq!(row.brand_ref, None, "哨兵 {:?} 未归一", sentinel);
            assert_eq!(row.slug, None);
            assert_eq!(row.short_specs, None);
            assert_eq!(row.taxonomy_tags, Some("x".to_string()));
        }
    }

    #[test]
    fn test_sentinel_substitution_counted() {
        let wb = workbook_with(
            vec![
                product_header(),
                product_row([
                    "acme", "tools", "basic", "Drill", "drill", "Drill X", "-", "N/A", "", "",
                    "", "", "",
                ]),
            ],
            vec![variant_header(&[])],
        );
        let input = RowNormalizer.normalize(&wb).unwrap();
        // 仅 "-" 与 "N/A" 计为替换,纯空白不计
        assert_eq!(input.stats.empty_sentinels_normalized, 2);
    }

    #[test]
    fn test_consecutive_same_slug_rows_merged() {
        let wb = workbook_with(
            vec![
                product_header(),
                product_row([
                    "acme", "tools", "basic", "Drill", "drill", "Drill X", "", "active", "", "",
                    "", "", "",
                ]),
                product_row([
                    "", "", "", "", "drill", "", "Drill X 副", "discontinued", "", "", "", "",
                    "",
                ]),
            ],
            vec![variant_header(&[])],
        );
        let input = RowNormalizer.normalize(&wb).unwrap();

        assert_eq!(input.products.len(), 1);
        assert_eq!(input.raw_product_row_count, 2);
        assert_eq!(input.stats.merged_product_rows, 1);
        let row = &input.products[0];
        // 缺失字段被后行填补
        assert_eq!(row.title_secondary, Some("Drill X 副".to_string()));
        // 同键不同值保留首值,记录冲突
        assert_eq!(row.status, Some("active".to_string()));
        assert_eq!(input.merge_conflicts.len(), 1);
        assert_eq!(input.merge_conflicts[0].1, "Status");
        assert_eq!(row.merged_rows, vec![2]);
    }

    #[test]
    fn test_variant_spec_columns_collected() {
        let mut variant_row: Vec<String> = vec![
            "drill", "DX-1", "", "", "SKU1", "", "", "", "",
        ]
        .into_iter()
        .map(|s| s.to_string())
        .collect();
        variant_row.push("red".to_string());
        variant_row.push("-".to_string()); // 哨兵 → 规格缺失

        let wb = workbook_with(
            vec![product_header()],
            vec![variant_header(&["Spec:Color", "Spec:Voltage"]), variant_row],
        );
        let input = RowNormalizer.normalize(&wb).unwrap();
        let variant = &input.variants[0];

        assert_eq!(variant.specs.get("Color"), Some(&"red".to_string()));
        assert!(!variant.specs.contains_key("Voltage"));
        assert_eq!(variant.name_primary, None);
    }

    #[test]
    fn test_duplicate_variant_names_disambiguated() {
        let make_row = |code: &str| -> Vec<String> {
            vec!["drill", code, "标准版", "", "", "", "", "", ""]
                .into_iter()
                .map(|s| s.to_string())
                .collect()
        };
        let wb = workbook_with(
            vec![product_header()],
            vec![variant_header(&[]), make_row("DX-1"), make_row("DX-2"), make_row("DX-3")],
        );
        let input = RowNormalizer.normalize(&wb).unwrap();

        assert_eq!(input.variants[0].name_primary, Some("标准版".to_string()));
        assert_eq!(input.variants[1].name_primary, Some("标准版 (2)".to_string()));
        assert_eq!(input.variants[2].name_primary, Some("标准版 (3)".to_string()));
        assert_eq!(input.stats.renamed_duplicate_names, 2);
    }

    #[test]
    fn test_missing_required_column_is_job_level_error() {
        let mut header = product_header();
        header.remove(0); // 去掉 Brand 列
        let wb = workbook_with(vec![header], vec![variant_header(&[])]);
        let err = RowNormalizer.normalize(&wb).unwrap_err();
        assert!(matches!(err, ImportError::ColumnMissing { .. }));
    }
}
