// ==========================================
// 商品目录批量导入系统 - 工作簿模型与编解码
// ==========================================
// 职责: 多表格文档的内存模型 + 字节编解码接口
// 红线: 编解码是外部协作方,流水线只依赖 SheetCodec 接口;
//       参考实现: xlsx 读取(calamine)、CSV 工作簿束读写(csv)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use std::io::Cursor;

/// CSV 工作簿束的分表标记行(标记行之后到下一标记为该表的 CSV 内容)
pub const SHEET_MARKER_PREFIX: &str = "#sheet:";

// ==========================================
// Sheet - 单个工作表
// ==========================================
// rows[0] 为表头;单元格保存裁剪后的原始文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    /// 表头行
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// 数据行(跳过表头),带 1-based 行号(相对表头)
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &Vec<String>)> {
        self.rows
            .iter()
            .skip(1)
            .enumerate()
            .map(|(idx, row)| (idx + 1, row))
    }
}

// ==========================================
// Workbook - 多表工作簿
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按名称查表(大小写敏感,模板列约定为准)
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// 按名称查表,缺失时报作业级错误
    pub fn require_sheet(&self, name: &str) -> ImportResult<&Sheet> {
        self.sheet(name)
            .ok_or_else(|| ImportError::SheetMissing(name.to_string()))
    }

    pub fn push_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }
}

// ==========================================
// SheetCodec Trait - 编解码接口
// ==========================================
// 用途: 字节 ↔ 工作簿;实现方可替换(xlsx/CSV 束/外部服务)
pub trait SheetCodec: Send + Sync {
    /// 解码字节为工作簿
    fn read(&self, bytes: &[u8]) -> ImportResult<Workbook>;

    /// 编码工作簿为字节
    fn write(&self, workbook: &Workbook) -> ImportResult<Vec<u8>>;
}

// ==========================================
// XlsxSheetReader - Excel 读取实现(只读)
// ==========================================
pub struct XlsxSheetReader;

impl SheetCodec for XlsxSheetReader {
    fn read(&self, bytes: &[u8]) -> ImportResult<Workbook> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut xlsx: Xlsx<_> = open_workbook_from_rs(cursor)
            .map_err(|e: calamine::XlsxError| ImportError::WorkbookUnreadable(e.to_string()))?;

        let sheet_names = xlsx.sheet_names().to_owned();
        if sheet_names.is_empty() {
            return Err(ImportError::WorkbookUnreadable(
                "Excel 文件无工作表".to_string(),
            ));
        }

        let mut workbook = Workbook::new();
        for sheet_name in sheet_names {
            let range = xlsx
                .worksheet_range(&sheet_name)
                .map_err(|e| ImportError::WorkbookUnreadable(e.to_string()))?;

            let mut sheet = Sheet::new(sheet_name);
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| cell.to_string().trim().to_string())
                    .collect();
                sheet.rows.push(cells);
            }
            workbook.push_sheet(sheet);
        }
        Ok(workbook)
    }

    fn write(&self, _workbook: &Workbook) -> ImportResult<Vec<u8>> {
        // Excel 写出不在参考实现范围内,报告走 CSV 工作簿束
        Err(ImportError::UnsupportedFormat(
            "xlsx 写出未实现".to_string(),
        ))
    }
}

// ==========================================
// CsvBundleCodec - CSV 工作簿束读写实现
// ==========================================
// 格式: 每表以 "#sheet:<名称>" 标记行开始,随后为该表 CSV 内容
pub struct CsvBundleCodec;

impl SheetCodec for CsvBundleCodec {
    fn read(&self, bytes: &[u8]) -> ImportResult<Workbook> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| ImportError::WorkbookUnreadable(format!("非 UTF-8 内容: {}", e)))?;

        let mut workbook = Workbook::new();
        let mut current: Option<(String, String)> = None; // (表名, 累积 CSV 文本)

        let flush = |current: &mut Option<(String, String)>,
                     workbook: &mut Workbook|
         -> ImportResult<()> {
            if let Some((name, csv_text)) = current.take() {
                let mut sheet = Sheet::new(name);
                let mut reader = csv::ReaderBuilder::new()
                    .has_headers(false)
                    .flexible(true) // 允许行长度不一致(开放的 Spec:* 列)
                    .from_reader(csv_text.as_bytes());
                for record in reader.records() {
                    let record = record?;
                    let cells: Vec<String> =
                        record.iter().map(|v| v.trim().to_string()).collect();
                    sheet.rows.push(cells);
                }
                workbook.push_sheet(sheet);
            }
            Ok(())
        };

        for line in text.lines() {
            if let Some(name) = line.strip_prefix(SHEET_MARKER_PREFIX) {
                flush(&mut current, &mut workbook)?;
                current = Some((name.trim().to_string(), String::new()));
            } else if let Some((_, buf)) = current.as_mut() {
                buf.push_str(line);
                buf.push('\n');
            } else if !line.trim().is_empty() {
                return Err(ImportError::WorkbookUnreadable(format!(
                    "CSV 工作簿束须以 {} 标记开始,遇到: {}",
                    SHEET_MARKER_PREFIX, line
                )));
            }
        }
        flush(&mut current, &mut workbook)?;

        if workbook.sheets.is_empty() {
            return Err(ImportError::WorkbookUnreadable(
                "CSV 工作簿束无工作表".to_string(),
            ));
        }
        Ok(workbook)
    }

    fn write(&self, workbook: &Workbook) -> ImportResult<Vec<u8>> {
        let mut out = Vec::new();
        for sheet in &workbook.sheets {
            out.extend_from_slice(
                format!("{}{}\n", SHEET_MARKER_PREFIX, sheet.name).as_bytes(),
            );
            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_writer(Vec::new());
            for row in &sheet.rows {
                writer.write_record(row)?;
            }
            let csv_bytes = writer
                .into_inner()
                .map_err(|e| ImportError::Internal(e.to_string()))?;
            out.extend_from_slice(&csv_bytes);
        }
        Ok(out)
    }
}

/// 按字节特征自动选择编解码实现(xlsx 魔数 → calamine,否则 CSV 工作簿束)
pub fn detect_codec(bytes: &[u8]) -> Box<dyn SheetCodec> {
    if bytes.starts_with(b"PK\x03\x04") {
        Box::new(XlsxSheetReader)
    } else {
        Box::new(CsvBundleCodec)
    }
}

/// 解码入口: 自动检测格式并读取
pub fn read_workbook(bytes: &[u8]) -> ImportResult<Workbook> {
    detect_codec(bytes).read(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_workbook() -> Workbook {
        let mut wb = Workbook::new();
        let mut products = Sheet::new("Products");
        products.rows.push(vec!["Brand".to_string(), "Category".to_string()]);
        products.rows.push(vec!["Acme".to_string(), "Tools".to_string()]);
        wb.push_sheet(products);
        let mut variants = Sheet::new("Variants");
        variants
            .rows
            .push(vec!["Product Slug".to_string(), "Model Code".to_string()]);
        wb.push_sheet(variants);
        wb
    }

    #[test]
    fn test_csv_bundle_roundtrip() {
        let codec = CsvBundleCodec;
        let wb = sample_workbook();
        let bytes = codec.write(&wb).unwrap();
        let decoded = codec.read(&bytes).unwrap();

        assert_eq!(decoded.sheets.len(), 2);
        assert_eq!(decoded.sheet("Products").unwrap().rows[1][0], "Acme");
        assert_eq!(
            decoded.sheet("Variants").unwrap().header().unwrap()[1],
            "Model Code"
        );
    }

    #[test]
    fn test_csv_bundle_rejects_unmarked_content() {
        let codec = CsvBundleCodec;
        let result = codec.read(b"a,b,c\n1,2,3\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_require_sheet_missing() {
        let wb = sample_workbook();
        assert!(wb.require_sheet("Products").is_ok());
        let err = wb.require_sheet("Reference").unwrap_err();
        assert!(matches!(err, ImportError::SheetMissing(_)));
    }

    #[test]
    fn test_detect_codec_falls_back_to_csv() {
        // 非 PK 魔数走 CSV 工作簿束
        let bytes = b"#sheet:Products\nBrand\n";
        let wb = read_workbook(bytes).unwrap();
        assert_eq!(wb.sheets.len(), 1);
    }

    #[test]
    fn test_data_rows_are_header_relative() {
        let wb = sample_workbook();
        let products = wb.sheet("Products").unwrap();
        let rows: Vec<(usize, &Vec<String>)> = products.data_rows().collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, 1); // 表头下一行 = 1
    }
}
