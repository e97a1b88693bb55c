// ==========================================
// 商品目录批量导入系统 - 类目路径解析
// ==========================================
// 职责: 类目层级路径的解析与 slug 化
// 规则:
// - 分隔符 "/" 或 ">",同一路径内混用无效
// - 每段裁剪空白后 slug 化(拉丁变音符折叠,唯一性保持)
// - 最大 3 级;第 4 级是硬解析错误,与导入模式无关
// ==========================================

use crate::domain::catalog::MAX_CATEGORY_DEPTH;
use thiserror::Error;

// ==========================================
// TaxonomyParseError - 路径解析错误
// ==========================================
// 校验引擎将其转为 ERROR 级 Issue(两种模式下都阻断)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyParseError {
    #[error("路径混用分隔符 '/' 与 '>': {path}")]
    MixedDelimiters { path: String },

    #[error("路径超过最大层级 {max}: {path}({depth} 级)")]
    TooDeep {
        path: String,
        depth: usize,
        max: usize,
    },

    #[error("路径含空段: {path}")]
    EmptySegment { path: String },
}

impl TaxonomyParseError {
    /// 报告用问题码
    pub fn issue_code(&self) -> &'static str {
        match self {
            TaxonomyParseError::MixedDelimiters { .. } => "taxonomy_mixed_delimiters",
            TaxonomyParseError::TooDeep { .. } => "taxonomy_path_too_deep",
            TaxonomyParseError::EmptySegment { .. } => "taxonomy_empty_segment",
        }
    }
}

// ==========================================
// PathSegment - 路径段
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    pub name: String, // 裁剪后的原始文本(建议显示名)
    pub slug: String, // slug 化结果(解析键)
}

/// slug 化: 小写、拉丁变音符折叠、字母数字之外归并为 "-"
///
/// 非拉丁字母(如中文)原样保留 —— 任何保持唯一性的归一策略均可,
/// 此处选择不丢弃信息的保守折叠
pub fn slugify(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut buf = [0u8; 4];
    let mut last_dash = true; // 抑制首部 "-"
    for ch in raw.trim().chars() {
        let folded = fold_or_self(ch, &mut buf);
        for ch in folded.chars() {
            for lowered in ch.to_lowercase() {
                if lowered.is_alphanumeric() {
                    out.push(lowered);
                    last_dash = false;
                } else if !last_dash {
                    out.push('-');
                    last_dash = true;
                }
            }
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

/// 常见拉丁变音符折叠表(覆盖目录数据中出现的西欧字符)
fn fold_diacritic(ch: char) -> &'static str {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ñ' | 'Ñ' => "n",
        'ç' | 'Ç' => "c",
        'ß' => "ss",
        'æ' | 'Æ' => "ae",
        'ø' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        _ => {
            // 非变音符字符走原字符路径;这里返回空串占位,由调用方回退
            ""
        }
    }
}

// fold_diacritic 返回空串表示"无折叠",slugify 中需要原字符 —— 包一层
fn fold_or_self(ch: char, buf: &mut [u8; 4]) -> &str {
    let folded = fold_diacritic(ch);
    if folded.is_empty() {
        ch.encode_utf8(buf)
    } else {
        folded
    }
}

/// 解析类目路径为有序段列表
///
/// # 参数
/// - raw: 原始路径文本(如 "Tools / Power Tools" 或 "Tools>Power Tools")
///
/// # 返回
/// - Ok(Vec<PathSegment>): 1..=MAX_CATEGORY_DEPTH 个段,父级在前
/// - Err: 混用分隔符 / 超深 / 空段
pub fn parse_category_path(raw: &str) -> Result<Vec<PathSegment>, TaxonomyParseError> {
    let trimmed = raw.trim();
    let has_slash = trimmed.contains('/');
    let has_arrow = trimmed.contains('>');

    if has_slash && has_arrow {
        return Err(TaxonomyParseError::MixedDelimiters {
            path: trimmed.to_string(),
        });
    }

    let delimiter = if has_arrow { '>' } else { '/' };
    let segments: Vec<&str> = trimmed.split(delimiter).map(|s| s.trim()).collect();

    if segments.len() > MAX_CATEGORY_DEPTH {
        return Err(TaxonomyParseError::TooDeep {
            path: trimmed.to_string(),
            depth: segments.len(),
            max: MAX_CATEGORY_DEPTH,
        });
    }

    let mut out = Vec::with_capacity(segments.len());
    for segment in segments {
        let slug = slugify(segment);
        if slug.is_empty() {
            return Err(TaxonomyParseError::EmptySegment {
                path: trimmed.to_string(),
            });
        }
        out.push(PathSegment {
            name: segment.to_string(),
            slug,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Power Tools"), "power-tools");
        assert_eq!(slugify("  Tools & Hardware  "), "tools-hardware");
        assert_eq!(slugify("A--B"), "a-b");
    }

    #[test]
    fn test_slugify_diacritics_folded() {
        assert_eq!(slugify("Électroménager"), "electromenager");
        assert_eq!(slugify("Größe"), "grosse");
        assert_eq!(slugify("Señor Café"), "senor-cafe");
    }

    #[test]
    fn test_slugify_preserves_non_latin() {
        // 非拉丁字母保留,保证唯一性不丢失
        assert_eq!(slugify("电动工具"), "电动工具");
        assert_eq!(slugify("电动 工具"), "电动-工具");
    }

    #[test]
    fn test_parse_path_slash_and_arrow() {
        let path = parse_category_path("Tools / Power Tools").unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].slug, "tools");
        assert_eq!(path[1].slug, "power-tools");
        assert_eq!(path[1].name, "Power Tools");

        let path = parse_category_path("Tools>Power Tools>Drills").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[2].slug, "drills");
    }

    #[test]
    fn test_parse_path_mixed_delimiters_rejected() {
        let err = parse_category_path("Tools/Power Tools>Drills").unwrap_err();
        assert!(matches!(err, TaxonomyParseError::MixedDelimiters { .. }));
        assert_eq!(err.issue_code(), "taxonomy_mixed_delimiters");
    }

    #[test]
    fn test_parse_path_depth_bound() {
        // 3 级是上限,第 4 级硬错误
        assert!(parse_category_path("a/b/c").is_ok());
        let err = parse_category_path("a/b/c/d").unwrap_err();
        assert!(matches!(err, TaxonomyParseError::TooDeep { depth: 4, .. }));
    }

    #[test]
    fn test_parse_path_empty_segment() {
        let err = parse_category_path("a//b").unwrap_err();
        assert!(matches!(err, TaxonomyParseError::EmptySegment { .. }));
    }
}
