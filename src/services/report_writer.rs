//! 报告写入服务 - 业务能力层
//!
//! 只负责"把一批翻译结果写成文件"，以及生成控制台用的论文列表

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::FileError;
use crate::models::Paper;

/// 列表中摘要的最大显示长度
const LISTING_ABSTRACT_CHARS: usize = 200;

/// 一次运行写出的两个报告文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub text: PathBuf,
    pub json: PathBuf,
}

/// 报告写入服务
///
/// 职责：
/// - 创建输出目录
/// - 写入纯文本报告和 JSON 报告
/// - 不关心翻译是否成功（空译文照样写出）
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// 创建新的报告写入服务
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 写出 `arxiv_translated_{YYYYMMDD_HHMMSS}.txt` 和同名 `.json`
    ///
    /// # 参数
    /// - `papers`: 翻译后的论文（保持批次顺序）
    /// - `stamp`: 用于文件名的时间戳
    ///
    /// # 返回
    /// 返回两个文件的路径
    pub fn save_reports(
        &self,
        papers: &[Paper],
        stamp: NaiveDateTime,
    ) -> Result<ReportFiles, FileError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|e| FileError::CreateDirFailed {
            path: self.output_dir.clone(),
            source: e,
        })?;

        let base = format!("arxiv_translated_{}", stamp.format("%Y%m%d_%H%M%S"));
        let files = ReportFiles {
            text: self.output_dir.join(format!("{}.txt", base)),
            json: self.output_dir.join(format!("{}.json", base)),
        };

        save_text(papers, &files.text)?;
        save_json(papers, &files.json)?;
        Ok(files)
    }
}

/// 写入纯文本报告
pub fn save_text(papers: &[Paper], path: &Path) -> Result<(), FileError> {
    std::fs::write(path, render_text(papers)).map_err(|e| FileError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("已写入文本报告: {}", path.display());
    Ok(())
}

/// 写入 JSON 报告（缩进格式，非 ASCII 字符原样保留）
pub fn save_json(papers: &[Paper], path: &Path) -> Result<(), FileError> {
    let json = serde_json::to_string_pretty(papers).map_err(|e| FileError::JsonFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    std::fs::write(path, json).map_err(|e| FileError::WriteFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("已写入 JSON 报告: {}", path.display());
    Ok(())
}

/// 读取 JSON 报告
pub fn load_json(path: &Path) -> Result<Vec<Paper>, FileError> {
    let raw = std::fs::read_to_string(path).map_err(|e| FileError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&raw).map_err(|e| FileError::JsonFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// 纯文本报告内容
pub fn render_text(papers: &[Paper]) -> String {
    let separator = "-".repeat(40);
    papers
        .iter()
        .map(|p| format!("Title: {}\n{}\n{}\n", p.title, p.translated_abstract, separator))
        .collect()
}

/// 检索结果列表
///
/// # 参数
/// - `papers`: 论文列表
/// - `heading`: 标题
/// - `show_full_abstract`: 为 `false` 时摘要截断为 200 字符
pub fn format_paper_listing(papers: &[Paper], heading: &str, show_full_abstract: bool) -> String {
    let mut out = format!("{}\n{}\n{}\n", "=".repeat(80), heading, "=".repeat(80));
    for (idx, p) in papers.iter().enumerate() {
        let abstract_text = if show_full_abstract {
            p.abstract_text.clone()
        } else {
            truncate_abstract(&p.abstract_text)
        };
        out.push_str(&format!("[{}] {}\n", idx + 1, p.title));
        out.push_str(&format!("  作者: {}\n", p.authors.join(", ")));
        out.push_str(&format!("  发布日期: {}\n", p.published.format("%Y-%m-%d")));
        out.push_str(&format!("  摘要: {}\n\n", abstract_text));
    }
    out
}

/// 翻译结果列表
pub fn format_translated_listing(papers: &[Paper]) -> String {
    let mut out = format!("{}\n翻译结果\n{}\n", "=".repeat(80), "=".repeat(80));
    for (idx, p) in papers.iter().enumerate() {
        let translated = if p.is_translated() {
            p.translated_abstract.as_str()
        } else {
            "(翻译失败)"
        };
        out.push_str(&format!("[{}] {}\n{}\n\n", idx + 1, p.title, translated));
    }
    out
}

fn truncate_abstract(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= LISTING_ABSTRACT_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(LISTING_ABSTRACT_CHARS).collect();
    format!("{}…", head.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn paper(id: &str, title: &str, translated: &str) -> Paper {
        Paper {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: "An abstract.".to_string(),
            authors: vec!["Alice Example".to_string(), "Bob Example".to_string()],
            published: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            categories: vec!["cs.CL".to_string()],
            translated_abstract: translated.to_string(),
        }
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, 5)
            .unwrap()
    }

    #[test]
    fn test_render_text_format() {
        let papers = vec![paper("1", "First", "最初の要旨。"), paper("2", "Second", "")];
        let expected = format!(
            "Title: First\n最初の要旨。\n{sep}\nTitle: Second\n\n{sep}\n",
            sep = "-".repeat(40)
        );
        assert_eq!(render_text(&papers), expected);
    }

    #[test]
    fn test_save_reports_creates_dir_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("abs-ja"));
        let papers = vec![paper("2405.00002v1", "First", "日本語の要旨")];

        let files = writer.save_reports(&papers, stamp()).unwrap();

        assert_eq!(
            files.text.file_name().unwrap(),
            "arxiv_translated_20240501_090005.txt"
        );
        assert_eq!(
            files.json.file_name().unwrap(),
            "arxiv_translated_20240501_090005.json"
        );

        let json = std::fs::read_to_string(&files.json).unwrap();
        assert!(json.contains("日本語の要旨"), "非 ASCII 字符应原样保留");
        assert!(json.contains("\n  "), "JSON 应该是缩进格式");
        assert_eq!(load_json(&files.json).unwrap(), papers);
    }

    #[test]
    fn test_empty_batch_writes_empty_reports() {
        let dir = tempfile::tempdir().unwrap();
        let files = ReportWriter::new(dir.path()).save_reports(&[], stamp()).unwrap();

        assert_eq!(std::fs::read_to_string(&files.text).unwrap(), "");
        assert!(load_json(&files.json).unwrap().is_empty());
    }

    #[test]
    fn test_load_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_json(&dir.path().join("missing.json")),
            Err(FileError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_listing_truncates_abstract() {
        let mut long = paper("1", "Long", "");
        long.abstract_text = "a".repeat(250);

        let short = format_paper_listing(&[long.clone()], "检索结果", false);
        assert!(short.contains(&format!("{}…", "a".repeat(200))));
        assert!(!short.contains(&"a".repeat(201)));

        let full = format_paper_listing(&[long], "检索结果", true);
        assert!(full.contains(&"a".repeat(250)));
        assert!(full.contains("Alice Example, Bob Example"));
        assert!(full.contains("2024-05-01"));
    }

    #[test]
    fn test_translated_listing_marks_failures() {
        let listing = format_translated_listing(&[paper("1", "Ok", "訳"), paper("2", "Ng", "")]);
        assert!(listing.contains("[1] Ok\n訳"));
        assert!(listing.contains("[2] Ng\n(翻译失败)"));
    }
}
