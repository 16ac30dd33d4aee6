use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 一篇 arXiv 论文的元数据及其翻译结果
///
/// 由论文来源创建后即视为不可变快照。翻译流程不会原地修改它，
/// 而是通过 [`Paper::with_translation`] / [`Paper::translation_failed`] 生成新的记录。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// arXiv ID（保留版本后缀，例如 `2401.01234v1`）
    pub id: String,
    pub title: String,
    /// 原文摘要
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    /// 发布日期，序列化为 `YYYY-MM-DD`
    pub published: NaiveDate,
    pub categories: Vec<String>,
    /// 翻译后的摘要；空字符串表示尚未翻译或翻译失败
    #[serde(default)]
    pub translated_abstract: String,
}

impl Paper {
    /// 返回带有翻译结果的新记录
    pub fn with_translation(&self, translated: impl Into<String>) -> Self {
        Self {
            translated_abstract: translated.into(),
            ..self.clone()
        }
    }

    /// 返回标记为翻译失败（空字符串）的新记录
    pub fn translation_failed(&self) -> Self {
        self.with_translation(String::new())
    }

    /// 是否已成功翻译
    pub fn is_translated(&self) -> bool {
        !self.translated_abstract.is_empty()
    }
}
