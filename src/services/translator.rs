//! 翻译服务 - 业务能力层
//!
//! 只负责"翻译一篇论文的摘要"，不关心重试和批量

use async_trait::async_trait;
use tracing::debug;

use crate::clients::LlmClient;
use crate::config::Config;
use crate::error::LlmError;
use crate::models::Paper;

/// 翻译能力
///
/// 重试流程只依赖这个 trait，测试中用假实现替换。
#[async_trait]
pub trait Translate: Send + Sync {
    /// 翻译单篇论文，成功时返回带有译文的新记录
    async fn translate(&self, paper: &Paper) -> Result<Paper, LlmError>;
}

/// 基于 LLM 的翻译服务
///
/// 职责：
/// - 构建提示词
/// - 调用一次 LLM
/// - 不重试、不等待
pub struct Translator {
    client: LlmClient,
    target_language: String,
}

impl Translator {
    /// 创建新的翻译服务
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        Ok(Self {
            client: LlmClient::new(config)?,
            target_language: config.target_language.clone(),
        })
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

#[async_trait]
impl Translate for Translator {
    async fn translate(&self, paper: &Paper) -> Result<Paper, LlmError> {
        check_input(paper)?;

        let prompt = build_prompt(&self.target_language, &paper.title, &paper.abstract_text);
        debug!("[{}] 发送翻译请求", paper.id);

        let text = self.client.generate(&prompt).await?;
        Ok(paper.with_translation(text))
    }
}

/// 构建翻译提示词
pub fn build_prompt(language: &str, title: &str, abstract_text: &str) -> String {
    format!(
        "Translate the following arXiv paper abstract into {language}.\n\n\
         Title: {title}\n\
         Abstract: {abstract_text}\n\n\
         === {language} translation ===\n"
    )
}

fn check_input(paper: &Paper) -> Result<(), LlmError> {
    let field = if paper.title.trim().is_empty() {
        "title"
    } else if paper.abstract_text.trim().is_empty() {
        "abstract"
    } else {
        return Ok(());
    };
    Err(LlmError::EmptyInput {
        id: paper.id.clone(),
        field,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn paper(title: &str, abstract_text: &str) -> Paper {
        Paper {
            id: "2405.00002v1".to_string(),
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            authors: vec!["Alice Example".to_string()],
            published: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            categories: vec!["cs.CL".to_string()],
            translated_abstract: String::new(),
        }
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt("Japanese", "A Title", "Some abstract.");
        assert_eq!(
            prompt,
            "Translate the following arXiv paper abstract into Japanese.\n\n\
             Title: A Title\nAbstract: Some abstract.\n\n\
             === Japanese translation ===\n"
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = check_input(&paper("  ", "abstract")).unwrap_err();
        assert!(matches!(err, LlmError::EmptyInput { field: "title", .. }));

        let err = check_input(&paper("title", "")).unwrap_err();
        assert!(matches!(err, LlmError::EmptyInput { field: "abstract", .. }));

        assert!(check_input(&paper("title", "abstract")).is_ok());
    }
}
