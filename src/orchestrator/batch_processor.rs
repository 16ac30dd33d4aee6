//! 批量翻译处理器 - 编排层
//!
//! ## 职责
//!
//! 按顺序翻译一批论文，并在每篇之后等待固定间隔，使请求频率
//! 保持在 LLM 服务的每分钟上限之内。
//!
//! ## 设计特点
//!
//! - **严格串行**：同一时刻最多只有一个翻译请求
//! - **固定间隔**：每篇论文（包括最后一篇）之后都等待 `request_delay`
//! - **顺序保持**：输出与输入一一对应，顺序相同
//! - **向下委托**：单篇论文的重试交给 `workflow::TranslationFlow`

use std::time::Duration;

use tracing::info;

use crate::models::Paper;
use crate::services::Translate;
use crate::utils::logging::{log_batch_complete, log_batch_start, truncate_text};
use crate::workflow::TranslationFlow;

/// 批量处理统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
}

impl BatchStats {
    pub fn from_results(papers: &[Paper]) -> Self {
        let success = papers.iter().filter(|p| p.is_translated()).count();
        Self {
            success,
            failed: papers.len() - success,
            total: papers.len(),
        }
    }
}

/// 批量翻译处理器
pub struct BatchProcessor<T> {
    translator: T,
    flow: TranslationFlow,
    request_delay: Duration,
}

impl<T: Translate> BatchProcessor<T> {
    pub fn new(translator: T, flow: TranslationFlow, request_delay: Duration) -> Self {
        Self {
            translator,
            flow,
            request_delay,
        }
    }

    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// 依次翻译所有论文
    ///
    /// # 参数
    /// - `papers`: 待翻译的论文
    ///
    /// # 返回
    /// 返回与输入等长、顺序相同的新记录；失败的论文译文为空字符串
    pub async fn process(&self, papers: &[Paper]) -> Vec<Paper> {
        let total = papers.len();
        log_batch_start(total, self.request_delay);

        let mut translated = Vec::with_capacity(total);
        for (idx, paper) in papers.iter().enumerate() {
            info!(
                "[{}/{}] 🔄 {} | {}",
                idx + 1,
                total,
                paper.id,
                truncate_text(&paper.title, 60)
            );

            let result = self.flow.run(&self.translator, paper).await;
            if result.is_translated() {
                info!("[{}/{}] ✓ 翻译完成", idx + 1, total);
            }
            translated.push(result);

            tokio::time::sleep(self.request_delay).await;
        }

        log_batch_complete(&BatchStats::from_results(&translated));
        translated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// 标题为 "fail" 的论文返回不可重试错误，其余直接成功
    struct RecordingTranslator {
        calls: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl Translate for RecordingTranslator {
        async fn translate(&self, paper: &Paper) -> Result<Paper, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((paper.id.clone(), Instant::now()));
            if paper.title == "fail" {
                return Err(LlmError::malformed("test", "empty"));
            }
            Ok(paper.with_translation(format!("訳: {}", paper.title)))
        }
    }

    fn paper(id: &str, title: &str) -> Paper {
        Paper {
            id: id.to_string(),
            title: title.to_string(),
            abstract_text: "Abstract.".to_string(),
            authors: vec![],
            published: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            categories: vec![],
            translated_abstract: String::new(),
        }
    }

    fn processor() -> BatchProcessor<RecordingTranslator> {
        BatchProcessor::new(
            RecordingTranslator {
                calls: Mutex::new(Vec::new()),
            },
            TranslationFlow::default(),
            Duration::from_millis(4100),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_with_delay_after_every_record() {
        let processor = processor();
        let papers = vec![paper("a", "A"), paper("b", "B"), paper("c", "C")];
        let start = Instant::now();

        let result = processor.process(&papers).await;

        let ids: Vec<_> = result.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(result[1].translated_abstract, "訳: B");

        let calls = processor.translator().calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert_eq!(pair[1].1 - pair[0].1, Duration::from_millis(4100));
        }
        assert_eq!(start.elapsed(), Duration::from_millis(12300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_record_keeps_position() {
        let processor = processor();
        let papers = vec![paper("a", "A"), paper("b", "fail"), paper("c", "C")];

        let result = processor.process(&papers).await;

        assert_eq!(result.len(), 3);
        assert_eq!(result[1].id, "b");
        assert_eq!(result[1].translated_abstract, "");
        assert_eq!(
            BatchStats::from_results(&result),
            BatchStats {
                success: 2,
                failed: 1,
                total: 3
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_batch() {
        let processor = processor();
        let start = Instant::now();

        assert!(processor.process(&[]).await.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
