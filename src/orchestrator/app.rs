//! 单次运行 - 编排层
//!
//! 一次完整的每日运行：检索 → 翻译 → 保存报告 → 发送到 Slack。
//! 只有编排层持有所有客户端。

use chrono::{Local, NaiveDate};
use tracing::{error, info, warn};

use crate::clients::slack_client::report_title;
use crate::clients::{ArxivClient, SlackClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::models::Paper;
use crate::orchestrator::batch_processor::{BatchProcessor, BatchStats};
use crate::services::report_writer::{format_paper_listing, format_translated_listing};
use crate::services::{ReportFiles, ReportWriter, Translator};
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::{RetryPolicy, TranslationFlow};

/// 一次运行的结果
///
/// 运行中途失败时，已经完成的部分（翻译结果、统计）仍保留在这里。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// 检索到的论文数
    pub fetched: usize,
    /// 翻译后的论文（与检索顺序相同）
    pub translated: Vec<Paper>,
    pub stats: BatchStats,
    /// 写出的报告；没有论文或保存失败时为 `None`
    pub files: Option<ReportFiles>,
    /// 是否已发送到 Slack
    pub notified: bool,
}

/// 应用主结构
pub struct App {
    config: Config,
    arxiv: ArxivClient,
    processor: BatchProcessor<Translator>,
    writer: ReportWriter,
    slack: SlackClient,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        log_startup(&config);

        let translator = Translator::new(&config)?;
        info!(
            "✓ LLM 翻译服务已就绪: {} → {}",
            config.llm_model_name,
            translator.target_language()
        );
        let flow = TranslationFlow::new(RetryPolicy::from_config(&config));

        Ok(Self {
            arxiv: ArxivClient::new(&config),
            processor: BatchProcessor::new(translator, flow, config.request_delay),
            writer: ReportWriter::new(&config.output_dir),
            slack: SlackClient::new(&config),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 执行一次完整的运行
    pub async fn run_once(&self) -> AppResult<RunOutcome> {
        let today = Local::now().date_naive();

        // ========== 1. 检索论文 ==========
        let papers = self
            .arxiv
            .fetch_recent(
                &self.config.categories,
                self.config.days_back,
                self.config.max_results,
                today,
            )
            .await
            .map_err(|e| {
                error!("❌ arXiv 检索失败: {}", e);
                e
            })?;

        if papers.is_empty() {
            warn!("⚠️ 没有检索到论文，本次运行结束");
            return Ok(RunOutcome::default());
        }
        info!("✅ 从 arXiv 获取 {} 篇论文", papers.len());
        info!("\n{}", format_paper_listing(&papers, "检索到的论文", false));

        let mut outcome = RunOutcome::default();
        let result = self.process_papers(&papers, today, &mut outcome).await;
        print_final_stats(&outcome);
        result?;

        info!("🎉 全部处理完成！");
        Ok(outcome)
    }

    /// 翻译、保存并发送一批已检索的论文
    ///
    /// # 参数
    /// - `papers`: 检索到的论文
    /// - `today`: 用于 Slack 文件标题的日期
    /// - `outcome`: 记录每个阶段的结果；出错时保留已完成的部分
    pub async fn process_papers(
        &self,
        papers: &[Paper],
        today: NaiveDate,
        outcome: &mut RunOutcome,
    ) -> AppResult<()> {
        outcome.fetched = papers.len();

        // ========== 2. 翻译 ==========
        outcome.translated = self.processor.process(papers).await;
        outcome.stats = BatchStats::from_results(&outcome.translated);
        info!("\n{}", format_translated_listing(&outcome.translated));

        // ========== 3. 保存报告 ==========
        let files = self
            .writer
            .save_reports(&outcome.translated, Local::now().naive_local())
            .map_err(|e| {
                error!(
                    "❌ 保存报告失败，跳过 Slack 通知（{} 篇翻译结果仅保留在内存中）: {}",
                    outcome.translated.len(),
                    e
                );
                e
            })?;
        info!(
            "✅ 已保存: {}, {}",
            files.text.display(),
            files.json.display()
        );
        outcome.files = Some(files.clone());

        // ========== 4. 发送到 Slack ==========
        let title = report_title(&self.config.slack_title_prefix, today);
        self.slack
            .upload_file(
                &self.config.slack_channel_id,
                &files.text,
                &title,
                &self.config.slack_initial_comment,
            )
            .await
            .map_err(|e| {
                error!("❌ 发送到 Slack 失败（报告已保存在本地）: {}", e);
                e
            })?;
        outcome.notified = true;
        Ok(())
    }
}
