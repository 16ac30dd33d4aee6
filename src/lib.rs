//! # arXiv Digest
//!
//! 每天检索 arXiv 的最新论文，用 LLM 翻译摘要，保存报告并发送到 Slack
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Clients）
//! - `clients/` - 每个客户端持有一个 HTTP 客户端，只说一种远程协议
//! - `ArxivClient` - 检索论文（Atom feed）
//! - `LlmClient` - 单次 Gemini 调用，不携带历史对话
//! - `SlackClient` - 上传报告文件
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单篇论文或一次写入
//! - `Translator` - 翻译能力（`Translate` trait）
//! - `ReportWriter` - 写报告能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇论文"的翻译流程
//! - `TranslationFlow` - 频率超限时指数退避重试，失败记为空译文
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 串行批量翻译，控制请求间隔
//! - `orchestrator/app` - 一次完整的运行
//! - `orchestrator/scheduler` - 每日调度
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::Paper;
pub use orchestrator::{App, BatchProcessor, DailyScheduler, RunOutcome};
pub use services::{Translate, Translator};
pub use workflow::{RetryPolicy, TranslationFlow};
