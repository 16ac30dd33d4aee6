//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和运行调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 单次运行
//! - 持有所有客户端（arXiv / LLM / Slack）
//! - 检索 → 翻译 → 保存 → 通知
//! - 输出本次运行的统计信息
//!
//! ### `batch_processor` - 批量翻译处理器
//! - 严格串行地翻译一批论文（Vec<Paper>）
//! - 每篇之后等待固定间隔，控制请求频率
//!
//! ### `scheduler` - 每日调度器
//! - 每天在配置的时刻触发一次 `App::run_once`
//! - 记录最后运行日期，响应停止信号
//!
//! ## 层次关系
//!
//! ```text
//! scheduler (每天一次)
//!     ↓
//! app (一次运行)
//!     ↓
//! batch_processor (处理 Vec<Paper>)
//!     ↓
//! workflow::TranslationFlow (处理单个 Paper，含重试)
//!     ↓
//! services (能力层：translator / report_writer)
//!     ↓
//! clients (基础设施：arXiv / LLM / Slack)
//! ```

pub mod app;
pub mod batch_processor;
pub mod scheduler;

// 重新导出主要类型
pub use app::{App, RunOutcome};
pub use batch_processor::{BatchProcessor, BatchStats};
pub use scheduler::{DailyScheduler, LastRunStore, SchedulerState};
