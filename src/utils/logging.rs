/// 日志工具模块
///
/// 提供日志初始化和格式化输出的辅助函数
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::batch_processor::BatchStats;
use crate::orchestrator::RunOutcome;

/// 初始化日志
///
/// 日志级别由 `RUST_LOG` 控制，默认为 `info`。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 已加载的配置
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🛰 arXiv → LLM 翻译系统启动");
    info!(
        "📚 分类: {} | 过去 {} 天 | 最多 {} 件",
        config.categories.join(", "),
        config.days_back,
        config.max_results
    );
    info!(
        "🤖 模型: {} | 目标语言: {}",
        config.llm_model_name, config.target_language
    );
    info!(
        "⏱ 请求间隔: {:?} | 最大尝试次数: {} | 初始退避: {:?}",
        config.request_delay, config.max_retries, config.initial_backoff
    );
    info!("📁 输出目录: {}", config.output_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 论文总数
/// - `delay`: 每篇之后的等待时间
pub fn log_batch_start(total: usize, delay: Duration) {
    info!("\n{}", "=".repeat(60));
    info!("🔄 开始翻译 {} 篇论文 (间隔 {:?})", total, delay);
    info!("{}", "=".repeat(60));
}

/// 记录批次完成信息
pub fn log_batch_complete(stats: &BatchStats) {
    info!("\n{}", "─".repeat(60));
    info!("✓ 翻译完成: 成功 {}/{}", stats.success, stats.total);
    info!("{}", "─".repeat(60));
}

/// 打印一次运行的最终统计信息
pub fn print_final_stats(outcome: &RunOutcome) {
    info!("\n{}", "=".repeat(60));
    info!("📊 本次运行统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📥 获取: {}", outcome.fetched);
    info!("✅ 成功: {}/{}", outcome.stats.success, outcome.stats.total);
    info!("❌ 失败: {}", outcome.stats.failed);
    if let Some(files) = &outcome.files {
        info!("📝 报告: {}", files.text.display());
        info!("📝 报告: {}", files.json.display());
    }
    info!("📤 已通知 Slack: {}", if outcome.notified { "是" } else { "否" });
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("日本語の文章", 3), "日本語...");
    }
}
