//! 翻译流程 - 流程层
//!
//! 核心职责：定义"一篇论文"的翻译流程，包括频率超限时的指数退避重试
//!
//! 流程顺序：
//! 1. 调用翻译服务
//! 2. 频率超限 → 等待当前退避时间，退避时间翻倍，再次尝试
//! 3. 其他失败或重试次数用尽 → 译文记为空字符串

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::FailureKind;
use crate::models::Paper;
use crate::services::Translate;

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（至少 1）
    pub max_retries: u32,
    /// 第一次重试前的等待时间
    pub initial_backoff: Duration,
    /// 每次频率超限后退避时间的倍数
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(4),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            ..Self::default()
        }
    }
}

/// 单篇论文的重试状态，处理完即丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
    pub backoff: Duration,
}

impl RetryState {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            backoff: policy.initial_backoff,
        }
    }

    fn advance_backoff(&mut self, multiplier: u32) {
        self.backoff = self.backoff.saturating_mul(multiplier);
    }
}

/// 翻译流程
///
/// - 决定何时重试、何时放弃
/// - 不持有翻译服务，由调用方传入
/// - 永远不返回错误：失败的论文译文为空字符串
#[derive(Debug, Clone, Default)]
pub struct TranslationFlow {
    policy: RetryPolicy,
}

impl TranslationFlow {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// 翻译单篇论文
    ///
    /// # 参数
    /// - `translator`: 翻译服务
    /// - `paper`: 待翻译的论文（不会被修改）
    ///
    /// # 返回
    /// 返回带译文的新记录；失败时译文为空字符串
    pub async fn run<T>(&self, translator: &T, paper: &Paper) -> Paper
    where
        T: Translate + ?Sized,
    {
        let mut state = RetryState::new(&self.policy);

        while state.attempt < self.policy.max_retries {
            state.attempt += 1;
            debug!(
                "[{}] 翻译尝试 {}/{}",
                paper.id, state.attempt, self.policy.max_retries
            );

            match translator.translate(paper).await {
                Ok(translated) => {
                    if state.attempt > 1 {
                        info!("[{}] ✓ 第 {} 次尝试翻译成功", paper.id, state.attempt);
                    }
                    return translated;
                }
                Err(e) if e.kind() == FailureKind::Throttled => {
                    warn!(
                        "[{}] ⚠️ 请求频率超限，{:?} 后重试 {}/{}: {}",
                        paper.id, state.backoff, state.attempt, self.policy.max_retries, e
                    );
                    tokio::time::sleep(state.backoff).await;
                    state.advance_backoff(self.policy.multiplier);
                }
                Err(e) => {
                    error!("[{}] ❌ 翻译失败: {}", paper.id, e);
                    return paper.translation_failed();
                }
            }
        }

        error!(
            "[{}] ❌ 超过最大重试次数 ({})，跳过",
            paper.id, self.policy.max_retries
        );
        paper.translation_failed()
    }
}
