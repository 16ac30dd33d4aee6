//! 每日调度器 - 编排层
//!
//! 每天在配置的时刻触发一次运行。调度状态（执行时刻、最后一次运行日期）
//! 保存在显式的 [`SchedulerState`] 中，随控制循环传递；停止信号通过
//! `watch` 通道传入，在每次轮询等待时检查。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{AppResult, ConfigError};

/// 解析 `HH:MM`（24 小时制）格式的执行时刻
pub fn parse_run_time(value: &str) -> Result<NaiveTime, ConfigError> {
    let invalid = || ConfigError::InvalidRunTime {
        value: value.to_string(),
    };

    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;

    if hour >= 24 || minute >= 60 {
        return Err(invalid());
    }
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// 返回 `reference` 之后（不含）的第一个执行时刻
pub fn next_run_after(run_at: NaiveTime, reference: NaiveDateTime) -> NaiveDateTime {
    let candidate = reference.date().and_time(run_at);
    if candidate <= reference {
        candidate + chrono::Duration::days(1)
    } else {
        candidate
    }
}

/// 调度状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    pub run_at: NaiveTime,
    pub last_run: Option<NaiveDate>,
}

impl SchedulerState {
    pub fn new(run_at: NaiveTime, last_run: Option<NaiveDate>) -> Self {
        Self { run_at, last_run }
    }

    /// 今天的执行时刻已到，且今天还没有运行过
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        now.time() >= self.run_at && self.last_run != Some(now.date())
    }

    pub fn mark_ran(&mut self, date: NaiveDate) {
        self.last_run = Some(date);
    }

    /// 到下一次检查前需要等待的时间（不超过轮询间隔）
    pub fn wait_duration(&self, now: NaiveDateTime, poll_interval: Duration) -> Duration {
        let next = next_run_after(self.run_at, now);
        let until_next = (next - now).to_std().unwrap_or(Duration::ZERO);
        until_next.min(poll_interval)
    }
}

/// 最后一次运行日期的持久化
///
/// 进程在同一天重启时不会再次运行。
#[derive(Debug, Clone)]
pub struct LastRunStore {
    path: PathBuf,
}

impl LastRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 在输出目录下使用 `.last_run`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(".last_run"))
    }

    /// 读取最后一次运行日期；文件不存在或内容无效时返回 `None`
    pub fn load(&self) -> Option<NaiveDate> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(e) => {
                warn!("⚠️ 无法解析 {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, date: NaiveDate) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, date.format("%Y-%m-%d").to_string())
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// 每日调度器
pub struct DailyScheduler {
    state: SchedulerState,
    poll_interval: Duration,
    store: Option<LastRunStore>,
    clock: fn() -> NaiveDateTime,
}

impl DailyScheduler {
    pub fn new(run_at: NaiveTime, poll_interval: Duration) -> Self {
        Self {
            state: SchedulerState::new(run_at, None),
            poll_interval,
            store: None,
            clock: local_now,
        }
    }

    /// 使用持久化的最后运行日期
    pub fn with_store(mut self, store: LastRunStore) -> Self {
        self.state.last_run = store.load();
        if let Some(date) = self.state.last_run {
            info!("📅 上次运行日期: {}", date);
        }
        self.store = Some(store);
        self
    }

    /// 替换时钟（测试用）
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    /// 检查是否应该运行；应该运行时立即记录今天已运行
    pub fn check(&mut self, now: NaiveDateTime) -> bool {
        if !self.state.is_due(now) {
            return false;
        }
        self.state.mark_ran(now.date());
        if let Some(store) = &self.store {
            if let Err(e) = store.save(now.date()) {
                warn!("⚠️ 保存最后运行日期失败: {}", e);
            }
        }
        true
    }

    /// 运行调度循环，直到收到停止信号
    ///
    /// 正在进行的运行总会完成；收到停止信号后不再开始新的运行。
    /// 单次运行失败只记录日志，不影响后续调度。
    pub async fn run<F, Fut, T>(mut self, mut job: F, mut shutdown: watch::Receiver<bool>)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let now = (self.clock)();
        info!(
            "⏰ 调度器启动，每日执行时刻: {}，下一次: {}",
            self.state.run_at.format("%H:%M"),
            next_run_after(self.state.run_at, now)
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = (self.clock)();
            if self.check(now) {
                info!("▶ 开始 {} 的运行", now.date());
                match job().await {
                    Ok(_) => info!("✅ {} 的运行完成", now.date()),
                    Err(e) => error!("❌ {} 的运行失败: {}", now.date(), e),
                }
                info!(
                    "⏳ 下一次运行: {}",
                    next_run_after(self.state.run_at, (self.clock)())
                );
            }

            if *shutdown.borrow() {
                break;
            }

            let wait = self.state.wait_duration((self.clock)(), self.poll_interval);
            debug!("等待 {:?} 后再次检查", wait);
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // 发送端已关闭，视为停止
                        break;
                    }
                }
            }
        }

        info!("👋 收到停止信号，调度器退出");
    }
}
