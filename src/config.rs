use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::orchestrator::scheduler::parse_run_time;

/// 默认密钥文件
pub const DEFAULT_SECRETS_FILE: &str = "key.env";
/// 默认配置文件
pub const DEFAULT_SETTINGS_FILE: &str = "digest.toml";

/// 程序配置
///
/// 优先级：环境变量 > `digest.toml` > 默认值。
/// 密钥（`GEMINI_API_KEY` / `SLACK_BOT_TOKEN`）只从环境变量读取，
/// 启动时由 `key.env` 加载到环境中。
#[derive(Clone)]
pub struct Config {
    // --- arXiv 检索 ---
    /// 检索的分类，例如 `cs.CL`
    pub categories: Vec<String>,
    /// 回溯天数
    pub days_back: u32,
    /// 最大获取件数
    pub max_results: usize,
    pub arxiv_api_url: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// 翻译目标语言
    pub target_language: String,
    /// 单次 LLM 请求超时；`None` 表示不设置
    pub llm_timeout: Option<Duration>,
    // --- 速率控制 ---
    /// 相邻两次翻译请求之间的等待时间
    pub request_delay: Duration,
    /// 单篇论文最多尝试次数
    pub max_retries: u32,
    /// 第一次退避等待时间
    pub initial_backoff: Duration,
    // --- 输出 ---
    pub output_dir: PathBuf,
    // --- Slack ---
    pub slack_bot_token: String,
    pub slack_channel_id: String,
    pub slack_api_base_url: String,
    pub slack_title_prefix: String,
    pub slack_initial_comment: String,
    // --- 调度 ---
    /// 每日执行时刻
    pub daily_run_at: NaiveTime,
    /// 调度器轮询间隔
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: vec!["cs.CL".to_string()],
            days_back: 1,
            max_results: 100,
            arxiv_api_url: "https://export.arxiv.org/api/query".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            llm_model_name: "gemini-2.0-flash-lite".to_string(),
            target_language: "Japanese".to_string(),
            llm_timeout: None,
            request_delay: Duration::from_millis(4100),
            max_retries: 3,
            initial_backoff: Duration::from_secs(4),
            output_dir: PathBuf::from("abs-ja"),
            slack_bot_token: String::new(),
            slack_channel_id: String::new(),
            slack_api_base_url: "https://slack.com/api".to_string(),
            slack_title_prefix: "abs-ja".to_string(),
            slack_initial_comment: "本日のレポートです！".to_string(),
            daily_run_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("categories", &self.categories)
            .field("days_back", &self.days_back)
            .field("max_results", &self.max_results)
            .field("llm_model_name", &self.llm_model_name)
            .field("target_language", &self.target_language)
            .field("llm_timeout", &self.llm_timeout)
            .field("request_delay", &self.request_delay)
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("output_dir", &self.output_dir)
            .field("slack_channel_id", &self.slack_channel_id)
            .field("daily_run_at", &self.daily_run_at)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

/// `digest.toml` 中可选的非密钥配置
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub categories: Option<Vec<String>>,
    pub days_back: Option<u32>,
    pub max_results: Option<usize>,
    pub arxiv_api_url: Option<String>,
    pub llm_api_base_url: Option<String>,
    pub llm_model_name: Option<String>,
    pub target_language: Option<String>,
    pub llm_timeout_secs: Option<f64>,
    pub request_delay_secs: Option<f64>,
    pub max_retries: Option<u32>,
    pub initial_backoff_secs: Option<f64>,
    pub output_dir: Option<PathBuf>,
    pub slack_channel_id: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub slack_title_prefix: Option<String>,
    pub slack_initial_comment: Option<String>,
    pub daily_run_at: Option<String>,
    pub poll_secs: Option<f64>,
}

impl FileSettings {
    /// 读取配置文件；文件不存在时返回空配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::SettingsReadFailed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Config {
    /// 加载密钥文件、配置文件和环境变量
    pub fn load(secrets_path: &Path, settings_path: &Path) -> Result<Self, ConfigError> {
        match dotenvy::from_path(secrets_path) {
            Ok(()) => info!("✅ 已加载密钥文件: {}", secrets_path.display()),
            Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "⚠️ 未找到密钥文件 {}，仅使用环境变量",
                    secrets_path.display()
                );
            }
            Err(source) => {
                return Err(ConfigError::SecretsLoadFailed {
                    path: secrets_path.to_path_buf(),
                    source,
                })
            }
        }

        let settings = FileSettings::load(settings_path)?;
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// 从配置文件和变量查找函数构建配置
    ///
    /// `lookup` 通常是 `std::env::var`，测试时可以传入任意映射。
    pub fn from_lookup<F>(settings: FileSettings, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let categories = match var("ARXIV_CATEGORIES") {
            Some(raw) => split_list(&raw),
            None => settings.categories.unwrap_or(default.categories),
        };

        let daily_run_at = match var("DAILY_RUN_AT").or(settings.daily_run_at) {
            Some(raw) => parse_run_time(&raw)?,
            None => default.daily_run_at,
        };

        let max_retries = parse_var(&var, "LLM_MAX_RETRIES", "u32")?
            .or(settings.max_retries)
            .unwrap_or(default.max_retries);
        if max_retries == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "LLM_MAX_RETRIES".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            });
        }

        let llm_timeout = match parse_var::<f64>(&var, "LLM_TIMEOUT_SECS", "f64")?
            .or(settings.llm_timeout_secs)
        {
            Some(secs) => Some(secs_to_duration("LLM_TIMEOUT_SECS", secs)?),
            None => None,
        };

        Ok(Self {
            categories,
            days_back: parse_var(&var, "ARXIV_DAYS_BACK", "u32")?
                .or(settings.days_back)
                .unwrap_or(default.days_back),
            max_results: parse_var(&var, "ARXIV_MAX_RESULTS", "usize")?
                .or(settings.max_results)
                .unwrap_or(default.max_results),
            arxiv_api_url: var("ARXIV_API_URL")
                .or(settings.arxiv_api_url)
                .unwrap_or(default.arxiv_api_url),
            llm_api_key: require(&var, "GEMINI_API_KEY")?,
            llm_api_base_url: var("LLM_API_BASE_URL")
                .or(settings.llm_api_base_url)
                .unwrap_or(default.llm_api_base_url),
            llm_model_name: var("LLM_MODEL_NAME")
                .or(settings.llm_model_name)
                .unwrap_or(default.llm_model_name),
            target_language: var("TARGET_LANGUAGE")
                .or(settings.target_language)
                .unwrap_or(default.target_language),
            llm_timeout,
            request_delay: duration_var(
                &var,
                "REQUEST_DELAY_SECS",
                settings.request_delay_secs,
                default.request_delay,
            )?,
            max_retries,
            initial_backoff: duration_var(
                &var,
                "LLM_INITIAL_BACKOFF_SECS",
                settings.initial_backoff_secs,
                default.initial_backoff,
            )?,
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .or(settings.output_dir)
                .unwrap_or(default.output_dir),
            slack_bot_token: require(&var, "SLACK_BOT_TOKEN")?,
            slack_channel_id: match var("SLACK_CHANNEL_ID").or(settings.slack_channel_id) {
                Some(id) => id,
                None => {
                    return Err(ConfigError::EnvVarNotFound {
                        var_name: "SLACK_CHANNEL_ID".to_string(),
                    })
                }
            },
            slack_api_base_url: var("SLACK_API_BASE_URL")
                .or(settings.slack_api_base_url)
                .unwrap_or(default.slack_api_base_url),
            slack_title_prefix: var("SLACK_TITLE_PREFIX")
                .or(settings.slack_title_prefix)
                .unwrap_or(default.slack_title_prefix),
            slack_initial_comment: var("SLACK_INITIAL_COMMENT")
                .or(settings.slack_initial_comment)
                .unwrap_or(default.slack_initial_comment),
            daily_run_at,
            poll_interval: duration_var(
                &var,
                "SCHEDULER_POLL_SECS",
                settings.poll_secs,
                default.poll_interval,
            )?,
        })
    }
}

fn require<F>(var: &F, name: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var(name).ok_or_else(|| ConfigError::EnvVarNotFound {
        var_name: name.to_string(),
    })
}

fn parse_var<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: name.to_string(),
                value: raw,
                expected_type: expected_type.to_string(),
            }),
        None => Ok(None),
    }
}

fn duration_var(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    from_file: Option<f64>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match parse_var::<f64>(var, name, "秒数")?.or(from_file) {
        Some(secs) => secs_to_duration(name, secs),
        None => Ok(default),
    }
}

fn secs_to_duration(name: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::EnvVarParseFailed {
        var_name: name.to_string(),
        value: secs.to_string(),
        expected_type: "非负秒数".to_string(),
    })
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const SECRETS: [(&str, &str); 3] = [
        ("GEMINI_API_KEY", "test-key"),
        ("SLACK_BOT_TOKEN", "xoxb-test"),
        ("SLACK_CHANNEL_ID", "C0123"),
    ];

    #[test]
    fn test_defaults_with_only_secrets() {
        let config = Config::from_lookup(FileSettings::default(), lookup_from(&SECRETS)).unwrap();

        assert_eq!(config.categories, vec!["cs.CL"]);
        assert_eq!(config.days_back, 1);
        assert_eq!(config.max_results, 100);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_secs(4));
        assert_eq!(config.request_delay, Duration::from_millis(4100));
        assert_eq!(config.llm_timeout, None, "默认不设置超时");
        assert_eq!(config.daily_run_at, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.llm_api_key, "test-key");
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let lookup = lookup_from(&[("SLACK_BOT_TOKEN", "x"), ("SLACK_CHANNEL_ID", "C")]);
        let err = Config::from_lookup(FileSettings::default(), lookup).unwrap_err();
        assert!(
            matches!(err, ConfigError::EnvVarNotFound { ref var_name } if var_name == "GEMINI_API_KEY")
        );
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let lookup = lookup_from(&[
            ("GEMINI_API_KEY", "k"),
            ("SLACK_BOT_TOKEN", "   "),
            ("SLACK_CHANNEL_ID", "C"),
        ]);
        let err = Config::from_lookup(FileSettings::default(), lookup).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { .. }));
    }

    #[test]
    fn test_invalid_run_time_is_fatal() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("DAILY_RUN_AT", "25:99"));
        let err = Config::from_lookup(FileSettings::default(), lookup_from(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRunTime { .. }));
    }

    #[test]
    fn test_unparsable_number_is_fatal() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("REQUEST_DELAY_SECS", "fast"));
        let err = Config::from_lookup(FileSettings::default(), lookup_from(&pairs)).unwrap_err();
        assert!(
            matches!(err, ConfigError::EnvVarParseFailed { ref var_name, .. } if var_name == "REQUEST_DELAY_SECS")
        );
    }

    #[test]
    fn test_zero_retries_rejected() {
        let mut pairs = SECRETS.to_vec();
        pairs.push(("LLM_MAX_RETRIES", "0"));
        assert!(Config::from_lookup(FileSettings::default(), lookup_from(&pairs)).is_err());
    }

    #[test]
    fn test_env_overrides_file_settings() {
        let settings: FileSettings = toml::from_str(
            r#"
            categories = ["cs.AI"]
            days_back = 3
            daily_run_at = "07:30"
            llm_timeout_secs = 60.0
            "#,
        )
        .unwrap();

        let mut pairs = SECRETS.to_vec();
        pairs.push(("ARXIV_CATEGORIES", "cs.CL, cs.LG"));
        let config = Config::from_lookup(settings, lookup_from(&pairs)).unwrap();

        assert_eq!(config.categories, vec!["cs.CL", "cs.LG"]);
        assert_eq!(config.days_back, 3);
        assert_eq!(config.daily_run_at, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(config.llm_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_settings_file_missing_is_empty() {
        let settings = FileSettings::load(Path::new("definitely/not/here.toml")).unwrap();
        assert!(settings.categories.is_none());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_lookup(FileSettings::default(), lookup_from(&SECRETS)).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("test-key"));
        assert!(!printed.contains("xoxb-test"));
    }
}
