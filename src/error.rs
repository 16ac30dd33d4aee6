use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
///
/// 每次运行中可能出现的错误，按来源分类。单条论文的翻译失败不会出现在这里：
/// 它们在重试流程内被转换为空字符串标记，不会向上传播。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误（启动时致命）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// arXiv API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// Slack 通知错误
    #[error("通知错误: {0}")]
    Notify(#[from] NotifyError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在（请检查 key.env）")]
    EnvVarNotFound { var_name: String },

    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },

    /// 每日执行时刻格式不正确
    #[error("DAILY_RUN_AT 的值不正确: '{value}'（示例: '07:30'）")]
    InvalidRunTime { value: String },

    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    SettingsReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// 加载密钥文件失败
    #[error("加载密钥文件失败 ({path}): {source}")]
    SecretsLoadFailed {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// arXiv API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// API 返回错误状态码
    #[error("API返回错误响应 ({endpoint}): status={status}")]
    BadResponse { endpoint: String, status: u16 },

    /// Atom XML 解析失败
    #[error("XML解析失败: {0}")]
    XmlParseFailed(#[from] quick_xml::de::DeError),

    /// 发布日期无法解析
    #[error("论文 {id} 的发布日期无法解析: '{value}'")]
    InvalidDate { id: String, value: String },
}

/// 翻译失败的类别
///
/// 重试流程只根据这个类别决定是否退避重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 请求频率超限（429 / RESOURCE_EXHAUSTED），可退避重试
    Throttled,
    /// 其他任何失败，不重试
    Other,
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 请求频率超限
    #[error("LLM 请求频率超限 (模型: {model}): {message}")]
    Throttled { model: String, message: String },

    /// API 返回错误响应
    #[error("LLM API返回错误 (模型: {model}, status={status}): {message}")]
    Api {
        model: String,
        status: u16,
        message: String,
    },

    /// 网络请求失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    Transport {
        model: String,
        #[source]
        source: reqwest::Error,
    },

    /// 请求超时
    #[error("LLM API调用超时 (模型: {model})")]
    Timeout { model: String },

    /// 返回内容无法使用
    #[error("LLM返回内容无效 (模型: {model}): {reason}")]
    MalformedResponse { model: String, reason: String },

    /// 输入的论文缺少必要字段
    #[error("论文 {id} 的 {field} 为空，无法翻译")]
    EmptyInput { id: String, field: &'static str },
}

impl LlmError {
    /// 返回失败类别
    pub fn kind(&self) -> FailureKind {
        match self {
            LlmError::Throttled { .. } => FailureKind::Throttled,
            _ => FailureKind::Other,
        }
    }
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 创建目录失败
    #[error("创建目录失败 ({path}): {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON 序列化 / 反序列化失败
    #[error("JSON处理失败 ({path}): {source}")]
    JsonFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Slack 通知错误
#[derive(Debug, Error)]
pub enum NotifyError {
    /// 要上传的文件不存在
    #[error("文件不存在，请检查路径: {path}")]
    FileNotFound { path: PathBuf },

    /// 读取要上传的文件失败
    #[error("读取上传文件失败 ({path}): {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 网络请求失败
    #[error("Slack 请求失败 ({method}): {source}")]
    RequestFailed {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    /// Slack 拒绝了请求
    #[error("Slack 拒绝了请求 ({method}): {error}")]
    Rejected { method: String, error: String },
}

// ========== 便捷构造函数 ==========

impl ApiError {
    /// 创建API请求失败错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }
}

impl LlmError {
    /// 根据 reqwest 错误创建网络或超时错误
    pub fn from_transport(model: impl Into<String>, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            LlmError::Timeout {
                model: model.into(),
            }
        } else {
            LlmError::Transport {
                model: model.into(),
                source,
            }
        }
    }

    /// 创建返回内容无效错误
    pub fn malformed(model: impl Into<String>, reason: impl Into<String>) -> Self {
        LlmError::MalformedResponse {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

impl NotifyError {
    /// 创建Slack请求失败错误
    pub fn request_failed(method: impl Into<String>, source: reqwest::Error) -> Self {
        NotifyError::RequestFailed {
            method: method.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_throttled_is_retryable() {
        let throttled = LlmError::Throttled {
            model: "m".to_string(),
            message: "quota".to_string(),
        };
        assert_eq!(throttled.kind(), FailureKind::Throttled);

        let others = vec![
            LlmError::Api {
                model: "m".to_string(),
                status: 500,
                message: "internal".to_string(),
            },
            LlmError::Timeout {
                model: "m".to_string(),
            },
            LlmError::malformed("m", "no candidates"),
            LlmError::EmptyInput {
                id: "2401.00001v1".to_string(),
                field: "abstract",
            },
        ];
        for err in others {
            assert_eq!(err.kind(), FailureKind::Other, "{} 不应该被重试", err);
        }
    }

    #[test]
    fn test_app_error_wraps_config_error() {
        let err: AppError = ConfigError::InvalidRunTime {
            value: "25:99".to_string(),
        }
        .into();
        assert!(err.to_string().contains("25:99"));
    }
}
