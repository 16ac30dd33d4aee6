/// Slack 客户端
///
/// 使用外部上传流程把报告文件发送到频道：
/// `files.getUploadURLExternal` → 上传文件内容 → `files.completeUploadExternal`
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::NotifyError;

const GET_UPLOAD_URL: &str = "files.getUploadURLExternal";
const COMPLETE_UPLOAD: &str = "files.completeUploadExternal";
const UPLOAD_CONTENT: &str = "upload";

/// Slack Web API 的通用响应
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    upload_url: Option<String>,
    file_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct CompletedFile<'a> {
    id: &'a str,
    title: &'a str,
}

/// Slack 客户端
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl SlackClient {
    /// 创建新的 Slack 客户端
    pub fn new(config: &Config) -> Self {
        Self::with_base(&config.slack_bot_token, &config.slack_api_base_url)
    }

    pub fn with_base(token: impl Into<String>, api_base: impl Into<String>) -> Self {
        let api_base: String = api_base.into();
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// 上传文件并在频道中附带一条消息
    ///
    /// # 参数
    /// - `channel_id`: 频道 ID
    /// - `path`: 要上传的文件
    /// - `title`: Slack 上显示的文件标题
    /// - `initial_comment`: 与文件一起发送的消息
    pub async fn upload_file(
        &self,
        channel_id: &str,
        path: &Path,
        title: &str,
        initial_comment: &str,
    ) -> Result<(), NotifyError> {
        if !path.is_file() {
            return Err(NotifyError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| NotifyError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| title.to_string());

        info!("📤 正在上传 {} 到 Slack ({} 字节)", filename, content.len());

        // 1. 申请上传地址
        let length = content.len().to_string();
        let response = self
            .call(
                GET_UPLOAD_URL,
                &[("filename", filename.as_str()), ("length", length.as_str())],
            )
            .await?;
        let (upload_url, file_id) = match (response.upload_url, response.file_id) {
            (Some(url), Some(id)) => (url, id),
            _ => {
                return Err(NotifyError::Rejected {
                    method: GET_UPLOAD_URL.to_string(),
                    error: "响应中缺少 upload_url 或 file_id".to_string(),
                })
            }
        };
        debug!("获得上传地址，file_id: {}", file_id);

        // 2. 上传文件内容
        let upload = self
            .http
            .post(&upload_url)
            .bearer_auth(&self.token)
            .body(content)
            .send()
            .await
            .map_err(|e| NotifyError::request_failed(UPLOAD_CONTENT, e))?;
        if !upload.status().is_success() {
            return Err(NotifyError::Rejected {
                method: UPLOAD_CONTENT.to_string(),
                error: format!("status={}", upload.status().as_u16()),
            });
        }

        // 3. 完成上传并分享到频道
        let files = serde_json::to_string(&[CompletedFile {
            id: &file_id,
            title,
        }])
        .map_err(|e| NotifyError::Rejected {
            method: COMPLETE_UPLOAD.to_string(),
            error: e.to_string(),
        })?;
        self.call(
            COMPLETE_UPLOAD,
            &[
                ("files", files.as_str()),
                ("channel_id", channel_id),
                ("initial_comment", initial_comment),
            ],
        )
        .await?;

        info!("✅ 文件已发送到 Slack: {}", title);
        Ok(())
    }

    /// 调用一个 Web API 方法（表单编码）
    async fn call(&self, method: &str, form: &[(&str, &str)]) -> Result<SlackResponse, NotifyError> {
        let url = format!("{}/{}", self.api_base, method);
        let body = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .form(form)
            .send()
            .await
            .map_err(|e| NotifyError::request_failed(method, e))?
            .text()
            .await
            .map_err(|e| NotifyError::request_failed(method, e))?;

        parse_response(method, &body)
    }
}

/// 解析 Slack 响应，`ok: false` 时转换为错误
fn parse_response(method: &str, body: &str) -> Result<SlackResponse, NotifyError> {
    let response: SlackResponse =
        serde_json::from_str(body).map_err(|e| NotifyError::Rejected {
            method: method.to_string(),
            error: format!("无法解析响应: {}", e),
        })?;

    if !response.ok {
        return Err(NotifyError::Rejected {
            method: method.to_string(),
            error: response
                .error
                .clone()
                .unwrap_or_else(|| "unknown_error".to_string()),
        });
    }
    Ok(response)
}

/// Slack 上的文件标题，例如 `abs-ja_20240501`
pub fn report_title(prefix: &str, date: chrono::NaiveDate) -> String {
    format!("{}_{}", prefix, date.format("%Y%m%d"))
}
