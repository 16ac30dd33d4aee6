/// LLM API 客户端
///
/// 封装对 Gemini `generateContent` 接口的单次调用。
///
/// 每次调用只发送一条用户消息，不携带任何历史对话：每篇论文都是独立的会话，
/// 前一篇论文的提示词不会泄漏到后一篇的翻译中。复用的只有底层 HTTP 连接池。
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 表示频率超限的错误状态
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
/// 正常结束的 finishReason
const FINISH_STOP: &str = "STOP";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    status: Option<String>,
}

/// LLM 客户端
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model_name: String,
}

impl LlmClient {
    /// 创建新的 LLM 客户端
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.llm_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| LlmError::from_transport(&config.llm_model_name, e))?;

        Ok(Self {
            http,
            api_key: config.llm_api_key.clone(),
            api_base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
            model_name: config.llm_model_name.clone(),
        })
    }

    /// 发送单条提示词，返回去除首尾空白后的完整响应文本
    pub async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("提示词长度: {} 字符", prompt.chars().count());

        let url = format!(
            "{}/models/{}:generateContent",
            self.api_base_url, self.model_name
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&self.model_name, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::from_transport(&self.model_name, e))?;

        if !status.is_success() {
            let err = classify_error(&self.model_name, status.as_u16(), &body);
            warn!("LLM API 调用失败: {}", err);
            return Err(err);
        }

        debug!("LLM API 调用成功");
        extract_text(&self.model_name, &body)
    }
}

/// 将非 2xx 响应转换为 [`LlmError`]
///
/// HTTP 429 或错误状态 `RESOURCE_EXHAUSTED` 视为频率超限，其余都是普通失败。
pub fn classify_error(model: &str, status: u16, body: &str) -> LlmError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let exhausted = parsed
        .as_ref()
        .and_then(|e| e.error.status.as_deref())
        == Some(RESOURCE_EXHAUSTED);

    if status == 429 || exhausted {
        LlmError::Throttled {
            model: model.to_string(),
            message,
        }
    } else {
        LlmError::Api {
            model: model.to_string(),
            status,
            message,
        }
    }
}

/// 从成功响应中提取文本
pub fn extract_text(model: &str, body: &str) -> Result<String, LlmError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::malformed(model, format!("无法解析响应: {}", e)))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(LlmError::malformed(model, format!("提示词被拦截: {}", reason)));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| LlmError::malformed(model, "LLM 返回结果为空"))?;

    // 被截断（MAX_TOKENS）或被过滤的输出不能当作完整译文
    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| *r != FINISH_STOP)
    {
        return Err(LlmError::malformed(
            model,
            format!("输出未正常结束: finishReason={}", reason),
        ));
    }

    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .ok_or_else(|| LlmError::malformed(model, "LLM 返回结果为空"))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(LlmError::malformed(model, "LLM 返回内容为空"));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    const MODEL: &str = "gemini-2.0-flash-lite";

    #[test]
    fn test_classify_429_as_throttled() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = classify_error(MODEL, 429, body);
        assert_eq!(err.kind(), FailureKind::Throttled);
        assert!(err.to_string().contains("Resource has been exhausted"));
    }

    #[test]
    fn test_classify_resource_exhausted_status_without_429() {
        let body = r#"{"error":{"code":503,"message":"quota","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(classify_error(MODEL, 503, body).kind(), FailureKind::Throttled);
    }

    #[test]
    fn test_classify_other_errors() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let err = classify_error(MODEL, 400, body);
        assert_eq!(err.kind(), FailureKind::Other);
        assert!(matches!(err, LlmError::Api { status: 400, .. }));

        let err = classify_error(MODEL, 502, "<html>Bad Gateway</html>");
        assert_eq!(err.kind(), FailureKind::Other);
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[test]
    fn test_extract_text_joins_parts_and_trims() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "  これは"}, {"text": "翻訳です。\n"}]},
                "finishReason": "STOP"
            }]
        }"#;
        assert_eq!(extract_text(MODEL, body).unwrap(), "これは翻訳です。");
    }

    #[test]
    fn test_extract_text_rejects_empty_and_blocked() {
        let empty = r#"{"candidates": [{"content": {"parts": [{"text": "   "}]}}]}"#;
        assert!(matches!(
            extract_text(MODEL, empty),
            Err(LlmError::MalformedResponse { .. })
        ));

        let none = r#"{"candidates": []}"#;
        assert!(extract_text(MODEL, none).is_err());

        let blocked = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = extract_text(MODEL, blocked).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        assert!(extract_text(MODEL, "not json").is_err());
    }

    #[test]
    fn test_extract_text_rejects_truncated_output() {
        let truncated = r#"{"candidates":[{"content":{"parts":[{"text":"途中で切れた翻"}]},"finishReason":"MAX_TOKENS"}]}"#;
        let err = extract_text(MODEL, truncated).unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse { .. }));
        assert_eq!(err.kind(), FailureKind::Other, "截断的输出不应重试");
        assert!(err.to_string().contains("MAX_TOKENS"));

        let filtered = r#"{"candidates":[{"content":{"parts":[{"text":"x"}]},"finishReason":"SAFETY"}]}"#;
        assert!(extract_text(MODEL, filtered).is_err());

        let no_reason = r#"{"candidates":[{"content":{"parts":[{"text":"完全な翻訳"}]}}]}"#;
        assert_eq!(extract_text(MODEL, no_reason).unwrap(), "完全な翻訳");
    }
}
