/// arXiv API 客户端
///
/// 按分类检索最近发布的论文，解析 Atom feed 并转换为 [`Paper`]
use chrono::{DateTime, Duration, NaiveDate};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::Paper;

/// Atom feed
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    /// 形如 `http://arxiv.org/abs/2401.01234v1`
    id: String,
    title: String,
    summary: String,
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<Author>,
    #[serde(rename = "category", default)]
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(rename = "@term")]
    term: String,
}

/// arXiv 客户端
pub struct ArxivClient {
    http: reqwest::Client,
    api_url: String,
}

impl ArxivClient {
    /// 创建新的 arXiv 客户端
    pub fn new(config: &Config) -> Self {
        Self::with_url(&config.arxiv_api_url)
    }

    pub fn with_url(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    /// 获取最近 `days_back` 天内发布的论文
    ///
    /// 结果按提交日期降序排列，只保留发布日期不早于 `today - days_back` 的论文。
    pub async fn fetch_recent(
        &self,
        categories: &[String],
        days_back: u32,
        max_results: usize,
        today: NaiveDate,
    ) -> Result<Vec<Paper>, ApiError> {
        let query = build_query(categories);
        let max = max_results.to_string();
        info!(
            "🔍 正在检索 arXiv: {} (最多 {} 件)",
            if query.is_empty() { "(全部)" } else { query.as_str() },
            max_results
        );

        let response = self
            .http
            .get(&self.api_url)
            .query(&[
                ("search_query", query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| ApiError::request_failed(&self.api_url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadResponse {
                endpoint: self.api_url.clone(),
                status: status.as_u16(),
            });
        }

        let xml = response
            .text()
            .await
            .map_err(|e| ApiError::request_failed(&self.api_url, e))?;
        debug!("arXiv 响应长度: {} 字节", xml.len());

        let papers = parse_feed(&xml)?;
        let cutoff = today - Duration::days(i64::from(days_back));
        let total = papers.len();
        let recent: Vec<Paper> = papers
            .into_iter()
            .filter(|p| p.published >= cutoff)
            .collect();

        debug!(
            "截止日期 {}: {} 件中保留 {} 件",
            cutoff,
            total,
            recent.len()
        );
        Ok(recent)
    }
}

/// 构建检索语句，例如 `cat:cs.CL OR cat:cs.LG`
pub fn build_query(categories: &[String]) -> String {
    categories
        .iter()
        .map(|c| format!("cat:{}", c))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// 解析 Atom feed
pub fn parse_feed(xml: &str) -> Result<Vec<Paper>, ApiError> {
    let feed: Feed = quick_xml::de::from_str(xml)?;
    feed.entries.into_iter().map(entry_to_paper).collect()
}

fn entry_to_paper(entry: Entry) -> Result<Paper, ApiError> {
    let id = entry
        .id
        .trim()
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();

    let published = DateTime::parse_from_rfc3339(entry.published.trim())
        .map(|dt| dt.date_naive())
        .map_err(|_| ApiError::InvalidDate {
            id: id.clone(),
            value: entry.published.clone(),
        })?;

    Ok(Paper {
        id,
        title: collapse_whitespace(&entry.title),
        abstract_text: collapse_whitespace(&entry.summary),
        authors: entry
            .authors
            .into_iter()
            .map(|a| a.name.trim().to_string())
            .collect(),
        published,
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
        translated_abstract: String::new(),
    })
}

/// feed 中的标题和摘要带有换行和缩进
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
