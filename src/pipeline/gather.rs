use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::util::{
    retry::{RetryConfig, is_retryable_error, is_retryable_status},
    text::collapse_whitespace,
};

use super::model::Article;

/// 記事ソースが返す正規化前のレコード。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceArticle {
    pub title: String,
    pub link: String,
    pub source: String,
    pub body_or_snippet: String,
    pub published: Option<String>,
}

/// 記事ソースのハード障害。「結果0件」はエラーではない。
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("news source request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("news source returned error status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to parse news source feed: {0}")]
    Parse(String),
}

impl SourceError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Request(error) => is_retryable_error(error),
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Parse(_) => false,
        }
    }
}

/// トピックから候補記事を返す外部ケイパビリティ。
#[async_trait]
pub trait ArticleSource: Send + Sync {
    async fn search(&self, topic: &str) -> Result<Vec<SourceArticle>, SourceError>;
}

#[async_trait]
pub trait GatherStage: Send + Sync {
    async fn gather(&self, topic: &str) -> Result<Vec<Article>, SourceError>;
}

/// 記事ソースを包み、再試行と正規化を行うステージ。
pub struct SourceGatherStage {
    source: Arc<dyn ArticleSource>,
    retry_config: RetryConfig,
    max_articles: usize,
}

impl SourceGatherStage {
    pub fn new(source: Arc<dyn ArticleSource>, retry_config: RetryConfig, max_articles: usize) -> Self {
        Self {
            source,
            retry_config,
            max_articles,
        }
    }

    /// 再試行付きで記事を取得する。
    async fn search_with_retry(&self, topic: &str) -> Result<Vec<SourceArticle>, SourceError> {
        let mut attempt = 0;

        loop {
            match self.source.search(topic).await {
                Ok(articles) => {
                    if attempt > 0 {
                        info!(attempt, "news source search succeeded after retry");
                    }
                    return Ok(articles);
                }
                Err(err) => {
                    attempt += 1;

                    if !self.retry_config.can_retry(attempt) {
                        warn!(
                            attempt,
                            max_attempts = self.retry_config.max_attempts,
                            error = %err,
                            "news source search failed after all retries"
                        );
                        return Err(err);
                    }

                    if !err.is_retryable() {
                        warn!(error = %err, "news source error is not retryable");
                        return Err(err);
                    }

                    let delay = self.retry_config.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "news source search failed, retrying after delay"
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl GatherStage for SourceGatherStage {
    async fn gather(&self, topic: &str) -> Result<Vec<Article>, SourceError> {
        let raw = self.search_with_retry(topic).await?;
        let raw_count = raw.len();

        let articles: Vec<Article> = raw
            .into_iter()
            .filter_map(normalize_article)
            .take(self.max_articles)
            .collect();

        debug!(
            topic,
            raw_count,
            kept = articles.len(),
            "normalized gathered articles"
        );

        Ok(articles)
    }
}

/// ソースのレコードを `Article` に正規化する。タイトルが空のものは捨てる。
pub(crate) fn normalize_article(raw: SourceArticle) -> Option<Article> {
    let source = collapse_whitespace(&raw.source);
    let title = strip_source_suffix(&collapse_whitespace(&raw.title), &source, &[" - ", " | "]);
    if title.is_empty() {
        return None;
    }

    let content = html_to_plain(&raw.body_or_snippet);
    // Google News の description はタイトルと配信元の繰り返しだけのことが多い
    let content = strip_source_suffix(&content, &source, &[" - ", " | ", " "]);

    Some(
        Article::new(title, raw.link.trim(), source, content)
            .with_published(raw.published.filter(|value| !value.trim().is_empty())),
    )
}

/// Google News が付ける末尾の ` - 配信元` を取り除く。
fn strip_source_suffix(text: &str, source: &str, separators: &[&str]) -> String {
    if source.is_empty() {
        return text.to_string();
    }
    for separator in separators {
        if let Some(stripped) = text.strip_suffix(&format!("{separator}{source}")) {
            return stripped.trim_end().to_string();
        }
    }
    text.to_string()
}

/// HTML断片をプレーンテキストに変換する。
fn html_to_plain(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return collapse_whitespace(fragment);
    }
    let rendered = html2text::from_read(fragment.as_bytes(), 10_000)
        .unwrap_or_else(|_| fragment.to_string());
    collapse_whitespace(&strip_link_footnotes(&rendered))
}

/// html2text が出力する `[リンク文][1]` 形式のリンクと脚注行を本文だけに戻す。
fn strip_link_footnotes(text: &str) -> String {
    static LINK_REF: once_cell::sync::Lazy<regex::Regex> = once_cell::sync::Lazy::new(|| {
        regex::Regex::new(r"\[([^\[\]]*)\]\[\d+\]").expect("valid regex")
    });
    static FOOTNOTE_REF: once_cell::sync::Lazy<regex::Regex> =
        once_cell::sync::Lazy::new(|| regex::Regex::new(r"\[\d+\]").expect("valid regex"));
    let body: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('[') || !line.contains("]: "))
        .collect();
    let joined = body.join("\n");
    let unwrapped = LINK_REF.replace_all(&joined, "$1");
    FOOTNOTE_REF.replace_all(&unwrapped, "").into_owned()
}
