/// Google News RSS検索クライアント。
///
/// トピック文字列で検索し、RSSの `item` を候補記事として返します。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::pipeline::gather::{ArticleSource, SourceArticle, SourceError};

/// Google News RSSクライアントの設定。
#[derive(Debug, Clone)]
pub struct GoogleNewsConfig {
    pub base_url: String,
    /// `en-US` のような言語-地域タグ。`hl`, `gl`, `ceid` に展開する。
    pub locale: String,
    pub timeout: Duration,
}

/// Google News RSSとの通信を管理するクライアント。
#[derive(Debug, Clone)]
pub struct GoogleNewsClient {
    client: Client,
    base_url: Url,
    locale: String,
}

impl GoogleNewsClient {
    /// 新しいGoogle Newsクライアントを作成する。
    ///
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(config: GoogleNewsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("Mozilla/5.0 (compatible; bias-worker/0.1)")
            .build()
            .context("failed to build news source HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid news source base URL")?;

        Ok(Self {
            client,
            base_url,
            locale: config.locale,
        })
    }

    fn search_url(&self, topic: &str) -> Url {
        let (language, region) = split_locale(&self.locale);
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("q", topic)
            .append_pair("hl", &self.locale)
            .append_pair("gl", region)
            .append_pair("ceid", &format!("{region}:{language}"));
        url
    }
}

#[async_trait]
impl ArticleSource for GoogleNewsClient {
    async fn search(&self, topic: &str) -> Result<Vec<SourceArticle>, SourceError> {
        let url = self.search_url(topic);
        debug!(topic, "requesting news source feed");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status,
                body: body.chars().take(200).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let channel = rss::Channel::read_from(&bytes[..])
            .map_err(|error| SourceError::Parse(error.to_string()))?;

        Ok(parse_channel(&channel))
    }
}

/// `en-US` を `("en", "US")` に分解する。地域がなければ `US` とみなす。
fn split_locale(locale: &str) -> (&str, &str) {
    match locale.split_once('-') {
        Some((language, region)) if !region.is_empty() => (language, region),
        _ => (locale, "US"),
    }
}

/// RSSチャンネルを候補記事に変換する。
fn parse_channel(channel: &rss::Channel) -> Vec<SourceArticle> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            let title = item.title()?.to_string();
            let source = item
                .source()
                .and_then(|source| source.title())
                .map(ToString::to_string)
                .unwrap_or_default();
            Some(SourceArticle {
                title,
                link: item.link().unwrap_or_default().to_string(),
                source,
                body_or_snippet: item.description().unwrap_or_default().to_string(),
                published: item.pub_date().map(ToString::to_string),
            })
        })
        .collect()
}
