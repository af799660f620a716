/// 記事ページから代表画像URLを推定するクライアント。
///
/// `og:image` → `twitter:image` → `link rel="image_src"` の順に探し、
/// 見つからなければ配信元ドメインのファビコンURLを返します。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, Url};
use tracing::debug;

use crate::pipeline::annotate::{ImageOutcome, ImageResolver};
use crate::util::best_effort::BestEffort;

const FAVICON_SERVICE: &str = "https://www.google.com/s2/favicons";

static META_IMAGE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?is)<meta[^>]+(?:property|name)\s*=\s*["']og:image(?::url)?["'][^>]*content\s*=\s*["']([^"']+)["']"#,
        r#"(?is)<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]*(?:property|name)\s*=\s*["']og:image(?::url)?["']"#,
        r#"(?is)<meta[^>]+(?:property|name)\s*=\s*["']twitter:image(?::src)?["'][^>]*content\s*=\s*["']([^"']+)["']"#,
        r#"(?is)<meta[^>]+content\s*=\s*["']([^"']+)["'][^>]*(?:property|name)\s*=\s*["']twitter:image(?::src)?["']"#,
        r#"(?is)<link[^>]+rel\s*=\s*["']image_src["'][^>]*href\s*=\s*["']([^"']+)["']"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// ページ取得ベースの画像リゾルバ。
#[derive(Debug, Clone)]
pub struct PageImageResolver {
    client: Client,
}

impl PageImageResolver {
    /// # Errors
    /// HTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .context("failed to build image resolver HTTP client")?;
        Ok(Self { client })
    }

    async fn fetch_page(&self, url: &Url) -> Result<(Url, String)> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("article page request failed")?
            .error_for_status()
            .context("article page returned error status")?;
        // リダイレクト後のURLを相対パス解決の基準にする
        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .context("failed to read article page body")?;
        Ok((final_url, html))
    }
}

#[async_trait]
impl ImageResolver for PageImageResolver {
    async fn resolve(&self, link: &str, source: &str) -> ImageOutcome {
        let Ok(url) = Url::parse(link) else {
            debug!(source, "article has no usable link; skipping image lookup");
            return BestEffort::Done(None);
        };

        match self.fetch_page(&url).await {
            Ok((final_url, html)) => {
                if let Some(image) = extract_meta_image(&html, &final_url) {
                    return BestEffort::Done(Some(image));
                }
                BestEffort::Done(favicon_url(&final_url))
            }
            Err(error) => match favicon_url(&url) {
                // ページ取得に失敗してもドメインのファビコンは出せる
                Some(favicon) => {
                    debug!(source, error = %format!("{error:#}"), "falling back to favicon");
                    BestEffort::Done(Some(favicon))
                }
                None => BestEffort::recovered(format!("{error:#}")),
            },
        }
    }
}

/// HTMLから代表画像のURLを抜き出し、`base` からの絶対URLにする。
pub(crate) fn extract_meta_image(html: &str, base: &Url) -> Option<String> {
    META_IMAGE
        .iter()
        .filter_map(|pattern| pattern.captures(html))
        .filter_map(|captures| captures.get(1))
        .map(|value| value.as_str().trim().replace("&amp;", "&"))
        .find(|value| !value.is_empty())
        .and_then(|value| base.join(&value).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
}

/// ホスト名からファビコン取得用URLを作る。
pub(crate) fn favicon_url(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let mut favicon = Url::parse(FAVICON_SERVICE).ok()?;
    favicon
        .query_pairs_mut()
        .append_pair("domain", host)
        .append_pair("sz", "128");
    Some(favicon.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn base() -> Url {
        Url::parse("https://news.example.com/world/story").expect("valid url")
    }

    #[test]
    fn extract_prefers_open_graph_image() {
        let html = r#"<html><head>
            <meta name="twitter:image" content="https://cdn.example.com/twitter.jpg">
            <meta property="og:image" content="https://cdn.example.com/og.jpg?w=1&amp;h=2">
        </head></html>"#;

        assert_eq!(
            extract_meta_image(html, &base()).as_deref(),
            Some("https://cdn.example.com/og.jpg?w=1&h=2")
        );
    }

    #[test]
    fn extract_handles_reversed_attribute_order_and_relative_urls() {
        let html = r#"<meta content="/images/lead.png" property="og:image" />"#;

        assert_eq!(
            extract_meta_image(html, &base()).as_deref(),
            Some("https://news.example.com/images/lead.png")
        );
    }

    #[test]
    fn extract_falls_back_to_twitter_image() {
        let html = r#"<meta name="twitter:image:src" content="https://cdn.example.com/t.jpg">"#;
        assert_eq!(
            extract_meta_image(html, &base()).as_deref(),
            Some("https://cdn.example.com/t.jpg")
        );
    }

    #[test]
    fn extract_returns_none_without_meta() {
        assert!(extract_meta_image("<html><body>no image</body></html>", &base()).is_none());
    }

    #[test]
    fn favicon_url_uses_host() {
        assert_eq!(
            favicon_url(&base()).as_deref(),
            Some("https://www.google.com/s2/favicons?domain=news.example.com&sz=128")
        );
    }

    #[tokio::test]
    async fn resolve_reads_page_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<meta property="og:image" content="https://cdn.example.com/lead.jpg">"#,
            ))
            .mount(&server)
            .await;

        let resolver = PageImageResolver::new(Duration::from_secs(2)).expect("resolver builds");
        let outcome = resolver
            .resolve(&format!("{}/story", server.uri()), "Example")
            .await;

        assert_eq!(
            outcome.flatten().as_deref(),
            Some("https://cdn.example.com/lead.jpg")
        );
    }

    #[tokio::test]
    async fn resolve_falls_back_to_favicon_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = PageImageResolver::new(Duration::from_secs(2)).expect("resolver builds");
        let outcome = resolver
            .resolve(&format!("{}/gone", server.uri()), "Example")
            .await;

        let image = outcome.flatten().expect("favicon fallback");
        assert!(image.starts_with(FAVICON_SERVICE));
        assert!(image.contains("domain=127.0.0.1"));
    }

    #[tokio::test]
    async fn resolve_returns_none_for_empty_link() {
        let resolver = PageImageResolver::new(Duration::from_secs(2)).expect("resolver builds");
        let outcome = resolver.resolve("", "Reuters").await;

        assert!(!outcome.is_recovered());
        assert_eq!(outcome.flatten(), None);
    }
}
