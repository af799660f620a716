use std::{env, net::SocketAddr, num::NonZeroUsize, path::PathBuf, time::Duration};

use thiserror::Error;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

#[derive(Clone, PartialEq)]
pub struct Config {
    http_bind: SocketAddr,
    news_source_base_url: String,
    news_source_locale: String,
    source_max_articles: usize,
    source_timeout: Duration,
    http_max_retries: usize,
    http_backoff_base_ms: u64,
    http_backoff_cap_ms: u64,
    image_fetch_timeout: Duration,
    annotate_concurrency: NonZeroUsize,
    gemini_base_url: String,
    gemini_model: String,
    gemini_api_keys: Vec<String>,
    gemini_timeout: Duration,
    generation_enabled: bool,
    result_cache_dir: PathBuf,
    prompt_max_articles_per_side: usize,
    prompt_max_snippet_chars: usize,
    stance_margin: f64,
    otel_exporter_endpoint: Option<String>,
    otel_sampling_ratio: f64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("http_bind", &self.http_bind)
            .field("news_source_base_url", &self.news_source_base_url)
            .field("news_source_locale", &self.news_source_locale)
            .field("source_max_articles", &self.source_max_articles)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_api_keys", &format!("<{} keys>", self.gemini_api_keys.len()))
            .field("generation_enabled", &self.generation_enabled)
            .field("result_cache_dir", &self.result_cache_dir)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// 環境変数から Bias Worker の設定値を読み込み、検証する。
    ///
    /// すべての値に既定値があり、未設定でも起動できる。
    /// `GEMINI_API_KEYS` が空の場合は要約生成が無効扱いになる。
    ///
    /// # Errors
    /// 数値／アドレス／真偽値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_bind = parse_socket_addr("BIAS_WORKER_HTTP_BIND", "0.0.0.0:5000")?;

        // Article source (Google News RSS)
        let news_source_base_url = env::var("NEWS_SOURCE_BASE_URL")
            .unwrap_or_else(|_| "https://news.google.com/rss/search".to_string());
        let news_source_locale =
            env::var("NEWS_SOURCE_LOCALE").unwrap_or_else(|_| "en-US".to_string());
        let source_max_articles = parse_usize("SOURCE_MAX_ARTICLES", 20)?;
        let source_timeout = parse_duration_ms("SOURCE_TIMEOUT_MS", 10000)?;

        // Retry settings (exponential backoff + jitter)
        let http_max_retries = parse_usize("HTTP_MAX_RETRIES", 3)?;
        let http_backoff_base_ms = parse_u64("HTTP_BACKOFF_BASE_MS", 250)?;
        let http_backoff_cap_ms = parse_u64("HTTP_BACKOFF_CAP_MS", 10000)?;

        let image_fetch_timeout = parse_duration_ms("IMAGE_FETCH_TIMEOUT_MS", 5000)?;
        let annotate_concurrency = parse_non_zero_usize("ANNOTATE_CONCURRENCY", 8)?;

        // Generation backend (Gemini)
        let gemini_base_url = env::var("GEMINI_BASE_URL")
            .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/".to_string());
        let gemini_model =
            env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string());
        let gemini_api_keys = parse_csv("GEMINI_API_KEYS", "");
        let gemini_timeout = parse_duration_secs("GEMINI_TIMEOUT_SECS", 120)?;
        let generation_enabled = parse_bool("GENERATION_ENABLED", true)?;

        let result_cache_dir = PathBuf::from(
            env::var("RESULT_CACHE_DIR").unwrap_or_else(|_| "frontend/public/cache".to_string()),
        );

        let prompt_max_articles_per_side = parse_usize("PROMPT_MAX_ARTICLES_PER_SIDE", 8)?;
        let prompt_max_snippet_chars = parse_usize("PROMPT_MAX_SNIPPET_CHARS", 280)?;
        let stance_margin = parse_f64("STANCE_MARGIN", 1.0)?;
        if stance_margin < 0.0 {
            return Err(ConfigError::Invalid {
                name: "STANCE_MARGIN",
                source: anyhow::anyhow!("must not be negative"),
            });
        }

        // OpenTelemetry settings
        let otel_exporter_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok();
        let otel_sampling_ratio = parse_f64("OTEL_SAMPLING_RATIO", 1.0)?;

        Ok(Self {
            http_bind,
            news_source_base_url,
            news_source_locale,
            source_max_articles,
            source_timeout,
            http_max_retries,
            http_backoff_base_ms,
            http_backoff_cap_ms,
            image_fetch_timeout,
            annotate_concurrency,
            gemini_base_url,
            gemini_model,
            gemini_api_keys,
            gemini_timeout,
            generation_enabled,
            result_cache_dir,
            prompt_max_articles_per_side,
            prompt_max_snippet_chars,
            stance_margin,
            otel_exporter_endpoint,
            otel_sampling_ratio,
        })
    }

    #[must_use]
    pub fn http_bind(&self) -> SocketAddr {
        self.http_bind
    }

    #[must_use]
    pub fn news_source_base_url(&self) -> &str {
        &self.news_source_base_url
    }

    #[must_use]
    pub fn news_source_locale(&self) -> &str {
        &self.news_source_locale
    }

    #[must_use]
    pub fn source_max_articles(&self) -> usize {
        self.source_max_articles
    }

    #[must_use]
    pub fn source_timeout(&self) -> Duration {
        self.source_timeout
    }

    #[must_use]
    pub fn http_max_retries(&self) -> usize {
        self.http_max_retries
    }

    #[must_use]
    pub fn http_backoff_base_ms(&self) -> u64 {
        self.http_backoff_base_ms
    }

    #[must_use]
    pub fn http_backoff_cap_ms(&self) -> u64 {
        self.http_backoff_cap_ms
    }

    #[must_use]
    pub fn image_fetch_timeout(&self) -> Duration {
        self.image_fetch_timeout
    }

    #[must_use]
    pub fn annotate_concurrency(&self) -> NonZeroUsize {
        self.annotate_concurrency
    }

    #[must_use]
    pub fn gemini_base_url(&self) -> &str {
        &self.gemini_base_url
    }

    #[must_use]
    pub fn gemini_model(&self) -> &str {
        &self.gemini_model
    }

    #[must_use]
    pub fn gemini_api_keys(&self) -> &[String] {
        &self.gemini_api_keys
    }

    #[must_use]
    pub fn gemini_timeout(&self) -> Duration {
        self.gemini_timeout
    }

    #[must_use]
    pub fn generation_enabled(&self) -> bool {
        self.generation_enabled
    }

    #[must_use]
    pub fn result_cache_dir(&self) -> &std::path::Path {
        &self.result_cache_dir
    }

    #[must_use]
    pub fn prompt_max_articles_per_side(&self) -> usize {
        self.prompt_max_articles_per_side
    }

    #[must_use]
    pub fn prompt_max_snippet_chars(&self) -> usize {
        self.prompt_max_snippet_chars
    }

    #[must_use]
    pub fn stance_margin(&self) -> f64 {
        self.stance_margin
    }

    #[must_use]
    pub fn otel_exporter_endpoint(&self) -> Option<&str> {
        self.otel_exporter_endpoint.as_deref()
    }

    #[must_use]
    pub fn otel_sampling_ratio(&self) -> f64 {
        self.otel_sampling_ratio
    }

    /// キャッシュ出力先だけを差し替えた設定を返す。
    #[must_use]
    pub fn with_result_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.result_cache_dir = dir.into();
        self
    }
}

fn parse_socket_addr(name: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());

    raw.parse().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_duration_secs(name: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_secs)?;
    Ok(Duration::from_secs(value))
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let value = parse_u64(name, default_ms)?;
    Ok(Duration::from_millis(value))
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("invalid boolean value: {raw}"),
        }),
    }
}

fn parse_csv(name: &'static str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests run sequentially and assign valid UTF-8 values.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn remove_env(name: &str) {
        // SAFETY: tests run sequentially and clean up deterministic keys.
        unsafe {
            env::remove_var(name);
        }
    }

    fn reset_env() {
        for name in [
            "BIAS_WORKER_HTTP_BIND",
            "NEWS_SOURCE_BASE_URL",
            "NEWS_SOURCE_LOCALE",
            "SOURCE_MAX_ARTICLES",
            "SOURCE_TIMEOUT_MS",
            "HTTP_MAX_RETRIES",
            "HTTP_BACKOFF_BASE_MS",
            "HTTP_BACKOFF_CAP_MS",
            "IMAGE_FETCH_TIMEOUT_MS",
            "ANNOTATE_CONCURRENCY",
            "GEMINI_BASE_URL",
            "GEMINI_MODEL",
            "GEMINI_API_KEYS",
            "GEMINI_TIMEOUT_SECS",
            "GENERATION_ENABLED",
            "RESULT_CACHE_DIR",
            "PROMPT_MAX_ARTICLES_PER_SIDE",
            "PROMPT_MAX_SNIPPET_CHARS",
            "STANCE_MARGIN",
            "OTEL_EXPORTER_OTLP_ENDPOINT",
            "OTEL_SAMPLING_RATIO",
        ] {
            remove_env(name);
        }
    }

    #[test]
    fn from_env_uses_defaults_when_optional_missing() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.http_bind(), "0.0.0.0:5000".parse().unwrap());
        assert_eq!(
            config.news_source_base_url(),
            "https://news.google.com/rss/search"
        );
        assert_eq!(config.news_source_locale(), "en-US");
        assert_eq!(config.source_max_articles(), 20);
        assert_eq!(config.source_timeout(), Duration::from_millis(10000));
        assert_eq!(config.http_max_retries(), 3);
        assert_eq!(config.http_backoff_base_ms(), 250);
        assert_eq!(config.http_backoff_cap_ms(), 10000);
        assert_eq!(config.annotate_concurrency().get(), 8);
        assert_eq!(config.gemini_model(), "gemini-2.5-flash");
        assert!(config.gemini_api_keys().is_empty());
        assert!(config.generation_enabled());
        assert_eq!(
            config.result_cache_dir(),
            std::path::Path::new("frontend/public/cache")
        );
        assert_eq!(config.prompt_max_articles_per_side(), 8);
        assert_eq!(config.prompt_max_snippet_chars(), 280);
        assert!((config.stance_margin() - 1.0).abs() < f64::EPSILON);
        assert!(config.otel_exporter_endpoint().is_none());
    }

    #[test]
    fn from_env_overrides_values() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("BIAS_WORKER_HTTP_BIND", "127.0.0.1:8088");
        set_env("NEWS_SOURCE_LOCALE", "en-GB");
        set_env("SOURCE_MAX_ARTICLES", "5");
        set_env("GEMINI_API_KEYS", " key-one-aaaa , ,key-two-bbbb ");
        set_env("GEMINI_MODEL", "gemini-2.0-flash");
        set_env("GENERATION_ENABLED", "off");
        set_env("RESULT_CACHE_DIR", "/tmp/bias-cache");
        set_env("STANCE_MARGIN", "2.5");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.http_bind(), "127.0.0.1:8088".parse().unwrap());
        assert_eq!(config.news_source_locale(), "en-GB");
        assert_eq!(config.source_max_articles(), 5);
        assert_eq!(config.gemini_api_keys(), &["key-one-aaaa", "key-two-bbbb"]);
        assert_eq!(config.gemini_model(), "gemini-2.0-flash");
        assert!(!config.generation_enabled());
        assert_eq!(
            config.result_cache_dir(),
            std::path::Path::new("/tmp/bias-cache")
        );
        assert!((config.stance_margin() - 2.5).abs() < f64::EPSILON);
        reset_env();
    }

    #[test]
    fn from_env_rejects_invalid_numbers() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("SOURCE_MAX_ARTICLES", "many");

        let error = Config::from_env().expect_err("invalid number should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "SOURCE_MAX_ARTICLES",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn from_env_rejects_zero_concurrency() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("ANNOTATE_CONCURRENCY", "0");

        let error = Config::from_env().expect_err("zero concurrency should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "ANNOTATE_CONCURRENCY",
                ..
            }
        ));
        reset_env();
    }

    #[test]
    fn debug_output_hides_api_keys() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("GEMINI_API_KEYS", "super-secret-key-1234");

        let config = Config::from_env().expect("config should load");
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("super-secret-key-1234"));
        assert!(rendered.contains("<1 keys>"));
        reset_env();
    }

    #[test]
    fn cache_dir_override_keeps_other_values() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("SOURCE_MAX_ARTICLES", "7");

        let config = Config::from_env()
            .expect("config should load")
            .with_result_cache_dir("/var/cache/bias");

        assert_eq!(
            config.result_cache_dir(),
            std::path::Path::new("/var/cache/bias")
        );
        assert_eq!(config.source_max_articles(), 7);
        reset_env();
    }
}
