//! 代表トピックを事前に分析し、結果キャッシュを温めるオフライン処理。
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::Config;
use crate::observability::Telemetry;
use crate::pipeline::AnalysisPipeline;

/// `--topic` が指定されなかったときに温めるトピック。
pub const DEFAULT_WARM_TOPICS: [&str; 4] = [
    "US attack on Venezuela",
    "Iran Crisis",
    "Trump nobel prize",
    "Carney china deal",
];

/// Configuration for the cache-warming helper.
#[derive(Debug, Clone, Default)]
pub struct WarmConfig {
    pub topics: Vec<String>,
    pub cache_dir: Option<PathBuf>,
}

impl WarmConfig {
    /// 空なら既定のトピック一覧を返す。
    #[must_use]
    pub fn effective_topics(&self) -> Vec<String> {
        if self.topics.is_empty() {
            DEFAULT_WARM_TOPICS.iter().map(ToString::to_string).collect()
        } else {
            self.topics.clone()
        }
    }
}

#[derive(Debug, Default)]
pub struct WarmReport {
    pub cached: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl WarmReport {
    /// 1件以上試行し、すべて失敗したか。
    #[must_use]
    pub fn all_failed(&self) -> bool {
        self.cached.is_empty() && !self.failed.is_empty()
    }
}

/// 環境変数の設定でパイプラインを組み立て、キャッシュを温める。
///
/// # Errors
/// 設定の読み込み、Telemetry の初期化、パイプライン構築に失敗した場合はエラーを返す。
pub async fn warm_cache(config: WarmConfig) -> Result<WarmReport> {
    let mut app_config = Config::from_env().context("failed to load configuration")?;
    if let Some(dir) = &config.cache_dir {
        app_config = app_config.with_result_cache_dir(dir);
    }
    let telemetry = Telemetry::new(
        app_config.otel_exporter_endpoint(),
        app_config.otel_sampling_ratio(),
    )
    .context("failed to initialize telemetry")?;
    let pipeline = AnalysisPipeline::from_config(&app_config, telemetry.metrics())
        .context("failed to build analysis pipeline")?;

    info!(
        cache_dir = %app_config.result_cache_dir().display(),
        "warming result cache"
    );
    Ok(warm_topics(&pipeline, &config.effective_topics()).await)
}

/// トピックを順に分析する。1件の失敗で残りを止めない。
pub async fn warm_topics(pipeline: &AnalysisPipeline, topics: &[String]) -> WarmReport {
    let mut report = WarmReport::default();
    for topic in topics {
        match pipeline.analyze(topic).await {
            Ok(result) => {
                info!(
                    topic = %topic,
                    articles = result.articles.len(),
                    "cached analysis"
                );
                report.cached.push(topic.clone());
            }
            Err(pipeline_error) => {
                error!(topic = %topic, error = %pipeline_error, "failed to warm topic");
                report.failed.push((topic.clone(), pipeline_error.to_string()));
            }
        }
    }
    report
}
