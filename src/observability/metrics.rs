/// Prometheusメトリクス定義。
use prometheus::{
    Counter, Gauge, Histogram, Registry, register_counter_with_registry,
    register_gauge_with_registry, register_histogram_with_registry,
};
use std::sync::Arc;

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub articles_gathered: Counter,
    pub articles_neutral: Counter,
    pub analyses_completed: Counter,
    pub analyses_failed: Counter,
    pub credential_failures: Counter,
    pub summaries_degraded: Counter,
    pub cache_writes_failed: Counter,
    pub image_fallbacks: Counter,

    // ヒストグラム
    pub gather_duration: Histogram,
    pub annotate_duration: Histogram,
    pub classify_duration: Histogram,
    pub summary_duration: Histogram,
    pub analysis_duration: Histogram,

    // ゲージ
    pub active_analyses: Gauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成する。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            articles_gathered: register_counter_with_registry!(
                "bias_articles_gathered_total",
                "Total number of articles gathered from the news source",
                registry
            )?,
            articles_neutral: register_counter_with_registry!(
                "bias_articles_neutral_total",
                "Articles classified NEUTRAL and excluded from both stance groups",
                registry
            )?,
            analyses_completed: register_counter_with_registry!(
                "bias_analyses_completed_total",
                "Total number of topic analyses completed",
                registry
            )?,
            analyses_failed: register_counter_with_registry!(
                "bias_analyses_failed_total",
                "Total number of topic analyses aborted because the source was unavailable",
                registry
            )?,
            credential_failures: register_counter_with_registry!(
                "bias_generation_credential_failures_total",
                "Generation attempts that failed for a single credential",
                registry
            )?,
            summaries_degraded: register_counter_with_registry!(
                "bias_summaries_degraded_total",
                "Analyses whose summary is a failure or unavailability message",
                registry
            )?,
            cache_writes_failed: register_counter_with_registry!(
                "bias_cache_writes_failed_total",
                "Result cache writes that failed and were recovered",
                registry
            )?,
            image_fallbacks: register_counter_with_registry!(
                "bias_image_fallbacks_total",
                "Image lookups that failed and fell back to no image",
                registry
            )?,
            gather_duration: register_histogram_with_registry!(
                "bias_gather_duration_seconds",
                "Duration of article gathering",
                registry
            )?,
            annotate_duration: register_histogram_with_registry!(
                "bias_annotate_duration_seconds",
                "Duration of scoring and image annotation",
                registry
            )?,
            classify_duration: register_histogram_with_registry!(
                "bias_classify_duration_seconds",
                "Duration of stance classification",
                registry
            )?,
            summary_duration: register_histogram_with_registry!(
                "bias_summary_duration_seconds",
                "Duration of summary generation including credential fallback",
                registry
            )?,
            analysis_duration: register_histogram_with_registry!(
                "bias_analysis_duration_seconds",
                "Duration of an entire topic analysis",
                registry
            )?,
            active_analyses: register_gauge_with_registry!(
                "bias_active_analyses",
                "Number of analyses currently running",
                registry
            )?,
        })
    }

    /// 独立したレジストリに登録したメトリクスを作る。テストや単発のバイナリ向け。
    pub fn unregistered() -> Result<Self, prometheus::Error> {
        Self::new(Arc::new(Registry::new()))
    }
}
