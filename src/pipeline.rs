use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, anyhow};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    clients::{GeminiClient, GoogleNewsClient, GoogleNewsConfig, PageImageResolver},
    config::Config,
    observability::metrics::Metrics,
    util::{best_effort::BestEffort, retry::RetryConfig},
};

pub mod annotate;
pub mod gather;
pub mod group;
pub mod model;
pub mod persist;
pub mod prompt;
pub mod score;
pub mod stance;
pub mod summarize;

use annotate::{AnnotateStage, AnnotatedArticle, ConcurrentAnnotateStage, NoImageResolver};
use gather::{GatherStage, SourceError, SourceGatherStage};
use model::{AnalysisResult, Article};
use persist::{FileResultCache, ResultCache};
use prompt::PromptBuilder;
use score::Scorer;
use stance::{KeywordStanceClassifier, StanceClassifier};
use summarize::{CredentialPool, GenerationBackend, Summarizer};

const DEFAULT_ANNOTATE_CONCURRENCY: usize = 8;

/// 1トピックの分析を中断させるエラー。
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to gather articles for topic: {0}")]
    SourceUnavailable(#[from] SourceError),
}

/// gather → score/annotate → classify → group → prompt → summarize → persist を順に実行する。
pub struct AnalysisPipeline {
    stages: PipelineStages,
    metrics: Arc<Metrics>,
}

struct PipelineStages {
    gather: Arc<dyn GatherStage>,
    annotate: Arc<dyn AnnotateStage>,
    stance: Arc<dyn StanceClassifier>,
    prompt: PromptBuilder,
    summarizer: Arc<Summarizer>,
    cache: Arc<dyn ResultCache>,
}

pub struct PipelineBuilder {
    metrics: Arc<Metrics>,
    gather: Option<Arc<dyn GatherStage>>,
    annotate: Option<Arc<dyn AnnotateStage>>,
    stance: Option<Arc<dyn StanceClassifier>>,
    prompt: Option<PromptBuilder>,
    summarizer: Option<Arc<Summarizer>>,
    cache: Option<Arc<dyn ResultCache>>,
}

impl AnalysisPipeline {
    /// 設定から本番用のクライアントとステージを組み立てる。
    ///
    /// # Errors
    /// HTTPクライアントの構築に失敗した場合はエラーを返す。
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> Result<Self> {
        let news_client = GoogleNewsClient::new(GoogleNewsConfig {
            base_url: config.news_source_base_url().to_string(),
            locale: config.news_source_locale().to_string(),
            timeout: config.source_timeout(),
        })?;
        let retry_config = RetryConfig::new(
            config.http_max_retries(),
            config.http_backoff_base_ms(),
            config.http_backoff_cap_ms(),
        );
        let image_resolver = PageImageResolver::new(config.image_fetch_timeout())?;

        let backend: Option<Arc<dyn GenerationBackend>> = if config.generation_enabled() {
            Some(Arc::new(
                GeminiClient::new(
                    config.gemini_base_url(),
                    config.gemini_model(),
                    config.gemini_timeout(),
                )
                .context("failed to build generation backend")?,
            ))
        } else {
            info!("generation backend disabled by configuration");
            None
        };
        let credentials = CredentialPool::new(config.gemini_api_keys().iter().cloned());
        if credentials.is_empty() {
            warn!("no generation credentials configured; summaries will be unavailable");
        }

        Self::builder(metrics)
            .with_gather_stage(Arc::new(SourceGatherStage::new(
                Arc::new(news_client),
                retry_config,
                config.source_max_articles(),
            )))
            .with_annotate_stage(Arc::new(ConcurrentAnnotateStage::new(
                Scorer::new(),
                Arc::new(image_resolver),
                config.annotate_concurrency().get(),
            )))
            .with_stance_classifier(Arc::new(KeywordStanceClassifier::new(
                config.stance_margin(),
            )))
            .with_prompt_builder(PromptBuilder::new(
                config.prompt_max_articles_per_side(),
                config.prompt_max_snippet_chars(),
            ))
            .with_summarizer(Arc::new(Summarizer::new(backend, credentials)))
            .with_result_cache(Arc::new(FileResultCache::new(config.result_cache_dir())))
            .build()
    }

    #[must_use]
    pub fn builder(metrics: Arc<Metrics>) -> PipelineBuilder {
        PipelineBuilder::new(metrics)
    }

    /// 結果キャッシュへの参照。保存済み結果の読み出しに使う。
    #[must_use]
    pub fn cache(&self) -> Arc<dyn ResultCache> {
        Arc::clone(&self.stages.cache)
    }

    /// トピックを分析する。
    ///
    /// 記事ソースの失敗だけが実行を中断させ、画像解決・要約生成・キャッシュ書き込みの失敗は
    /// 結果に織り込んだうえで成功として返す。
    ///
    /// # Errors
    /// 記事ソースが利用できない場合は [`PipelineError::SourceUnavailable`] を返す。
    pub async fn analyze(&self, topic: &str) -> Result<AnalysisResult, PipelineError> {
        let started = Instant::now();
        self.metrics.active_analyses.inc();

        let result = self.run(topic).await;

        self.metrics.active_analyses.dec();
        self.metrics
            .analysis_duration
            .observe(started.elapsed().as_secs_f64());

        match &result {
            Ok(analysis) => {
                self.metrics.analyses_completed.inc();
                info!(
                    topic,
                    article_count = analysis.articles.len(),
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "topic analysis completed"
                );
            }
            Err(error) => {
                self.metrics.analyses_failed.inc();
                warn!(topic, error = %error, "topic analysis failed");
            }
        }

        result
    }

    async fn run(&self, topic: &str) -> Result<AnalysisResult, PipelineError> {
        debug!(topic, "topic analysis started");

        let stage_started = Instant::now();
        let gathered = self.stages.gather.gather(topic).await?;
        self.metrics
            .gather_duration
            .observe(stage_started.elapsed().as_secs_f64());
        self.metrics.articles_gathered.inc_by(as_count(gathered.len()));
        info!(topic, article_count = gathered.len(), "gathered articles");

        let stage_started = Instant::now();
        let annotated = self.stages.annotate.annotate(gathered).await;
        let articles = self.apply_images(annotated);
        self.metrics
            .annotate_duration
            .observe(stage_started.elapsed().as_secs_f64());

        let stage_started = Instant::now();
        let articles = self.stages.stance.classify(topic, articles);
        self.metrics
            .classify_duration
            .observe(stage_started.elapsed().as_secs_f64());

        let prompt = {
            let groups = group::group(&articles);
            self.metrics.articles_neutral.inc_by(as_count(groups.excluded));
            debug!(
                topic,
                in_favor = groups.in_favor.len(),
                against = groups.against.len(),
                excluded = groups.excluded,
                "grouped articles by stance"
            );
            self.stages
                .prompt
                .build_prompt(topic, &groups.in_favor, &groups.against)
        };

        let stage_started = Instant::now();
        let outcome = self.stages.summarizer.summarize_with_outcome(&prompt).await;
        self.metrics
            .summary_duration
            .observe(stage_started.elapsed().as_secs_f64());
        self.metrics
            .credential_failures
            .inc_by(as_count(outcome.failed_attempts()));
        if outcome.is_degraded() {
            self.metrics.summaries_degraded.inc();
            warn!(
                topic,
                failed_attempts = outcome.failed_attempts(),
                "summary generation degraded"
            );
        }

        let result = AnalysisResult {
            topic: topic.to_string(),
            articles,
            summary: outcome.into_text(),
            prompt_used: prompt,
        };

        match self.stages.cache.persist(topic, &result).await {
            BestEffort::Done(path) => {
                info!(topic, path = %path.display(), "analysis result cached");
            }
            BestEffort::Recovered { reason } => {
                self.metrics.cache_writes_failed.inc();
                warn!(topic, reason = %reason, "analysis result was not cached");
            }
        }

        Ok(result)
    }

    /// 画像解決結果を記事に適用する。失敗は `None` に落とす。
    fn apply_images(&self, annotated: Vec<AnnotatedArticle>) -> Vec<Article> {
        annotated
            .into_iter()
            .map(|AnnotatedArticle { mut article, image }| {
                if let Some(reason) = image.reason() {
                    self.metrics.image_fallbacks.inc();
                    debug!(link = %article.link, reason, "image lookup failed; leaving image empty");
                }
                article.image = image.flatten();
                article
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn as_count(value: usize) -> f64 {
    value as f64
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            gather: None,
            annotate: None,
            stance: None,
            prompt: None,
            summarizer: None,
            cache: None,
        }
    }

    #[must_use]
    pub fn with_gather_stage(mut self, stage: Arc<dyn GatherStage>) -> Self {
        self.gather = Some(stage);
        self
    }

    #[must_use]
    pub fn with_annotate_stage(mut self, stage: Arc<dyn AnnotateStage>) -> Self {
        self.annotate = Some(stage);
        self
    }

    #[must_use]
    pub fn with_stance_classifier(mut self, classifier: Arc<dyn StanceClassifier>) -> Self {
        self.stance = Some(classifier);
        self
    }

    #[must_use]
    pub fn with_prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.prompt = Some(builder);
        self
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Arc<Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    #[must_use]
    pub fn with_result_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 記事ソースとキャッシュは必須。それ以外は既定の実装で補う。
    ///
    /// # Errors
    /// 必須ステージが設定されていない場合はエラーを返す。
    pub fn build(self) -> Result<AnalysisPipeline> {
        let stages = PipelineStages {
            gather: self
                .gather
                .ok_or_else(|| anyhow!("gather stage must be configured before build"))?,
            annotate: self.annotate.unwrap_or_else(|| {
                Arc::new(ConcurrentAnnotateStage::new(
                    Scorer::new(),
                    Arc::new(NoImageResolver),
                    DEFAULT_ANNOTATE_CONCURRENCY,
                ))
            }),
            stance: self
                .stance
                .unwrap_or_else(|| Arc::new(KeywordStanceClassifier::default())),
            prompt: self.prompt.unwrap_or_default(),
            summarizer: self
                .summarizer
                .unwrap_or_else(|| Arc::new(Summarizer::new(None, CredentialPool::default()))),
            cache: self
                .cache
                .ok_or_else(|| anyhow!("result cache must be configured before build"))?,
        };

        Ok(AnalysisPipeline {
            stages,
            metrics: self.metrics,
        })
    }
}
