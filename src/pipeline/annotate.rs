use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use crate::util::best_effort::BestEffort;

use super::{model::Article, score::Scorer};

/// 画像解決の結果。失敗は `Recovered` として返り、呼び出し側で `None` に落とす。
pub type ImageOutcome = BestEffort<Option<String>>;

/// 記事リンクと配信元から代表画像を探す外部ケイパビリティ。決して失敗を返さない。
#[async_trait]
pub trait ImageResolver: Send + Sync {
    async fn resolve(&self, link: &str, source: &str) -> ImageOutcome;
}

/// スコア付与済みの記事と、まだ適用していない画像解決結果。
#[derive(Debug, Clone)]
pub struct AnnotatedArticle {
    pub article: Article,
    pub image: ImageOutcome,
}

#[async_trait]
pub trait AnnotateStage: Send + Sync {
    /// 入力順を保ったまま各記事にスコアを付け、画像を解決する。
    async fn annotate(&self, articles: Vec<Article>) -> Vec<AnnotatedArticle>;
}

/// 記事ごとのスコア計算と画像解決を並行実行するステージ。
pub struct ConcurrentAnnotateStage {
    scorer: Scorer,
    images: Arc<dyn ImageResolver>,
    concurrency: usize,
}

impl ConcurrentAnnotateStage {
    pub fn new(scorer: Scorer, images: Arc<dyn ImageResolver>, concurrency: usize) -> Self {
        Self {
            scorer,
            images,
            concurrency: concurrency.max(1),
        }
    }
}

#[async_trait]
impl AnnotateStage for ConcurrentAnnotateStage {
    async fn annotate(&self, articles: Vec<Article>) -> Vec<AnnotatedArticle> {
        // buffered は完了順ではなく投入順で結果を返す
        stream::iter(articles)
            .map(|mut article| {
                let images = Arc::clone(&self.images);
                let scorer = self.scorer;
                async move {
                    article.scores = Some(scorer.score(&article));
                    let image = images.resolve(&article.link, &article.source).await;
                    AnnotatedArticle { article, image }
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// 画像解決を行わないリゾルバ。画像取得を無効化した構成とテストで使う。
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImageResolver;

#[async_trait]
impl ImageResolver for NoImageResolver {
    async fn resolve(&self, _link: &str, _source: &str) -> ImageOutcome {
        BestEffort::Done(None)
    }
}
