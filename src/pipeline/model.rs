//! パイプライン全体で受け渡すデータモデル。
use serde::{Deserialize, Serialize};

/// 記事がトピックに対してとる立場。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stance {
    InFavor,
    Against,
    /// 判定不能な記事に割り当てる既定値。
    Neutral,
}

impl Stance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InFavor => "IN_FAVOR",
            Self::Against => "AGAINST",
            Self::Neutral => "NEUTRAL",
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scorer が付与する名前付きスコア。
///
/// 値域:
/// - `relevance`, `length_quality`, `overall`: `[0, 1]`
/// - `reliability_score`: `[0, 10]`
/// - `bias_score_1_to_10`: `[1, 10]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArticleScores {
    pub relevance: f64,
    pub length_quality: f64,
    pub reliability_score: f64,
    pub bias_score_1_to_10: f64,
    pub overall: f64,
}

/// 1回の実行中にパイプラインが所有する記事レコード。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    #[serde(default)]
    pub link: String,
    pub source: String,
    #[serde(default, alias = "body_or_snippet")]
    pub content: String,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub scores: Option<ArticleScores>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub stance: Option<Stance>,
}

impl Article {
    /// スコア・画像・スタンス未設定の記事を作る。
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source: source.into(),
            content: content.into(),
            published: None,
            scores: None,
            image: None,
            stance: None,
        }
    }

    #[must_use]
    pub fn with_published(mut self, published: Option<String>) -> Self {
        self.published = published;
        self
    }
}

/// 1回のパイプライン実行の最終成果物。構築後は変更しない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub topic: String,
    pub articles: Vec<Article>,
    pub summary: String,
    pub prompt_used: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stance_serializes_in_screaming_snake_case() {
        let json = serde_json::to_string(&Stance::InFavor).expect("serialize");
        assert_eq!(json, "\"IN_FAVOR\"");
        let parsed: Stance = serde_json::from_str("\"AGAINST\"").expect("deserialize");
        assert_eq!(parsed, Stance::Against);
    }

    #[test]
    fn unscored_article_serializes_null_fields() {
        let article = Article::new("Title", "", "Reuters", "Body");
        let value = serde_json::to_value(&article).expect("serialize");

        assert!(value["scores"].is_null());
        assert!(value["image"].is_null());
        assert!(value["stance"].is_null());
        assert_eq!(value["content"], "Body");
    }

    #[test]
    fn article_accepts_body_or_snippet_alias() {
        let article: Article = serde_json::from_value(serde_json::json!({
            "title": "T",
            "source": "S",
            "body_or_snippet": "snippet text"
        }))
        .expect("deserialize");

        assert_eq!(article.content, "snippet text");
        assert!(article.link.is_empty());
    }
}
