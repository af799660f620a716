//! Scoring functions for gathered articles.
//!
//! Every score is a pure function of the article's title, content and source,
//! monotonic in its input signal and clamped to a documented range.

use crate::util::text::{key_terms, normalize, words};

use super::model::{Article, ArticleScores};

/// Words per article at which `length_quality` saturates.
const FULL_LENGTH_WORDS: f64 = 60.0;
/// Loaded-term density (per word) at which `bias_score_1_to_10` saturates is `1 / LOADED_DENSITY_GAIN`.
const LOADED_DENSITY_GAIN: f64 = 12.0;
const DEFAULT_RELIABILITY: f64 = 5.0;

/// Publisher reputation table, matched as a case-insensitive substring of the source name.
const PUBLISHER_RELIABILITY: &[(&str, f64)] = &[
    ("reuters", 10.0),
    ("associated press", 10.0),
    ("ap news", 10.0),
    ("bbc", 9.0),
    ("npr", 9.0),
    ("financial times", 9.0),
    ("the economist", 9.0),
    ("wall street journal", 8.5),
    ("new york times", 8.5),
    ("washington post", 8.5),
    ("the guardian", 8.0),
    ("al jazeera", 8.0),
    ("bloomberg", 8.0),
    ("cbc", 8.0),
    ("the hindu", 8.0),
    ("cnn", 7.0),
    ("politico", 7.0),
    ("axios", 7.0),
    ("the hill", 7.0),
    ("fox news", 6.0),
    ("new york post", 6.0),
    ("daily mail", 5.5),
];

/// Emotive or loaded vocabulary counted towards `bias_score_1_to_10`.
const LOADED_TERMS: &[&str] = &[
    "slams", "blasts", "destroys", "outrage", "outrageous", "shocking", "disaster", "disastrous",
    "catastrophe", "catastrophic", "radical", "extremist", "regime", "thug", "thugs", "tyrant",
    "corrupt", "disgrace", "disgraceful", "chaos", "chaotic", "betrayal", "betrays", "evil",
    "heroic", "historic", "triumph", "humiliating", "humiliation", "crushing", "crushes",
    "devastating", "war-mongering", "propaganda", "brutal", "atrocity", "atrocities", "traitor",
    "fake", "hoax", "scandal", "meltdown", "furious", "stunning",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer;

impl Scorer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// 記事のスコアを計算する。記事自体は変更しない。
    #[must_use]
    pub fn score(&self, article: &Article) -> ArticleScores {
        let relevance = relevance(article);
        let length_quality = length_quality(&article.content);
        let reliability_score = reliability(&article.source);
        let bias_score_1_to_10 = bias_score(article);
        let overall = (0.4 * relevance + 0.3 * length_quality + 0.3 * (reliability_score / 10.0))
            .clamp(0.0, 1.0);

        ArticleScores {
            relevance: round2(relevance),
            length_quality: round2(length_quality),
            reliability_score: round2(reliability_score),
            bias_score_1_to_10: round2(bias_score_1_to_10),
            overall: round2(overall),
        }
    }
}

/// Share of the title's key terms that the content repeats. `[0, 1]`.
fn relevance(article: &Article) -> f64 {
    let title_terms = key_terms(&article.title);
    if title_terms.is_empty() {
        return 0.0;
    }
    let content_words = words(&article.content);
    if content_words.is_empty() {
        return 0.5;
    }
    let covered = title_terms
        .iter()
        .filter(|term| content_words.contains(term))
        .count();
    ratio(covered, title_terms.len()).clamp(0.0, 1.0)
}

fn length_quality(content: &str) -> f64 {
    (count_as_f64(words(content).len()) / FULL_LENGTH_WORDS).min(1.0)
}

fn reliability(source: &str) -> f64 {
    let source = normalize(source);
    PUBLISHER_RELIABILITY
        .iter()
        .find(|(name, _)| source.contains(name))
        .map_or(DEFAULT_RELIABILITY, |(_, score)| *score)
}

/// `1 + 9 * min(loaded_density * gain, 1)`. `[1, 10]`.
fn bias_score(article: &Article) -> f64 {
    let mut all_words = words(&article.title);
    all_words.extend(words(&article.content));
    if all_words.is_empty() {
        return 1.0;
    }
    let loaded = all_words
        .iter()
        .filter(|word| LOADED_TERMS.contains(&word.as_str()))
        .count();
    let density = ratio(loaded, all_words.len());
    1.0 + 9.0 * (density * LOADED_DENSITY_GAIN).min(1.0)
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    count_as_f64(part) / count_as_f64(whole)
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(count: usize) -> f64 {
    count as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
