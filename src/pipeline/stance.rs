//! 語彙ベースのスタンス分類。
//!
//! 支持寄りと批判寄りの手がかり語を Aho-Corasick で一括照合し、
//! 位置（タイトルか、トピックに言及する文か）と否定語で重み付けした差分から
//! 記事の立場を決める。判定は記事自身とトピックだけに依存する。
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;

use crate::util::text::{key_terms, split_sentences, words};

use super::model::{Article, Stance};

/// 既定のマージン。`|favor - against|` がこれ未満なら NEUTRAL。
pub const DEFAULT_STANCE_MARGIN: f64 = 1.0;

const TITLE_WEIGHT: f64 = 2.0;
const TOPIC_SENTENCE_WEIGHT: f64 = 1.5;

const NEGATORS: &[&str] = &["not", "no", "never", "without"];
const NEGATION_WINDOW: usize = 3;

pub trait StanceClassifier: Send + Sync {
    /// 入力と同じ長さ・順序で、各記事にちょうど1つのスタンスを付けて返す。
    fn classify(&self, topic: &str, articles: Vec<Article>) -> Vec<Article>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Polarity {
    Favor,
    Against,
}

impl Polarity {
    fn flipped(self) -> Self {
        match self {
            Self::Favor => Self::Against,
            Self::Against => Self::Favor,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Cue {
    phrase: &'static str,
    polarity: Polarity,
    weight: f64,
}

const fn favor(phrase: &'static str, weight: f64) -> Cue {
    Cue {
        phrase,
        polarity: Polarity::Favor,
        weight,
    }
}

const fn against(phrase: &'static str, weight: f64) -> Cue {
    Cue {
        phrase,
        polarity: Polarity::Against,
        weight,
    }
}

const CUES: &[Cue] = &[
    favor("support", 1.0),
    favor("supports", 1.0),
    favor("supported", 1.0),
    favor("supporters", 1.0),
    favor("backs", 1.0),
    favor("backed", 1.0),
    favor("praise", 1.0),
    favor("praised", 1.0),
    favor("praises", 1.0),
    favor("welcome", 1.0),
    favor("welcomes", 1.0),
    favor("welcomed", 1.0),
    favor("endorse", 1.0),
    favor("endorses", 1.0),
    favor("endorsed", 1.0),
    favor("applaud", 1.0),
    favor("applauds", 1.0),
    favor("hails", 1.0),
    favor("hailed", 1.0),
    favor("celebrate", 1.0),
    favor("celebrates", 1.0),
    favor("success", 1.0),
    favor("successful", 1.0),
    favor("breakthrough", 1.5),
    favor("progress", 1.0),
    favor("agreement reached", 1.5),
    favor("deal reached", 1.5),
    favor("peace deal", 1.5),
    favor("ceasefire holds", 1.5),
    favor("victory", 1.0),
    favor("benefit", 1.0),
    favor("benefits", 1.0),
    favor("justified", 1.0),
    favor("necessary", 1.0),
    favor("defends", 1.0),
    favor("boost", 1.0),
    favor("boosts", 1.0),
    favor("historic", 1.0),
    favor("landmark", 1.0),
    favor("legitimate", 1.0),
    against("condemn", 1.5),
    against("condemns", 1.5),
    against("condemned", 1.5),
    against("criticize", 1.0),
    against("criticizes", 1.0),
    against("criticized", 1.0),
    against("criticism", 1.0),
    against("critics", 1.0),
    against("oppose", 1.0),
    against("opposes", 1.0),
    against("opposed", 1.0),
    against("reject", 1.0),
    against("rejects", 1.0),
    against("rejected", 1.0),
    against("denounce", 1.5),
    against("denounces", 1.5),
    against("denounced", 1.5),
    against("slams", 1.0),
    against("illegal", 1.0),
    against("unlawful", 1.0),
    against("violation", 1.0),
    against("violations", 1.0),
    against("backlash", 1.0),
    against("crackdown", 1.0),
    against("failure", 1.0),
    against("threat", 1.0),
    against("threatens", 1.0),
    against("warns", 1.0),
    against("accuse", 1.0),
    against("accuses", 1.0),
    against("accused", 1.0),
    against("blame", 1.0),
    against("blames", 1.0),
    against("outrage", 1.0),
    against("controversial", 1.0),
    against("dangerous", 1.0),
    against("war crime", 2.0),
    against("war crimes", 2.0),
    against("human rights abuses", 2.0),
];

static LEXICON: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .match_kind(MatchKind::LeftmostLongest)
        .ascii_case_insensitive(true)
        .build(CUES.iter().map(|cue| cue.phrase))
        .expect("stance lexicon must compile")
});

/// 支持・批判の重み付き合計。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    favor: f64,
    against: f64,
    cues: usize,
}

impl Tally {
    fn add(&mut self, polarity: Polarity, weight: f64) {
        match polarity {
            Polarity::Favor => self.favor += weight,
            Polarity::Against => self.against += weight,
        }
        self.cues += 1;
    }
}

/// 手がかり語の重み付き差分でスタンスを決める分類器。
#[derive(Debug, Clone, Copy)]
pub struct KeywordStanceClassifier {
    margin: f64,
}

impl Default for KeywordStanceClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_STANCE_MARGIN)
    }
}

impl KeywordStanceClassifier {
    #[must_use]
    pub fn new(margin: f64) -> Self {
        Self {
            margin: margin.max(0.0),
        }
    }

    /// 1記事のスタンスを判定する。
    #[must_use]
    pub fn stance_for(&self, topic_terms: &[String], article: &Article) -> Stance {
        let mut tally = Tally::default();
        tally_text(&article.title, topic_terms, TITLE_WEIGHT, &mut tally);
        for sentence in split_sentences(&article.content) {
            tally_text(&sentence, topic_terms, 1.0, &mut tally);
        }

        let net = tally.favor - tally.against;
        if tally.cues == 0 || net.abs() < self.margin || net.abs() < f64::EPSILON {
            Stance::Neutral
        } else if net > 0.0 {
            Stance::InFavor
        } else {
            Stance::Against
        }
    }
}

impl StanceClassifier for KeywordStanceClassifier {
    fn classify(&self, topic: &str, articles: Vec<Article>) -> Vec<Article> {
        let topic_terms = key_terms(topic);
        articles
            .into_iter()
            .map(|mut article| {
                article.stance = Some(self.stance_for(&topic_terms, &article));
                article
            })
            .collect()
    }
}

fn tally_text(sentence: &str, topic_terms: &[String], base_weight: f64, tally: &mut Tally) {
    let multiplier = if mentions_topic(sentence, topic_terms) {
        base_weight * TOPIC_SENTENCE_WEIGHT
    } else {
        base_weight
    };

    for found in LEXICON.find_iter(sentence) {
        if !is_word_bounded(sentence, found.start(), found.end()) {
            continue;
        }
        let cue = CUES[found.pattern().as_usize()];
        let polarity = if is_negated(&sentence[..found.start()]) {
            cue.polarity.flipped()
        } else {
            cue.polarity
        };
        tally.add(polarity, cue.weight * multiplier);
    }
}

fn mentions_topic(sentence: &str, topic_terms: &[String]) -> bool {
    if topic_terms.is_empty() {
        return false;
    }
    let sentence_words = words(sentence);
    topic_terms.iter().any(|term| sentence_words.contains(term))
}

/// 一致範囲の前後が英数字でないことを確かめる。
fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}

/// 直前の3語以内に否定語があるか。
fn is_negated(prefix: &str) -> bool {
    let window: Vec<String> = prefix
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|word| !word.is_empty())
        .rev()
        .take(NEGATION_WINDOW)
        .map(str::to_lowercase)
        .collect();

    // window は近い語から順に並ぶ
    window
        .iter()
        .any(|word| NEGATORS.contains(&word.as_str()) || word.ends_with("n't"))
        || window
            .windows(2)
            .any(|pair| pair[0] == "to" && matches!(pair[1].as_str(), "fails" | "fail" | "failed"))
}
