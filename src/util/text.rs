/// テキスト処理ユーティリティ。
///
/// 正規化、語の切り出し、文分割、書記素単位の切り詰めを提供します。
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// 連続する空白を1つにまとめ、前後を取り除く。
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// NFKC正規化と小文字化を施す。
#[must_use]
pub fn normalize(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}

/// 正規化済みの単語列を返す。
#[must_use]
pub fn words(text: &str) -> Vec<String> {
    normalize(text)
        .unicode_words()
        .map(ToString::to_string)
        .collect()
}

/// テキストを文に分割する。
///
/// Unicode UAX#29に準拠した文境界検出を使用します。
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 書記素クラスタ境界で `max_chars` 以内に切り詰める。切り詰めた場合は末尾に `…` を付ける。
#[must_use]
pub fn truncate_graphemes(text: &str, max_chars: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = graphemes[..max_chars].concat();
    truncated.truncate(truncated.trim_end().len());
    truncated.push('…');
    truncated
}

/// 関連度計算から除外するストップワード。
pub(crate) const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "into", "over", "after", "before",
    "about", "amid", "its", "are", "was", "were", "has", "have", "had", "will", "would", "could",
    "should", "says", "said", "new", "news", "what", "who", "why", "how", "when", "where", "than",
    "then", "they", "their", "them", "his", "her", "not", "but", "all", "out", "more", "most",
];

/// ストップワードと3文字未満の語を除いた重要語を返す。
#[must_use]
pub fn key_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for word in words(text) {
        if word.chars().count() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
}
