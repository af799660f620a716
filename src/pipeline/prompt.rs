//! 要約生成に渡すプロンプトの組み立て。
//!
//! 同じ入力からは常にバイト単位で同じ文字列を返す。
use crate::util::text::{collapse_whitespace, truncate_graphemes};

use super::model::Article;

pub const DEFAULT_MAX_ARTICLES_PER_SIDE: usize = 8;
pub const DEFAULT_MAX_SNIPPET_CHARS: usize = 280;

const PREAMBLE: &str = "You are a neutral media analyst. Compare how different outlets cover the \
topic below and write a balanced, bias-aware summary.";

const INSTRUCTIONS: &[&str] = &[
    "Summarize the main arguments made by each side.",
    "Point out loaded language or framing differences between the sides.",
    "Close with the facts that both sides agree on.",
    "If one side has no articles, say so instead of inventing its position.",
];

#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    max_articles_per_side: usize,
    max_snippet_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARTICLES_PER_SIDE, DEFAULT_MAX_SNIPPET_CHARS)
    }
}

impl PromptBuilder {
    #[must_use]
    pub fn new(max_articles_per_side: usize, max_snippet_chars: usize) -> Self {
        Self {
            max_articles_per_side,
            max_snippet_chars,
        }
    }

    /// トピックと両陣営の記事からプロンプトを組み立てる。
    #[must_use]
    pub fn build_prompt(&self, topic: &str, in_favor: &[&Article], against: &[&Article]) -> String {
        let mut prompt = String::new();
        prompt.push_str(PREAMBLE);
        prompt.push_str("\n\nTopic: ");
        prompt.push_str(&collapse_whitespace(topic));
        prompt.push_str("\n\n");

        self.render_side(&mut prompt, "Coverage in favor", in_favor);
        prompt.push('\n');
        self.render_side(&mut prompt, "Coverage against", against);

        prompt.push_str("\nInstructions:\n");
        for instruction in INSTRUCTIONS {
            prompt.push_str("- ");
            prompt.push_str(instruction);
            prompt.push('\n');
        }
        prompt
    }

    fn render_side(&self, prompt: &mut String, heading: &str, articles: &[&Article]) {
        let shown = articles.len().min(self.max_articles_per_side);
        if shown < articles.len() {
            prompt.push_str(&format!(
                "{heading} (showing {shown} of {} articles):\n",
                articles.len()
            ));
        } else {
            prompt.push_str(&format!("{heading} ({} articles):\n", articles.len()));
        }

        if articles.is_empty() {
            prompt.push_str("(no articles)\n");
            return;
        }

        for (index, article) in articles.iter().take(shown).enumerate() {
            let source = if article.source.is_empty() {
                "unknown source"
            } else {
                article.source.as_str()
            };
            prompt.push_str(&format!(
                "{}. {} ({source})\n",
                index + 1,
                collapse_whitespace(&article.title)
            ));

            let snippet = truncate_graphemes(
                &collapse_whitespace(&article.content),
                self.max_snippet_chars,
            );
            if !snippet.is_empty() {
                prompt.push_str("   ");
                prompt.push_str(&snippet);
                prompt.push('\n');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, source: &str, content: &str) -> Article {
        Article::new(title, "https://example.com", source, content)
    }

    #[test]
    fn build_prompt_is_deterministic() {
        let a = article("Allies welcome deal", "Reuters", "Body A");
        let b = article("Critics condemn deal", "AP", "Body B");
        let builder = PromptBuilder::default();

        let first = builder.build_prompt("iran", &[&a], &[&b]);
        let second = builder.build_prompt("iran", &[&a], &[&b]);

        assert_eq!(first, second);
        assert!(first.contains("Topic: iran"));
        assert!(first.contains("1. Allies welcome deal (Reuters)\n   Body A\n"));
        assert!(first.contains("1. Critics condemn deal (AP)\n   Body B\n"));
        let favor_at = first.find("Coverage in favor").expect("favor section");
        let against_at = first.find("Coverage against").expect("against section");
        assert!(favor_at < against_at);
    }

    #[test]
    fn empty_groups_render_explicit_marker() {
        let prompt = PromptBuilder::default().build_prompt("obscure", &[], &[]);

        assert_eq!(prompt.matches("(no articles)").count(), 2);
        assert!(prompt.contains("Coverage in favor (0 articles):"));
    }

    #[test]
    fn sides_are_capped_in_order() {
        let articles: Vec<Article> = (0..5)
            .map(|i| article(&format!("Title {i}"), "AP", ""))
            .collect();
        let refs: Vec<&Article> = articles.iter().collect();

        let prompt = PromptBuilder::new(3, 280).build_prompt("t", &refs, &[]);

        assert!(prompt.contains("Coverage in favor (showing 3 of 5 articles):"));
        assert!(prompt.contains("3. Title 2"));
        assert!(!prompt.contains("Title 3"));
    }

    #[test]
    fn snippets_are_truncated_on_grapheme_boundaries() {
        let long = article("Long read", "BBC", &"é".repeat(50));
        let prompt = PromptBuilder::new(8, 10).build_prompt("t", &[&long], &[]);

        assert!(prompt.contains(&format!("   {}…\n", "é".repeat(10))));
    }
}
