use super::model::{Article, Stance};

/// スタンス別に分割した記事への参照。
///
/// NEUTRAL と未分類の記事はどちらの側にも入らず、件数だけ `excluded` に残る。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StanceGroups<'a> {
    pub in_favor: Vec<&'a Article>,
    pub against: Vec<&'a Article>,
    pub excluded: usize,
}

impl StanceGroups<'_> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_favor.is_empty() && self.against.is_empty()
    }
}

/// 分類済み記事を相対順序を保ったまま支持側と批判側に分ける。
#[must_use]
pub fn group(articles: &[Article]) -> StanceGroups<'_> {
    let mut groups = StanceGroups::default();
    for article in articles {
        match article.stance {
            Some(Stance::InFavor) => groups.in_favor.push(article),
            Some(Stance::Against) => groups.against.push(article),
            Some(Stance::Neutral) | None => groups.excluded += 1,
        }
    }
    groups
}
