/// スタンス分類とプロンプト構築の性能ベンチマーク。
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use bias_worker::pipeline::{
    model::{Article, Stance},
    prompt::PromptBuilder,
    stance::{KeywordStanceClassifier, StanceClassifier},
};

const FAVOR_BODY: &str = "Diplomats praised the progress made in the Iran negotiations. \
    Allies welcomed the agreement as a historic breakthrough for the region.";
const AGAINST_BODY: &str = "Critics condemned the Iran concessions as dangerous. \
    Lawmakers did not support the framework and warned of a backlash.";

fn synthetic_articles(count: usize) -> Vec<Article> {
    (0..count)
        .map(|idx| {
            let body = if idx % 2 == 0 { FAVOR_BODY } else { AGAINST_BODY };
            Article::new(
                format!("Iran coverage #{idx}"),
                format!("https://example.com/{idx}"),
                "Reuters",
                body.repeat(4),
            )
        })
        .collect()
}

fn bench_stance_classification(c: &mut Criterion) {
    let articles = synthetic_articles(200);
    let classifier = KeywordStanceClassifier::default();

    c.bench_function("classify_stance_200_articles", |b| {
        b.iter(|| {
            let classified = classifier.classify("Iran Crisis", black_box(articles.clone()));
            black_box(classified.len());
        });
    });
}

fn bench_prompt_building(c: &mut Criterion) {
    let mut articles = synthetic_articles(40);
    for (idx, article) in articles.iter_mut().enumerate() {
        article.stance = Some(if idx % 2 == 0 {
            Stance::InFavor
        } else {
            Stance::Against
        });
    }
    let in_favor: Vec<&Article> = articles.iter().step_by(2).collect();
    let against: Vec<&Article> = articles.iter().skip(1).step_by(2).collect();
    let builder = PromptBuilder::default();

    c.bench_function("build_prompt_40_articles", |b| {
        b.iter(|| {
            let prompt = builder.build_prompt("Iran Crisis", &in_favor, &against);
            black_box(prompt.len());
        });
    });
}

criterion_group!(benches, bench_stance_classification, bench_prompt_building);
criterion_main!(benches);
