use axum::Json;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct DemoTopic {
    id: &'static str,
    name: &'static str,
}

const DEMO_TOPICS: &[DemoTopic] = &[
    DemoTopic {
        id: "venezuela",
        name: "Venezuelan Crisis",
    },
    DemoTopic {
        id: "iran",
        name: "Iran Crisis",
    },
    DemoTopic {
        id: "farmers",
        name: "Indian Farmers Protest 2020",
    },
    DemoTopic {
        id: "truckers",
        name: "Canadian Trucker Protest 2022",
    },
];

/// フロントエンドのトピック選択に使うデモトピック一覧。
pub(crate) async fn list_topics() -> Json<&'static [DemoTopic]> {
    Json(DEMO_TOPICS)
}
