use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{api, config::Config, observability::Telemetry, pipeline::AnalysisPipeline};

#[derive(Clone)]
pub(crate) struct AppState {
    registry: Arc<ComponentRegistry>,
}

pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    pipeline: Arc<AnalysisPipeline>,
}

impl AppState {
    pub(crate) fn new(registry: ComponentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub(crate) fn telemetry(&self) -> &Telemetry {
        &self.registry.telemetry
    }

    pub(crate) fn config(&self) -> &Config {
        &self.registry.config
    }

    pub(crate) fn pipeline(&self) -> Arc<AnalysisPipeline> {
        Arc::clone(&self.registry.pipeline)
    }
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、アプリケーションの共有レジストリを構築する。
    ///
    /// # Errors
    /// Telemetry の初期化や HTTP クライアント構築が失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let telemetry = Telemetry::new(
            config.otel_exporter_endpoint(),
            config.otel_sampling_ratio(),
        )
        .context("failed to initialize telemetry")?;
        let pipeline = Arc::new(
            AnalysisPipeline::from_config(&config, telemetry.metrics())
                .context("failed to build analysis pipeline")?,
        );

        Ok(Self::from_parts(config, telemetry, pipeline))
    }

    /// 組み立て済みの部品からレジストリを作る。
    #[must_use]
    pub fn from_parts(
        config: Arc<Config>,
        telemetry: Telemetry,
        pipeline: Arc<AnalysisPipeline>,
    ) -> Self {
        Self {
            config,
            telemetry,
            pipeline,
        }
    }

    #[must_use]
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }
}

pub fn build_router(registry: ComponentRegistry) -> Router {
    let state = AppState::new(registry);
    api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
