use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use crate::config::AppConfig;
use crate::cors::build_cors_layer;
use crate::features::{card::create_card_router, health::health_check};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 组装完整路由：`/health`、`/api-docs/openapi.json` 与前缀下的渲染接口
pub fn build_router(config: &AppConfig, state: AppState) -> Router {
    let api_router = Router::<AppState>::new().merge(create_card_router());

    let prefix = config.api.prefix.trim_end_matches('/');
    let root = Router::<AppState>::new()
        .route("/health", get(health_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));
    // 根路径不能 nest，前缀为空时直接合并
    let root = if prefix.is_empty() {
        root.merge(api_router)
    } else {
        root.nest(prefix, api_router)
    };

    let mut app = root
        .with_state(state)
        .layer(axum::middleware::from_fn(request_id_middleware));

    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }
    app
}
