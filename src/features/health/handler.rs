use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

use crate::features::card::assets::missing_assets;
use crate::state::AppState;

/// 探活结果：服务可用且等级卡素材齐全时为 `healthy`
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy` 或 `degraded`
    #[schema(example = "healthy")]
    pub status: String,
    #[schema(example = "rank-card-backend")]
    pub service: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 素材目录
    #[schema(example = "./resources/card")]
    pub assets_dir: String,
    /// 缺失的素材文件（为空表示可以渲染）
    pub missing_assets: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "返回服务版本与等级卡素材是否齐全；缺少素材时返回 503。",
    responses(
        (status = 200, description = "可以渲染", body = HealthResponse),
        (status = 503, description = "素材缺失，渲染会失败", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let dir = state.card.assets_path();
    let missing: Vec<String> = missing_assets(&dir, &state.card.assets)
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    let (code, status) = if missing.is_empty() {
        (StatusCode::OK, "healthy")
    } else {
        tracing::warn!(?missing, "等级卡素材缺失");
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            assets_dir: state.card.assets_dir.clone(),
            missing_assets: missing,
        }),
    )
}
