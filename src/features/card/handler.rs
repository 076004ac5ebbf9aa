use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::post,
};

use super::models::{
    AvatarSource, BackgroundSource, CardColors, RankCardRequest, RankStats, RenderRequest,
};
use crate::{config::CardConfig, error::AppError, state::AppState};

/// 将请求体与服务端默认配置合并为一次渲染请求
pub fn to_render_request(
    req: RankCardRequest,
    defaults: &CardConfig,
) -> Result<RenderRequest, AppError> {
    let background = match req.background.as_ref() {
        None | Some(serde_json::Value::Null) => BackgroundSource::parse(&defaults.background),
        Some(v) => BackgroundSource::from_request_value(v)?,
    };

    Ok(RenderRequest {
        background,
        avatar: AvatarSource::parse(&req.avatar),
        stats: RankStats {
            level: req.level,
            username: req.username,
            current_exp: req.current_exp,
            max_exp: req.max_exp,
        },
        colors: CardColors {
            text: req.text_color.unwrap_or(defaults.text_color),
            bar: req.bar_color.unwrap_or(defaults.bar_color),
        },
    })
}

#[utoipa::path(
    post,
    path = "/card/rank",
    summary = "生成等级卡图片",
    description = "根据头像、用户名、等级与经验值合成 505×259 的等级卡 PNG。背景与配色缺省时使用服务端配置。",
    request_body = RankCardRequest,
    responses(
        (status = 200, description = "PNG bytes of the rank card", content_type = "image/png"),
        (status = 422, description = "Malformed body, invalid image source or experience values", body = AppError),
        (status = 502, description = "Remote image fetch failed", body = AppError),
        (status = 500, description = "Renderer error", body = AppError)
    ),
    tag = "Card"
)]
pub async fn render_rank_card(
    State(state): State<AppState>,
    payload: Result<Json<RankCardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let t_total = Instant::now();
    let Json(req) =
        payload.map_err(|e| AppError::Validation(format!("请求体无效: {}", e.body_text())))?;
    let request = to_render_request(req, &state.card)?;

    let bytes = state.renderer.render(request).await?;

    tracing::info!(
        target: "rank_card_backend::card",
        total_ms = t_total.elapsed().as_millis(),
        size = bytes.len(),
        "等级卡请求完成"
    );

    let mut headers = axum::http::HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok((StatusCode::OK, headers, bytes))
}

pub fn create_card_router() -> Router<AppState> {
    Router::new().route("/card/rank", post(render_rank_card))
}
