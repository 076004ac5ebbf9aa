use utoipa::openapi::server::{ServerBuilder, ServerVariableBuilder};
use utoipa::{Modify, OpenApi};

/// 渲染接口挂载在 `config.api.prefix` 下，`/health` 则挂在根路径。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let api = ServerBuilder::new()
            .url("{api_prefix}")
            .description(Some("业务接口（默认 /api/v1）"))
            .parameter(
                "api_prefix",
                ServerVariableBuilder::new()
                    .default_value("/api/v1")
                    .description(Some(
                        "业务接口前缀：对应 config.api.prefix（可通过 APP_API_PREFIX 覆盖）",
                    )),
            )
            .build();

        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径（/health）"))
            .build();

        openapi.servers = Some(vec![api, root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::card::handler::render_rank_card,
    ),
    components(schemas(
        crate::error::AppError,
        crate::error::CardError,
        crate::error::ProblemDetails,
        crate::features::card::models::RankCardRequest,
        crate::features::health::handler::HealthResponse,
    )),
    modifiers(&ApiServers),
    tags(
        (name = "Card", description = "等级卡：合成头像、背景、等级与经验进度条的 PNG 图片。"),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Rank Card API",
        version = env!("CARGO_PKG_VERSION"),
        description = "等级卡渲染服务（Axum + utoipa）。渲染接口挂载在 `config.api.prefix`（默认 /api/v1）下，OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_lists_card_and_health_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/card/rank"));
        assert!(doc.paths.paths.contains_key("/health"));
        let servers = doc.servers.expect("servers");
        assert_eq!(servers.len(), 2);
    }
}
