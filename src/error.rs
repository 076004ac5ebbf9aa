use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 请求体无法解析或字段类型不符
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 等级卡渲染错误
    #[error("等级卡渲染错误: {0}")]
    Card(#[from] CardError),
}

/// 等级卡渲染错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum CardError {
    /// 背景来源类型不受支持，或文件流不满足“可定位/可读/二进制”要求
    #[error("无效的图片类型: {0}")]
    InvalidImageType(String),

    /// 远程图片返回非成功状态码
    #[error("无效的图片地址: {0}")]
    InvalidImageUrl(String),

    /// 头像来源不是 HTTP(S) 地址
    #[error("不支持的头像来源: {0}")]
    UnsupportedAvatarSource(String),

    /// 升级所需经验为 0，无法计算进度
    #[error("升级所需经验不能为 0")]
    DivisionByZero,

    /// 网络请求错误
    #[error("网络错误: {0}")]
    Network(String),

    /// 上游请求超时
    #[error("请求超时: {0}")]
    Timeout(String),

    /// 图片解码失败
    #[error("图片解码失败: {0}")]
    Decode(String),

    /// 本地文件或内置素材读取失败
    #[error("I/O 错误: {0}")]
    Io(String),

    /// 图层栅格化失败
    #[error("渲染失败: {0}")]
    Render(String),

    /// PNG 编码失败
    #[error("PNG 编码失败: {0}")]
    Encode(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Validation Failed")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 422)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "CARD_INVALID_IMAGE_URL")]
    pub code: String,

    /// 可选：请求追踪 ID。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl CardError {
    fn status_code(&self) -> StatusCode {
        match self {
            CardError::InvalidImageType(_)
            | CardError::InvalidImageUrl(_)
            | CardError::UnsupportedAvatarSource(_)
            | CardError::DivisionByZero
            | CardError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CardError::Network(_) => StatusCode::BAD_GATEWAY,
            CardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            CardError::Io(_) | CardError::Render(_) | CardError::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            CardError::InvalidImageType(_) => "CARD_INVALID_IMAGE_TYPE",
            CardError::InvalidImageUrl(_) => "CARD_INVALID_IMAGE_URL",
            CardError::UnsupportedAvatarSource(_) => "CARD_UNSUPPORTED_AVATAR",
            CardError::DivisionByZero => "CARD_DIVISION_BY_ZERO",
            CardError::Network(_) => "UPSTREAM_ERROR",
            CardError::Timeout(_) => "UPSTREAM_TIMEOUT",
            CardError::Decode(_) => "CARD_DECODE_FAILED",
            CardError::Io(_) => "CARD_ASSET_ERROR",
            CardError::Render(_) | CardError::Encode(_) => "IMAGE_RENDER_FAILED",
        }
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Card(e) => e.status_code(),
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Card(e) => e.stable_code(),
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::BAD_GATEWAY => "Bad Gateway",
            StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.stable_code(), "{}", self);
        }

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<reqwest::Error> for CardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CardError::Timeout(err.to_string())
        } else {
            CardError::Network(err.to_string())
        }
    }
}

impl From<image::ImageError> for CardError {
    fn from(err: image::ImageError) -> Self {
        CardError::Decode(err.to_string())
    }
}

impl From<png::EncodingError> for CardError {
    fn from(err: png::EncodingError) -> Self {
        CardError::Encode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, CardError};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use std::time::Duration;

    async fn start_hanging_http_server() -> std::net::SocketAddr {
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tcp listener");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            loop {
                let (socket, _) = match listener.accept().await {
                    Ok(v) => v,
                    Err(_) => break,
                };
                tokio::spawn(async move {
                    // 不返回任何 HTTP 响应，触发客户端 read timeout。
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    drop(socket);
                });
            }
        });

        addr
    }

    #[tokio::test]
    async fn card_error_from_reqwest_timeout_is_timeout() {
        let addr = start_hanging_http_server().await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("build reqwest client");

        let err = client
            .get(format!("http://{addr}/avatar.png"))
            .send()
            .await
            .expect_err("expected timeout");
        assert!(err.is_timeout(), "expected reqwest timeout, got: {err}");

        let ce: CardError = err.into();
        assert!(
            matches!(ce, CardError::Timeout(_)),
            "expected CardError::Timeout, got: {ce:?}"
        );
    }

    #[test]
    fn card_errors_map_to_stable_statuses() {
        let cases = [
            (
                CardError::InvalidImageType("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CardError::InvalidImageUrl("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CardError::DivisionByZero, StatusCode::UNPROCESSABLE_ENTITY),
            (CardError::Network("x".into()), StatusCode::BAD_GATEWAY),
            (CardError::Timeout("x".into()), StatusCode::GATEWAY_TIMEOUT),
            (CardError::Io("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let resp = AppError::from(err).into_response();
            assert_eq!(resp.status(), expected);
        }
    }
}
