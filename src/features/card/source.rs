use reqwest::Client;

use super::models::{AvatarSource, BackgroundSource};
use crate::error::CardError;

/// 取回一张远程图片的完整字节（单次请求，不重试）
///
/// 非 2xx 状态码返回 `InvalidImageUrl`；超时由 `client` 自身的配置决定。
pub async fn fetch_image(client: &Client, url: &str) -> Result<Vec<u8>, CardError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        tracing::warn!(%url, status = status.as_u16(), "远程图片请求失败");
        return Err(CardError::InvalidImageUrl(format!(
            "Invalid image url: {url} (HTTP {status})"
        )));
    }
    let bytes = resp.bytes().await?;
    tracing::debug!(%url, len = bytes.len(), "远程图片下载完成");
    Ok(bytes.to_vec())
}

/// 把背景来源解析为未解码的图片字节
pub async fn resolve_background(
    client: &Client,
    source: BackgroundSource,
) -> Result<Vec<u8>, CardError> {
    match source {
        BackgroundSource::Stream(stream) => stream.into_bytes(),
        BackgroundSource::Url(url) => fetch_image(client, &url).await,
        BackgroundSource::Path(path) => tokio::fs::read(&path).await.map_err(|e| {
            CardError::Io(format!("读取背景图失败 '{}': {e}", path.display()))
        }),
    }
}

/// 把头像来源解析为未解码的图片字节（只接受 HTTP(S) 地址）
pub async fn resolve_avatar(client: &Client, source: &AvatarSource) -> Result<Vec<u8>, CardError> {
    match source {
        AvatarSource::Url(url) => fetch_image(client, url).await,
        AvatarSource::Unsupported(raw) => Err(CardError::UnsupportedAvatarSource(format!(
            "avatar 必须是 HTTP(S) 地址，而不是 {raw:?}"
        ))),
    }
}
