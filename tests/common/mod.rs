#![allow(dead_code)]

use std::io::Cursor;
use std::net::SocketAddr;

use axum::{
    Router,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use rank_card_backend::config::{AppConfig, CardConfig};

pub fn png_bytes(img: DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("encode test png");
    buf.into_inner()
}

pub fn avatar_png() -> Vec<u8> {
    png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        96,
        96,
        Rgba([230, 60, 40, 255]),
    )))
}

pub fn background_png() -> Vec<u8> {
    png_bytes(DynamicImage::ImageRgb8(RgbImage::from_fn(700, 200, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })))
}

async fn png_response(bytes: Vec<u8>) -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "image/png")], bytes)
}

/// 本地图片服务：`/avatar.png`、`/background.png`、`/garbage.png`、`/slow.png`（30 秒后才响应），其余路径 404
pub async fn spawn_image_server() -> SocketAddr {
    let app = Router::new()
        .route("/avatar.png", get(|| png_response(avatar_png())))
        .route("/background.png", get(|| png_response(background_png())))
        .route("/garbage.png", get(|| async { "not an image" }))
        .route(
            "/slow.png",
            get(|| async {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                png_response(avatar_png()).await
            }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind image server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

pub fn card_config() -> CardConfig {
    let assets = concat!(env!("CARGO_MANIFEST_DIR"), "/resources/card");
    CardConfig {
        assets_dir: assets.to_string(),
        background: format!("{assets}/background.png"),
        fetch_timeout_secs: 5,
        max_parallel: 2,
        ..CardConfig::default()
    }
}

pub fn app_config() -> AppConfig {
    AppConfig {
        card: card_config(),
        ..AppConfig::default()
    }
}
