mod common;

use std::time::Duration;

use image::GenericImageView;
use rank_card_backend::features::card::{
    AvatarSource, BackgroundSource, CardColor, CardColors, CardRenderer, ImageStream, RankStats,
    RenderRequest,
};
use rank_card_backend::config::CardAssetsConfig;
use rank_card_backend::features::card::RenderOptions;
use rank_card_backend::{CardError, http::client_for_fetch};

fn renderer() -> CardRenderer {
    let client = client_for_fetch(5).expect("client");
    CardRenderer::from_config(client, &common::card_config())
}

fn request(background: BackgroundSource, avatar: &str, current_exp: u64, max_exp: u64) -> RenderRequest {
    RenderRequest {
        background,
        avatar: AvatarSource::parse(avatar),
        stats: RankStats {
            level: 12,
            username: "night owl".to_string(),
            current_exp,
            max_exp,
        },
        colors: CardColors {
            text: CardColor::WHITE,
            bar: CardColor::rgb(0x72, 0x89, 0xDA),
        },
    }
}

#[tokio::test]
async fn renders_png_of_fixed_size_from_urls() {
    let addr = common::spawn_image_server().await;
    let bytes = renderer()
        .render(request(
            BackgroundSource::parse(&format!("http://{addr}/background.png")),
            &format!("http://{addr}/avatar.png"),
            1_500,
            3_000,
        ))
        .await
        .expect("render");

    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    let img = image::load_from_memory(&bytes).expect("decode output");
    assert_eq!(img.dimensions(), (505, 259));
    // 圆角外透明
    assert_eq!(img.get_pixel(0, 0)[3], 0);
}

#[tokio::test]
async fn renders_from_local_path_and_stream_backgrounds() {
    let addr = common::spawn_image_server().await;
    let avatar = format!("http://{addr}/avatar.png");
    let r = renderer();

    let from_path = r
        .render(request(
            BackgroundSource::parse(&common::card_config().background),
            &avatar,
            0,
            10,
        ))
        .await
        .expect("render from path");
    let from_stream = r
        .render(request(
            BackgroundSource::Stream(ImageStream::from_bytes(common::background_png())),
            &avatar,
            10,
            10,
        ))
        .await
        .expect("render from stream");

    for bytes in [from_path, from_stream] {
        let img = image::load_from_memory(&bytes).expect("decode output");
        assert_eq!(img.dimensions(), (505, 259));
    }
}

#[tokio::test]
async fn identical_inputs_produce_identical_bytes() {
    let addr = common::spawn_image_server().await;
    let r = renderer();
    let make = || {
        request(
            BackgroundSource::parse(&format!("http://{addr}/background.png")),
            &format!("http://{addr}/avatar.png"),
            2_345_678,
            9_000_000,
        )
    };

    let first = r.render(make()).await.expect("first render");
    let second = r.render(make()).await.expect("second render");
    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_renders_do_not_interfere() {
    let addr = common::spawn_image_server().await;
    let r = renderer();
    let background = format!("http://{addr}/background.png");
    let avatar = format!("http://{addr}/avatar.png");

    let (a, b) = tokio::join!(
        r.render(request(BackgroundSource::parse(&background), &avatar, 5, 10)),
        r.render(request(BackgroundSource::parse(&background), &avatar, 5, 10)),
    );
    assert_eq!(a.expect("render a"), b.expect("render b"));
}

#[tokio::test]
async fn missing_background_url_is_invalid_image_url() {
    let addr = common::spawn_image_server().await;
    let err = renderer()
        .render(request(
            BackgroundSource::parse(&format!("http://{addr}/missing.png")),
            &format!("http://{addr}/avatar.png"),
            1,
            2,
        ))
        .await
        .expect_err("404 background");
    assert!(matches!(err, CardError::InvalidImageUrl(_)), "{err:?}");
}

#[tokio::test]
async fn non_url_avatar_is_rejected() {
    let err = renderer()
        .render(request(
            BackgroundSource::parse(&common::card_config().background),
            "./avatar.png",
            1,
            2,
        ))
        .await
        .expect_err("local avatar");
    assert!(matches!(err, CardError::UnsupportedAvatarSource(_)), "{err:?}");
}

#[tokio::test]
async fn zero_max_exp_is_division_by_zero() {
    let err = renderer()
        .render(request(
            BackgroundSource::parse("http://127.0.0.1:9/never-fetched.png"),
            "http://127.0.0.1:9/never-fetched.png",
            1,
            0,
        ))
        .await
        .expect_err("max_exp = 0");
    assert!(matches!(err, CardError::DivisionByZero), "{err:?}");
}

#[tokio::test]
async fn undecodable_avatar_is_decode_error() {
    let addr = common::spawn_image_server().await;
    let err = renderer()
        .render(request(
            BackgroundSource::parse(&format!("http://{addr}/background.png")),
            &format!("http://{addr}/garbage.png"),
            1,
            2,
        ))
        .await
        .expect_err("garbage avatar");
    assert!(matches!(err, CardError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn slow_upstream_does_not_hold_a_render_permit() {
    let addr = common::spawn_image_server().await;
    let renderer = CardRenderer::new(
        client_for_fetch(20).expect("client"),
        common::card_config().assets_path(),
        CardAssetsConfig::default(),
        RenderOptions::default(),
        1,
    );
    let background = format!("http://{addr}/background.png");

    let stalled = {
        let renderer = renderer.clone();
        let req = request(
            BackgroundSource::parse(&background),
            &format!("http://{addr}/slow.png"),
            1,
            2,
        );
        tokio::spawn(async move { renderer.render(req).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    // 唯一的许可只在合成阶段占用，等待中的取图不应阻塞其它渲染
    let done = tokio::time::timeout(
        Duration::from_secs(15),
        renderer.render(request(
            BackgroundSource::parse(&background),
            &format!("http://{addr}/avatar.png"),
            1,
            2,
        )),
    )
    .await
    .expect("render blocked behind a pending fetch")
    .expect("render");
    assert!(done.starts_with(b"\x89PNG"));

    stalled.abort();
}
