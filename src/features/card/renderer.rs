use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;

use super::assets::CardAssets;
use super::composite;
use super::layout;
use super::models::{CardColors, RankStats, RenderOptions, RenderRequest};
use super::source;
use super::text::TextShaper;
use crate::config::{CardAssetsConfig, CardConfig};
use crate::error::CardError;

/// 等级卡渲染器
///
/// 只持有只读配置、HTTP Client 与合成阶段的并发许可；每次 `render` 调用独立解析来源、读取素材并合成，
/// 多个调用之间不共享任何可变状态。
#[derive(Debug, Clone)]
pub struct CardRenderer {
    client: Client,
    assets_dir: PathBuf,
    asset_files: CardAssetsConfig,
    options: RenderOptions,
    /// 只约束 CPU 密集的解码/合成/编码阶段，取图期间不占用
    permits: Arc<Semaphore>,
}

impl CardRenderer {
    pub fn new(
        client: Client,
        assets_dir: impl Into<PathBuf>,
        asset_files: CardAssetsConfig,
        options: RenderOptions,
        max_parallel: usize,
    ) -> Self {
        Self {
            client,
            assets_dir: assets_dir.into(),
            asset_files,
            options,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    pub fn from_config(client: Client, card: &CardConfig) -> Self {
        Self::new(
            client,
            card.assets_path(),
            card.assets.clone(),
            RenderOptions {
                optimize_speed: card.optimize_speed,
            },
            card.parallelism(),
        )
    }

    /// 解析来源 → 解码 → 合成 → 编码 PNG
    ///
    /// 网络请求在当前任务中等待；解码、合成与编码放入阻塞线程池执行。
    pub async fn render(&self, request: RenderRequest) -> Result<Vec<u8>, CardError> {
        let t0 = Instant::now();
        let RenderRequest {
            background,
            avatar,
            stats,
            colors,
        } = request;

        // 先校验经验上限，避免无意义的网络请求
        layout::bar_fill_width(stats.current_exp, stats.max_exp)?;

        let background_bytes = source::resolve_background(&self.client, background).await?;
        let avatar_bytes = source::resolve_avatar(&self.client, &avatar).await?;
        let t_fetch = t0.elapsed();

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| CardError::Render(format!("获取渲染许可失败: {e}")))?;
        let t_wait = t0.elapsed() - t_fetch;

        let renderer = self.clone();
        let handle = spawn_blocking(move || {
            let _permit = permit;
            let assets = CardAssets::load(&renderer.assets_dir, &renderer.asset_files)?;
            let background = decode_image(&background_bytes)?;
            let avatar = decode_image(&avatar_bytes)?;
            let card = compose_card(
                &assets,
                background,
                avatar,
                &stats,
                &colors,
                renderer.options,
            )?;
            encode_png(&card, renderer.options)
        });
        let png = handle
            .await
            .map_err(|e| CardError::Render(format!("阻塞渲染任务执行失败: {e}")))??;

        tracing::info!(
            "等级卡渲染完成: 取图={:?}, 等待许可={:?}, 合成+编码={:?}, 总计={:?}, 大小={}B",
            t_fetch,
            t_wait,
            t0.elapsed() - t_fetch - t_wait,
            t0.elapsed(),
            png.len()
        );
        Ok(png)
    }
}

/// 从内存字节解码图片（格式按内容猜测）
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, CardError> {
    Ok(image::load_from_memory(bytes)?)
}

fn resize_filter(options: RenderOptions) -> FilterType {
    if options.optimize_speed {
        FilterType::Triangle
    } else {
        FilterType::CatmullRom
    }
}

/// 按固定版式合成等级卡，返回 505×259 的 RGBA 位图
pub fn compose_card(
    assets: &CardAssets,
    background: DynamicImage,
    avatar: DynamicImage,
    stats: &RankStats,
    colors: &CardColors,
    options: RenderOptions,
) -> Result<RgbaImage, CardError> {
    let canvas = compose_canvas(assets, background, avatar, stats, colors, options)?;
    let (ow, oh) = layout::OUTPUT_SIZE;
    Ok(imageops::resize(&canvas, ow, oh, resize_filter(options)))
}

/// 在基准画布（overlay 尺寸）上完成全部图层合成与圆角遮罩，尚未缩放到输出尺寸
pub fn compose_canvas(
    assets: &CardAssets,
    background: DynamicImage,
    avatar: DynamicImage,
    stats: &RankStats,
    colors: &CardColors,
    options: RenderOptions,
) -> Result<RgbaImage, CardError> {
    let filter = resize_filter(options);
    let fill_width = layout::bar_fill_width(stats.current_exp, stats.max_exp)?;
    let (cw, ch) = assets.canvas_size();

    let avatar = avatar.resize_exact(layout::AVATAR_SIZE, layout::AVATAR_SIZE, filter);

    // 背景只铺满画布上半部分，其余由装饰框覆盖
    let mut canvas = RgbaImage::new(cw, ch);
    let (bw, bh) = layout::BACKGROUND_SIZE;
    let background = background.resize_exact(bw, bh, filter).to_rgba8();
    composite::paste(&mut canvas, &background, 0, 0);
    // overlay 的 alpha 同时作为遮罩与被插值的通道
    let overlay_mask = composite::alpha_mask(&assets.overlay);
    composite::paste_with_mask(&mut canvas, &assets.overlay, &overlay_mask, 0, 0);

    let shaper = TextShaper::new(assets.font.clone(), options)?;
    tracing::debug!(family = shaper.family(), "字体加载完成");
    let text_layer = shaper.stats_layer((cw, ch), stats, colors)?;
    composite::paste_layer(&mut canvas, &text_layer, 0, 0);

    let avatar = if avatar.color().has_alpha() {
        composite::flatten_onto_black(&avatar.to_rgba8())
    } else {
        tracing::debug!(color = ?avatar.color(), "头像没有 alpha 通道，按原样粘贴");
        avatar.to_rgba8()
    };
    let circle = imageops::resize(
        &assets.circle_mask,
        layout::AVATAR_SIZE,
        layout::AVATAR_SIZE,
        filter,
    );
    let (ax, ay) = layout::AVATAR_ORIGIN;
    composite::paste_with_mask(&mut canvas, &avatar, &circle, ax, ay);

    let bar = shaper.bar_layer(fill_width, colors.bar)?;
    let (bx, by) = layout::BAR_LAYER_ORIGIN;
    composite::paste(&mut canvas, &bar, bx, by);

    let mut rounded = RgbaImage::new(cw, ch);
    composite::paste_with_mask(&mut rounded, &canvas, &assets.curved_mask, 0, 0);
    Ok(rounded)
}

/// 使用 png crate 编码 RGBA 位图
pub fn encode_png(img: &RgbaImage, options: RenderOptions) -> Result<Vec<u8>, CardError> {
    let (w, h) = img.dimensions();
    let mut out = Vec::with_capacity((w * h * 4) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, w, h);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if options.optimize_speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder.write_header()?;
        writer.write_image_data(img.as_raw())?;
        writer.finish()?;
    }
    Ok(out)
}
