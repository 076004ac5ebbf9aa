use std::path::{Path, PathBuf};

use image::{GrayImage, RgbaImage};

use crate::config::CardAssetsConfig;
use crate::error::CardError;

/// 等级卡内置素材（每次渲染从磁盘重新读取，不做缓存）
#[derive(Debug)]
pub struct CardAssets {
    /// 装饰框，其尺寸即基准画布尺寸
    pub overlay: RgbaImage,
    /// 圆形头像遮罩（灰度即透明度）
    pub circle_mask: GrayImage,
    /// 圆角遮罩（灰度即透明度）
    pub curved_mask: GrayImage,
    /// 字体文件原始字节（在 30/40 两种字号下使用）
    pub font: Vec<u8>,
}

impl CardAssets {
    /// 按配置的文件名从 `dir` 读取全部素材
    pub fn load(dir: &Path, files: &CardAssetsConfig) -> Result<Self, CardError> {
        let overlay = open_asset(&dir.join(&files.overlay))?.to_rgba8();
        let circle_mask = open_asset(&dir.join(&files.circle_mask))?.to_luma8();
        let curved_mask = open_asset(&dir.join(&files.curved_mask))?.to_luma8();

        let font_path = dir.join(&files.font);
        let font = std::fs::read(&font_path)
            .map_err(|e| CardError::Io(format!("读取字体失败 '{}': {e}", font_path.display())))?;

        Ok(Self {
            overlay,
            circle_mask,
            curved_mask,
            font,
        })
    }

    /// 基准画布尺寸
    pub fn canvas_size(&self) -> (u32, u32) {
        self.overlay.dimensions()
    }
}

/// 列出 `dir` 下缺失（或不是普通文件）的素材路径
pub fn missing_assets(dir: &Path, files: &CardAssetsConfig) -> Vec<PathBuf> {
    [
        &files.overlay,
        &files.circle_mask,
        &files.curved_mask,
        &files.font,
    ]
    .into_iter()
    .map(|name| dir.join(name))
    .filter(|path| !path.is_file())
    .collect()
}

fn open_asset(path: &Path) -> Result<image::DynamicImage, CardError> {
    image::open(path).map_err(|e| CardError::Io(format!("读取素材失败 '{}': {e}", path.display())))
}
