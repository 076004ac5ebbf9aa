//! 位图粘贴原语
//!
//! 语义与常见绘图库的 `paste(src, pos, mask)` 一致：按遮罩值在源与目标之间线性插值，
//! 四个通道（含 alpha）一视同仁，不做 alpha 合成。

use image::{GrayImage, Luma, Rgba, RgbaImage};

/// 无遮罩粘贴：重叠区域直接替换为源像素
pub fn paste(dst: &mut RgbaImage, src: &RgbaImage, x: u32, y: u32) {
    image::imageops::replace(dst, src, i64::from(x), i64::from(y));
}

/// 带遮罩粘贴：`dst = src * m + dst * (1 - m)`，`m` 取自遮罩对应像素
///
/// 遮罩尺寸需与 `src` 相同；超出目标边界的部分被裁掉。
pub fn paste_with_mask(dst: &mut RgbaImage, src: &RgbaImage, mask: &GrayImage, x: u32, y: u32) {
    let (dw, dh) = dst.dimensions();
    let w = src.width().min(mask.width()).min(dw.saturating_sub(x));
    let h = src.height().min(mask.height()).min(dh.saturating_sub(y));

    for sy in 0..h {
        for sx in 0..w {
            let Luma([m]) = *mask.get_pixel(sx, sy);
            if m == 0 {
                continue;
            }
            let s = src.get_pixel(sx, sy);
            let d = dst.get_pixel_mut(x + sx, y + sy);
            *d = lerp(*d, *s, m);
        }
    }
}

/// 取 RGBA 图像的 alpha 通道作为灰度遮罩
pub fn alpha_mask(img: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([img.get_pixel(x, y)[3]]))
}

/// 以图层自身 alpha 为遮罩、以不透明颜色为墨水粘贴（相当于在目标上直接“描画”图层）
///
/// 与 `paste_with_mask(dst, layer, &alpha_mask(layer), ..)` 不同，结果 alpha 不会被再乘一次。
pub fn paste_layer(dst: &mut RgbaImage, layer: &RgbaImage, x: u32, y: u32) {
    let mask = alpha_mask(layer);
    paste_with_mask(dst, &opaque(layer), &mask, x, y);
}

/// 将带 alpha 的图像按自身 alpha 铺到纯黑不透明底上
pub fn flatten_onto_black(img: &RgbaImage) -> RgbaImage {
    let mut out = RgbaImage::from_pixel(img.width(), img.height(), Rgba([0, 0, 0, 255]));
    paste_layer(&mut out, img, 0, 0);
    out
}

fn opaque(img: &RgbaImage) -> RgbaImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p[3] = 255;
    }
    out
}

fn lerp(dst: Rgba<u8>, src: Rgba<u8>, m: u8) -> Rgba<u8> {
    let m = u16::from(m);
    let inv = 255 - m;
    let mut out = [0u8; 4];
    for (i, o) in out.iter_mut().enumerate() {
        *o = mul_div255(u16::from(src[i]), m).saturating_add(mul_div255(u16::from(dst[i]), inv));
    }
    Rgba(out)
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_mask_copies_and_empty_mask_keeps() {
        let mut dst = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 40]));
        let src = RgbaImage::from_pixel(2, 2, Rgba([200, 100, 50, 255]));
        let mut mask = GrayImage::new(2, 2);
        mask.put_pixel(0, 0, Luma([255]));

        paste_with_mask(&mut dst, &src, &mask, 1, 1);

        assert_eq!(*dst.get_pixel(1, 1), Rgba([200, 100, 50, 255]));
        assert_eq!(*dst.get_pixel(2, 1), Rgba([10, 20, 30, 40]));
        assert_eq!(*dst.get_pixel(0, 0), Rgba([10, 20, 30, 40]));
    }

    #[test]
    fn half_mask_interpolates_all_channels() {
        let mut dst = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let src = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        let mask = GrayImage::from_pixel(1, 1, Luma([128]));

        paste_with_mask(&mut dst, &src, &mask, 0, 0);

        assert_eq!(*dst.get_pixel(0, 0), Rgba([128, 128, 128, 128]));
    }

    #[test]
    fn self_masked_paste_blends_alpha_too() {
        let mut dst = RgbaImage::new(1, 1);
        let src = RgbaImage::from_pixel(1, 1, Rgba([200, 200, 200, 128]));

        paste_with_mask(&mut dst, &src, &alpha_mask(&src), 0, 0);
        assert_eq!(*dst.get_pixel(0, 0), Rgba([100, 100, 100, 64]));

        // 作为墨水描画时 alpha 只由遮罩决定
        let mut inked = RgbaImage::new(1, 1);
        paste_layer(&mut inked, &src, 0, 0);
        assert_eq!(inked.get_pixel(0, 0)[3], 128);
    }

    #[test]
    fn paste_is_clipped_to_destination() {
        let mut dst = RgbaImage::new(3, 3);
        let src = RgbaImage::from_pixel(5, 5, Rgba([1, 2, 3, 4]));
        let mask = GrayImage::from_pixel(5, 5, Luma([255]));

        paste_with_mask(&mut dst, &src, &mask, 2, 2);

        assert_eq!(*dst.get_pixel(2, 2), Rgba([1, 2, 3, 4]));
        assert_eq!(*dst.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn flatten_uses_alpha_over_black() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        img.put_pixel(1, 0, Rgba([255, 0, 0, 0]));

        let out = flatten_onto_black(&img);

        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*out.get_pixel(1, 0), Rgba([0, 0, 0, 255]));
    }
}
