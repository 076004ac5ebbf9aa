//! 等级卡的固定几何参数
//!
//! 所有坐标都以内置 overlay 素材（638×327）为基准画布。

use crate::error::CardError;

/// 头像缩放后的边长
pub const AVATAR_SIZE: u32 = 170;
/// 头像在画布上的左上角
pub const AVATAR_ORIGIN: (u32, u32) = (13, 65);

/// 背景图先缩放到的中间尺寸（仅覆盖画布上半部分）
pub const BACKGROUND_SIZE: (u32, u32) = (638, 159);

/// 用户名基准点与字号
pub const USERNAME_POS: (f32, f32) = (205.0, 327.0 / 2.0 + 20.0);
pub const USERNAME_FONT_SIZE: f32 = 40.0;

/// 等级/经验行字号与纵坐标
pub const STATS_FONT_SIZE: f32 = 30.0;
pub const LEVEL_POS: (f32, f32) = (197.0, 327.0 / 2.0 + 125.0);
pub const EXP_LINE_Y: f32 = 327.0 / 2.0 + 125.0;
/// 经验行右边缘到画布右边缘的距离
pub const EXP_RIGHT_MARGIN: f32 = 50.0;
/// 经验行右对齐所参照的画布宽度
pub const EXP_ANCHOR_WIDTH: f32 = 638.0;

/// 文字描边宽度（向外扩展的像素数）
pub const TEXT_STROKE_WIDTH: f32 = 1.0;

/// 进度条图层
pub const BAR_LAYER_SIZE: (u32, u32) = (490, 51);
pub const BAR_LAYER_ORIGIN: (u32, u32) = (190, 235);
pub const BAR_TRACK_WIDTH: f64 = 420.0;
pub const BAR_MIN_FILL: f64 = 50.0;
pub const BAR_HEIGHT: f64 = 50.0;
pub const BAR_RADIUS: f64 = 30.0;
/// 轨道填充：半透明白
pub const BAR_TRACK_ALPHA: u8 = 50;

/// 最终输出尺寸
pub const OUTPUT_SIZE: (u32, u32) = (505, 259);

/// 经验条填充宽度：`current / max * 420`，下限 50，上限 420。
///
/// `max_exp == 0` 时返回 `DivisionByZero`，不做任何静默修正。
pub fn bar_fill_width(current_exp: u64, max_exp: u64) -> Result<f64, CardError> {
    if max_exp == 0 {
        return Err(CardError::DivisionByZero);
    }
    let raw = current_exp as f64 / max_exp as f64 * BAR_TRACK_WIDTH;
    Ok(raw.clamp(BAR_MIN_FILL, BAR_TRACK_WIDTH))
}

/// 经验行的起始横坐标：使文本右边缘距画布右侧 50px
pub fn exp_line_x(text_width: f32) -> f32 {
    EXP_ANCHOR_WIDTH - text_width - EXP_RIGHT_MARGIN
}
