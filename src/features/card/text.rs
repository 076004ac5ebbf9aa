//! 文字与进度条图层：拼 SVG，再用 resvg 栅格化为 RGBA 位图
use std::fmt::Write;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use resvg::usvg::{self, Options as UsvgOptions, fontdb};
use resvg::{
    render,
    tiny_skia::{Pixmap, Transform},
};

use super::layout;
use super::models::{CardColor, CardColors, RankStats, RenderOptions};
use crate::error::CardError;

/// 已加载单一字体的排版上下文
pub struct TextShaper {
    fontdb: Arc<fontdb::Database>,
    family: String,
    options: RenderOptions,
}

impl TextShaper {
    /// 从字体原始字节构建（每次渲染新建，不复用全局字体库）
    pub fn new(font: Vec<u8>, options: RenderOptions) -> Result<Self, CardError> {
        let mut db = fontdb::Database::new();
        db.load_font_data(font);
        let family = db
            .faces()
            .find_map(|face| face.families.first().map(|(name, _)| name.clone()))
            .ok_or_else(|| CardError::Io("字体文件中没有可用的字形族".to_string()))?;
        Ok(Self {
            fontdb: Arc::new(db),
            family,
            options,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// 测量文本在给定字号下的宽度（不含描边）
    pub fn measure(&self, text: &str, font_size: f32) -> Result<f32, CardError> {
        let mut svg = String::new();
        open_svg(&mut svg, 4096, 256)?;
        write_text(
            &mut svg,
            &self.family,
            TextSpec {
                x: 0.0,
                y: 0.0,
                font_size,
                color: CardColor::BLACK,
                stroke: false,
            },
            text,
        )?;
        svg.push_str("</svg>");

        let tree = self.parse(&svg)?;
        Ok(tree.root().bounding_box().right().max(0.0))
    }

    /// 构建用户名、等级、经验三行文字图层（与画布同尺寸，背景透明）
    pub fn stats_layer(
        &self,
        canvas: (u32, u32),
        stats: &RankStats,
        colors: &CardColors,
    ) -> Result<RgbaImage, CardError> {
        let level = super::format::level_line(stats.level);
        let exp = super::format::exp_line(stats.current_exp, stats.max_exp);
        let exp_x = layout::exp_line_x(self.measure(&exp, layout::STATS_FONT_SIZE)?);

        let mut svg = String::new();
        open_svg(&mut svg, canvas.0, canvas.1)?;
        let lines = [
            (
                layout::USERNAME_POS,
                layout::USERNAME_FONT_SIZE,
                stats.username.as_str(),
            ),
            (layout::LEVEL_POS, layout::STATS_FONT_SIZE, level.as_str()),
            (
                (exp_x, layout::EXP_LINE_Y),
                layout::STATS_FONT_SIZE,
                exp.as_str(),
            ),
        ];
        for ((x, y), font_size, text) in lines {
            let spec = TextSpec {
                x,
                y,
                font_size,
                color: colors.text,
                stroke: true,
            };
            write_text(&mut svg, &self.family, spec, text)?;
        }
        svg.push_str("</svg>");

        self.rasterize(&svg)
    }

    /// 构建进度条图层：不透明黑底 + 半透明白色轨道 + 按比例宽度的填充
    pub fn bar_layer(&self, fill_width: f64, bar: CardColor) -> Result<RgbaImage, CardError> {
        let (w, h) = layout::BAR_LAYER_SIZE;
        let track_opacity = f32::from(layout::BAR_TRACK_ALPHA) / 255.0;

        let mut svg = String::new();
        open_svg(&mut svg, w, h)?;
        // 矩形右下角坐标是包含在内的，因此宽高都 +1
        write!(
            svg,
            r##"<rect x="0" y="0" width="{w}" height="{h}" fill="#000000"/><rect x="0" y="0" width="{tw}" height="{bh}" rx="{r}" ry="{r}" fill="#FFFFFF" fill-opacity="{track_opacity:.4}"/><rect x="0" y="0" width="{fw}" height="{bh}" rx="{r}" ry="{r}" fill="{fill}" fill-opacity="{fill_opacity:.4}"/>"##,
            tw = layout::BAR_TRACK_WIDTH + 1.0,
            bh = layout::BAR_HEIGHT + 1.0,
            r = layout::BAR_RADIUS,
            fw = fill_width + 1.0,
            fill = bar.svg_rgb(),
            fill_opacity = bar.svg_opacity(),
        )
        .map_err(fmt_err)?;
        svg.push_str("</svg>");

        self.rasterize(&svg)
    }

    fn parse(&self, svg: &str) -> Result<usvg::Tree, CardError> {
        let speed = self.options.optimize_speed;
        let opts = UsvgOptions {
            fontdb: self.fontdb.clone(),
            font_family: self.family.clone(),
            shape_rendering: if speed {
                usvg::ShapeRendering::OptimizeSpeed
            } else {
                usvg::ShapeRendering::GeometricPrecision
            },
            text_rendering: if speed {
                usvg::TextRendering::OptimizeSpeed
            } else {
                usvg::TextRendering::OptimizeLegibility
            },
            ..Default::default()
        };
        usvg::Tree::from_data(svg.as_bytes(), &opts)
            .map_err(|e| CardError::Render(format!("Failed to parse SVG: {e}")))
    }

    fn rasterize(&self, svg: &str) -> Result<RgbaImage, CardError> {
        let tree = self.parse(svg)?;
        let size = tree.size().to_int_size();
        let mut pixmap = Pixmap::new(size.width(), size.height())
            .ok_or_else(|| CardError::Render("Failed to create pixmap".to_string()))?;
        render(&tree, Transform::default(), &mut pixmap.as_mut());
        Ok(pixmap_to_rgba(&pixmap))
    }
}

struct TextSpec {
    x: f32,
    y: f32,
    font_size: f32,
    color: CardColor,
    stroke: bool,
}

fn open_svg(svg: &mut String, w: u32, h: u32) -> Result<(), CardError> {
    write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    )
    .map_err(fmt_err)
}

/// 以 (x, y) 为文字框左上角写入一行文本
fn write_text(svg: &mut String, family: &str, spec: TextSpec, text: &str) -> Result<(), CardError> {
    let stroke = if spec.stroke {
        format!(
            r##" stroke="#000000" stroke-width="{}" stroke-linejoin="round" paint-order="stroke""##,
            layout::TEXT_STROKE_WIDTH * 2.0
        )
    } else {
        String::new()
    };
    write!(
        svg,
        r#"<text x="{x}" y="{y}" font-family="'{family}'" font-size="{size}" dominant-baseline="text-before-edge" xml:space="preserve" fill="{fill}" fill-opacity="{opacity:.4}"{stroke}>{body}</text>"#,
        x = spec.x,
        y = spec.y,
        family = escape_xml(family),
        size = spec.font_size,
        fill = spec.color.svg_rgb(),
        opacity = spec.color.svg_opacity(),
        body = escape_xml(text),
    )
    .map_err(fmt_err)
}

/// tiny-skia 像素为预乘 alpha，这里还原为直通 alpha
fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let c = src.demultiply();
        *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
    }
    out
}

/// XML 1.0 不允许的字符（除 \t \n \r 外的 C0 控制符、U+FFFE、U+FFFF）直接丢弃，
/// 否则 usvg 会拒绝整个文档
fn escape_xml(input: &str) -> String {
    input
        .chars()
        .filter(|&c| is_xml_char(c))
        .collect::<String>()
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn is_xml_char(c: char) -> bool {
    match c {
        '\t' | '\n' | '\r' => true,
        '\u{FFFE}' | '\u{FFFF}' => false,
        c => c >= '\u{20}',
    }
}

fn fmt_err(e: std::fmt::Error) -> CardError {
    CardError::Render(format!("SVG 拼接失败: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shaper() -> TextShaper {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/card/levelfont.ttf");
        let font = std::fs::read(path).expect("bundled font");
        TextShaper::new(font, RenderOptions::default()).expect("shaper")
    }

    #[test]
    fn escapes_markup_in_usernames() {
        assert_eq!(escape_xml("<a&b>"), "&lt;a&amp;b&gt;");
    }

    #[test]
    fn drops_characters_xml_cannot_carry() {
        assert_eq!(escape_xml("bell\u{7}"), "bell");
        assert_eq!(escape_xml("nul\u{0}x"), "nulx");
        assert_eq!(escape_xml("esc\u{1b}[0m"), "esc[0m");
        assert_eq!(escape_xml("\u{FFFE}\u{FFFF}"), "");
        assert_eq!(escape_xml("tab\there"), "tab\there");
    }

    #[test]
    fn control_characters_in_username_still_render() {
        let s = shaper();
        let colors = CardColors {
            text: CardColor::WHITE,
            bar: CardColor::WHITE,
        };
        for username in ["bell\u{7}", "nul\u{0}x", "esc\u{1b}[0m", "\u{FFFE}"] {
            let stats = RankStats {
                level: 1,
                username: username.to_string(),
                current_exp: 1,
                max_exp: 2,
            };
            let layer = s
                .stats_layer((638, 327), &stats, &colors)
                .unwrap_or_else(|e| panic!("{username:?}: {e}"));
            assert_eq!(layer.dimensions(), (638, 327));
        }
    }

    #[test]
    fn wider_text_measures_wider() {
        let s = shaper();
        let short = s.measure("1/2", 30.0).expect("measure short");
        let long = s.measure("1.5K/3.0K", 30.0).expect("measure long");
        assert!(short > 0.0);
        assert!(long > short, "{long} <= {short}");
    }

    #[test]
    fn rejects_font_bytes_without_faces() {
        let err = TextShaper::new(b"not a font".to_vec(), RenderOptions::default())
            .err()
            .expect("invalid font");
        assert!(matches!(err, CardError::Io(_)), "got {err:?}");
    }

    #[test]
    fn bar_layer_is_opaque_with_track_and_fill() {
        let s = shaper();
        let layer = s
            .bar_layer(210.0, CardColor::rgb(255, 0, 0))
            .expect("bar layer");
        assert_eq!(layer.dimensions(), layout::BAR_LAYER_SIZE);
        assert!(layer.pixels().all(|p| p[3] == 255));

        // 填充区中段为进度条颜色，轨道区为黑底上的浅灰，轨道外为纯黑
        let fill = layer.get_pixel(100, 25);
        assert!(fill[0] > 200 && fill[1] < 50, "fill pixel {fill:?}");
        let track = layer.get_pixel(300, 25);
        assert!(track[0] > 30 && track[0] < 80, "track pixel {track:?}");
        assert_eq!(*layer.get_pixel(480, 25), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn stats_layer_draws_inside_canvas() {
        let s = shaper();
        let stats = RankStats {
            level: 3,
            username: "member".to_string(),
            current_exp: 10,
            max_exp: 20,
        };
        let colors = CardColors {
            text: CardColor::WHITE,
            bar: CardColor::WHITE,
        };
        let layer = s.stats_layer((638, 327), &stats, &colors).expect("layer");
        assert_eq!(layer.dimensions(), (638, 327));
        assert!(layer.pixels().any(|p| p[3] > 0), "text layer is empty");
        // 背景区域保持透明
        assert_eq!(layer.get_pixel(5, 5)[3], 0);
    }
}
