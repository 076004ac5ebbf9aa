use std::fmt;
use std::io::{Cursor, Read, Seek};
use std::path::PathBuf;

use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use serde::{Deserialize, Serialize};

use crate::error::CardError;

/// RGBA 颜色（alpha 缺省为 255）
///
/// 反序列化支持 `"#RRGGBB"`、`"#RRGGBBAA"`、`[r, g, b]` 与 `[r, g, b, a]` 四种写法。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct CardColor(pub [u8; 4]);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Channels(Vec<u8>),
}

impl CardColor {
    pub const WHITE: Self = Self([255, 255, 255, 255]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// 解析 `#RRGGBB` / `#RRGGBBAA`（`#` 可省略）
    pub fn from_hex(raw: &str) -> Result<Self, String> {
        let hex = raw.trim().trim_start_matches('#');
        if !matches!(hex.len(), 6 | 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("无效的颜色值: {raw}"));
        }
        let mut out = [255u8; 4];
        for (i, slot) in out.iter_mut().take(hex.len() / 2).enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| format!("无效的颜色值 {raw}: {e}"))?;
        }
        Ok(Self(out))
    }

    /// SVG `fill` 可用的 `rgb(r,g,b)` 表达
    pub fn svg_rgb(&self) -> String {
        let [r, g, b, _] = self.0;
        format!("rgb({r},{g},{b})")
    }

    /// SVG `*-opacity` 可用的不透明度
    pub fn svg_opacity(&self) -> f32 {
        f32::from(self.0[3]) / 255.0
    }
}

impl TryFrom<ColorRepr> for CardColor {
    type Error = String;

    fn try_from(value: ColorRepr) -> Result<Self, Self::Error> {
        match value {
            ColorRepr::Hex(s) => Self::from_hex(&s),
            ColorRepr::Channels(v) => match v.as_slice() {
                [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
                [r, g, b, a] => Ok(Self::rgba(*r, *g, *b, *a)),
                _ => Err(format!("颜色数组长度必须为 3 或 4，实际为 {}", v.len())),
            },
        }
    }
}

impl From<CardColor> for String {
    fn from(c: CardColor) -> Self {
        let [r, g, b, a] = c.0;
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

/// 卡片配色
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardColors {
    /// 用户名、等级与经验文字颜色
    pub text: CardColor,
    /// 进度条填充颜色
    pub bar: CardColor,
}

/// 流的打开模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Binary,
    Text,
}

pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// 内存/文件中的图片流
///
/// 只有“可读、可定位、二进制模式”的流才会被接受，其余一律视为 `InvalidImageType`。
pub struct ImageStream {
    reader: Box<dyn ReadSeek>,
    mode: StreamMode,
    readable: bool,
    seekable: bool,
}

impl ImageStream {
    pub fn new(reader: impl ReadSeek + 'static, mode: StreamMode) -> Self {
        Self {
            reader: Box::new(reader),
            mode,
            readable: true,
            seekable: true,
        }
    }

    /// 以二进制模式包装任意 `Read + Seek` 读取器
    pub fn binary(reader: impl ReadSeek + 'static) -> Self {
        Self::new(reader, StreamMode::Binary)
    }

    /// 将已在内存中的字节包装为二进制流
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::binary(Cursor::new(bytes))
    }

    /// 声明底层句柄是否可读（例如只写方式打开的文件）
    pub fn with_readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    /// 声明底层句柄是否可定位（例如管道）
    pub fn with_seekable(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    /// 校验流能力后读出剩余全部字节
    pub fn into_bytes(self) -> Result<Vec<u8>, CardError> {
        if !(self.seekable && self.readable && self.mode == StreamMode::Binary) {
            return Err(CardError::InvalidImageType(format!(
                "文件流 {self:?} 必须可定位、可读且为二进制模式"
            )));
        }
        let mut reader = self.reader;
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .map_err(|e| CardError::Io(format!("读取背景流失败: {e}")))?;
        Ok(buf)
    }
}

impl fmt::Debug for ImageStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStream")
            .field("mode", &self.mode)
            .field("readable", &self.readable)
            .field("seekable", &self.seekable)
            .finish_non_exhaustive()
    }
}

/// 背景图来源
#[derive(Debug)]
pub enum BackgroundSource {
    /// 本地文件路径
    Path(PathBuf),
    /// HTTP(S) 地址
    Url(String),
    /// 已打开的二进制流
    Stream(ImageStream),
}

impl BackgroundSource {
    /// 按字符串前缀分类：`http` 开头视为 URL，其余视为本地路径
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http") {
            Self::Url(raw.to_string())
        } else {
            Self::Path(PathBuf::from(raw))
        }
    }

    /// 从 HTTP 请求体中的背景字段构造来源
    ///
    /// - 字符串：必须是 HTTP(S) 地址（请求方不能引用服务端本地文件）
    /// - `{ "base64": "..." }`：解码为内存二进制流
    /// - 其它任何 JSON 类型：`InvalidImageType`
    pub fn from_request_value(value: &serde_json::Value) -> Result<Self, CardError> {
        match value {
            serde_json::Value::String(s) if s.starts_with("http") => Ok(Self::Url(s.clone())),
            serde_json::Value::String(s) => Err(CardError::InvalidImageType(format!(
                "background 只能是 URL 或 base64 二进制数据，不接受本地路径: {s}"
            ))),
            serde_json::Value::Object(map) => {
                let Some(encoded) = map.get("base64").and_then(|v| v.as_str()) else {
                    return Err(CardError::InvalidImageType(
                        "background 对象缺少字符串字段 base64".to_string(),
                    ));
                };
                let bytes = base64_engine.decode(encoded.trim()).map_err(|e| {
                    CardError::InvalidImageType(format!("background base64 解码失败: {e}"))
                })?;
                Ok(Self::Stream(ImageStream::from_bytes(bytes)))
            }
            other => Err(CardError::InvalidImageType(format!(
                "background 必须是 URL 或二进制数据，而不是 {}",
                json_type_name(other)
            ))),
        }
    }
}

fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// 头像来源（目前只支持 HTTP(S) 地址）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarSource {
    Url(String),
    /// 其它形式（例如本地路径），解析时直接报 `UnsupportedAvatarSource`
    Unsupported(String),
}

impl AvatarSource {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http") {
            Self::Url(raw.to_string())
        } else {
            Self::Unsupported(raw.to_string())
        }
    }
}

/// 成员等级数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankStats {
    pub level: u64,
    pub username: String,
    pub current_exp: u64,
    /// 升级所需经验，必须大于 0
    pub max_exp: u64,
}

/// 单次渲染请求（每次调用独占，不会被原地修改）
#[derive(Debug)]
pub struct RenderRequest {
    pub background: BackgroundSource,
    pub avatar: AvatarSource,
    pub stats: RankStats,
    pub colors: CardColors,
}

/// 影响栅格化质量/速度的选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// 优先速度：缩放使用 Triangle，PNG 使用快速压缩
    pub optimize_speed: bool,
}

/// 等级卡渲染请求体
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankCardRequest {
    /// 头像地址（HTTP/HTTPS）
    #[schema(example = "https://cdn.discordapp.com/embed/avatars/0.png")]
    pub avatar: String,
    /// 显示的用户名
    #[schema(example = "member")]
    pub username: String,
    /// 当前等级
    #[schema(example = 12)]
    pub level: u64,
    /// 当前经验
    #[schema(example = 1500)]
    pub current_exp: u64,
    /// 升级所需经验（必须大于 0）
    #[schema(example = 3000)]
    pub max_exp: u64,
    /// 可选背景：URL 字符串或 `{ "base64": "..." }`；缺省使用服务端配置
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub background: Option<serde_json::Value>,
    /// 可选文字颜色（"#RRGGBB[AA]" 或 [r,g,b(,a)]）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "#FFFFFF")]
    pub text_color: Option<CardColor>,
    /// 可选进度条颜色
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, example = "#7289DA")]
    pub bar_color: Option<CardColor>,
}
