use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::features::card::models::CardColor;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（未设置 RUST_LOG 时生效）
    pub level: String,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            max_age_secs: None,
        }
    }
}

/// 等级卡素材文件名（相对于 `card.assets_dir`）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardAssetsConfig {
    /// 装饰框 PNG，决定基准画布尺寸
    #[serde(default = "CardAssetsConfig::default_overlay")]
    pub overlay: String,
    /// 圆形头像遮罩（灰度）
    #[serde(default = "CardAssetsConfig::default_circle_mask")]
    pub circle_mask: String,
    /// 圆角遮罩（灰度）
    #[serde(default = "CardAssetsConfig::default_curved_mask")]
    pub curved_mask: String,
    /// 字体文件
    #[serde(default = "CardAssetsConfig::default_font")]
    pub font: String,
}

impl CardAssetsConfig {
    fn default_overlay() -> String {
        "overlay1.png".to_string()
    }
    fn default_circle_mask() -> String {
        "mask_circle.png".to_string()
    }
    fn default_curved_mask() -> String {
        "curvedoverlay.png".to_string()
    }
    fn default_font() -> String {
        "levelfont.ttf".to_string()
    }
}

impl Default for CardAssetsConfig {
    fn default() -> Self {
        Self {
            overlay: Self::default_overlay(),
            circle_mask: Self::default_circle_mask(),
            curved_mask: Self::default_curved_mask(),
            font: Self::default_font(),
        }
    }
}

/// 等级卡渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// 素材目录
    #[serde(default = "CardConfig::default_assets_dir")]
    pub assets_dir: String,
    /// 素材文件名
    #[serde(default)]
    pub assets: CardAssetsConfig,
    /// 默认背景：本地路径或 HTTP(S) 地址
    #[serde(default = "CardConfig::default_background")]
    pub background: String,
    /// 默认文字颜色
    #[serde(default = "CardConfig::default_text_color")]
    pub text_color: CardColor,
    /// 默认进度条颜色
    #[serde(default = "CardConfig::default_bar_color")]
    pub bar_color: CardColor,
    /// 是否优先速度（缩放滤镜与 PNG 压缩档位）
    #[serde(default)]
    pub optimize_speed: bool,
    /// 远程取图超时（秒，0 表示不设置超时）
    #[serde(default = "CardConfig::default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
}

impl CardConfig {
    fn default_assets_dir() -> String {
        "./resources/card".to_string()
    }
    fn default_background() -> String {
        "./resources/card/background.png".to_string()
    }
    fn default_text_color() -> CardColor {
        CardColor::WHITE
    }
    fn default_bar_color() -> CardColor {
        CardColor::rgb(0x72, 0x89, 0xDA)
    }
    fn default_fetch_timeout() -> u64 {
        30
    }

    /// 素材目录路径
    pub fn assets_path(&self) -> PathBuf {
        PathBuf::from(&self.assets_dir)
    }

    /// 实际并发渲染许可数
    pub fn parallelism(&self) -> usize {
        match self.max_parallel {
            0 => num_cpus::get(),
            n => n as usize,
        }
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            assets_dir: Self::default_assets_dir(),
            assets: CardAssetsConfig::default(),
            background: Self::default_background(),
            text_color: Self::default_text_color(),
            bar_color: Self::default_bar_color(),
            optimize_speed: false,
            fetch_timeout_secs: Self::default_fetch_timeout(),
            max_parallel: 0,
        }
    }
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 等级卡渲染配置
    #[serde(default)]
    pub card: CardConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            // 配置文件可缺省，缺省时全部使用默认值
            .add_source(File::from(config_path).required(false))
            // 支持环境变量覆盖，例如：APP_SERVER_PORT
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_source(builder)
    }

    /// 在默认值之上叠加任意已构建的配置源
    pub fn from_source(source: ConfigBuilder) -> Result<Self, ConfigError> {
        let defaults = ConfigBuilder::try_from(&Self::default())?;
        ConfigBuilder::builder()
            .add_source(defaults)
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3940,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            api: ApiConfig {
                prefix: "/api/v1".to_string(),
            },
            cors: CorsConfig::default(),
            card: CardConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}
