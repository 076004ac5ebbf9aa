use std::sync::Arc;

use crate::config::CardConfig;
use crate::features::card::CardRenderer;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 等级卡渲染器（只读，自带合成阶段的并发许可，可在请求间共享）
    pub renderer: Arc<CardRenderer>,
    /// 请求未指定时使用的默认背景与配色
    pub card: Arc<CardConfig>,
}

impl AppState {
    /// 按等级卡配置组装状态
    pub fn from_card_config(card: CardConfig, client: reqwest::Client) -> Self {
        let renderer = CardRenderer::from_config(client, &card);
        Self {
            renderer: Arc::new(renderer),
            card: Arc::new(card),
        }
    }
}
