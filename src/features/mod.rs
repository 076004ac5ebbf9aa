/// 等级卡渲染
pub mod card;

/// 健康检查
pub mod health;
