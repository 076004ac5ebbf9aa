/// 按量级缩写数字：≥1e9 → `B`，≥1e6 → `M`，≥1e3 → `K`，各保留一位小数；更小的数原样输出。
pub fn abbreviate_number(n: u64) -> String {
    if n >= 1_000_000_000 {
        format!("{:.1}B", n as f64 / 1_000_000_000.0)
    } else if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

/// 等级行文本
pub fn level_line(level: u64) -> String {
    format!("LEVEL - {}", abbreviate_number(level))
}

/// 经验分数行文本（`当前/上限`）
pub fn exp_line(current_exp: u64, max_exp: u64) -> String {
    format!(
        "{}/{}",
        abbreviate_number(current_exp),
        abbreviate_number(max_exp)
    )
}
