use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），避免每次渲染重复创建。
static CLIENT_DEFAULT: OnceCell<Client> = OnceCell::new();

/// 默认配置的 HTTP Client（不额外设置 timeout）。
pub fn client_default() -> Result<&'static Client, reqwest::Error> {
    CLIENT_DEFAULT.get_or_try_init(|| Client::builder().build())
}

/// 远程取图用的 Client：`timeout_secs == 0` 时复用默认 Client，否则按超时新建。
pub fn client_for_fetch(timeout_secs: u64) -> Result<Client, reqwest::Error> {
    if timeout_secs == 0 {
        return client_default().cloned();
    }
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}
