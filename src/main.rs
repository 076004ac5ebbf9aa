use rank_card_backend::app::build_router;
use rank_card_backend::http::client_for_fetch;
use rank_card_backend::state::AppState;
use rank_card_backend::{ShutdownManager, config::AppConfig};

#[tokio::main]
async fn main() {
    // 配置需先于日志加载，日志级别来自 config.logging.level
    let config_result = AppConfig::init_global();
    let level = match &config_result {
        Ok(()) => AppConfig::global().logging.level.clone(),
        Err(_) => "info".to_string(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("rank_card_backend={level},tower_http={level}").into()
            }),
        )
        .init();

    if let Err(e) = config_result {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 创建优雅退出管理器并启动信号处理器
    let shutdown_manager = ShutdownManager::new();
    if let Err(e) = shutdown_manager.start_signal_handler() {
        tracing::error!("信号处理器启动失败: {}", e);
        std::process::exit(1);
    }

    let client = match client_for_fetch(config.card.fetch_timeout_secs) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("HTTP client init failed: {}", e);
            std::process::exit(1);
        }
    };

    // 素材缺失时尽早暴露，避免首个请求才失败
    let assets_dir = config.card.assets_path();
    if let Err(e) =
        rank_card_backend::features::card::assets::CardAssets::load(&assets_dir, &config.card.assets)
    {
        tracing::error!("Card assets check failed: {}", e);
        std::process::exit(1);
    }

    let app_state = AppState::from_card_config(config.card.clone(), client);
    let app = build_router(config, app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/api-docs/openapi.json", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Card API: http://{}{}/card/rank", addr, config.api.prefix);
    tracing::info!("Card assets: {:?}", assets_dir);

    let shutdown_timeout = config.shutdown.timeout_duration();
    let waiter = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = waiter.wait_for_shutdown().await;
        tracing::info!("接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
    });

    // 收到退出信号后，在途请求最多再等待 shutdown.timeout_secs
    let server = tokio::spawn(async move { graceful.await });
    let forced = async {
        shutdown_manager.wait_for_shutdown().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        res = server => match res {
            Ok(Ok(())) if shutdown_manager.is_shutting_down() => tracing::info!("服务器已优雅关闭"),
            Ok(Ok(())) => tracing::warn!("服务器在未收到退出信号时停止"),
            Ok(Err(e)) => {
                tracing::error!("服务器运行错误: {}", e);
                std::process::exit(1);
            }
            Err(e) => {
                tracing::error!("服务器任务异常退出: {}", e);
                std::process::exit(1);
            }
        },
        _ = forced => {
            tracing::warn!("优雅退出超时（{}秒），强制退出", config.shutdown.timeout_secs);
        }
    }
}
