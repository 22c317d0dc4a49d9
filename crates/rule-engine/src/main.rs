//! 规则引擎服务
//!
//! 提供 REST 接口的规则创建、组合与评估服务。

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method, header};
use rule_engine::api::{self, AppState};
use rule_engine::{EngineSettings, RuleService, RuleStore};
use rule_shared::config::{AppConfig, CorsConfig};
use rule_shared::observability::{self, ObservabilityConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "rule-engine";

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            environment: "development".to_string(),
            ..Default::default()
        }
    });

    let _guard = observability::init(&ObservabilityConfig::from_app_config(&config)).await?;

    info!(
        environment = %config.environment,
        parser_mode = %config.engine.parser_mode,
        combine_strategy = %config.engine.combine_strategy,
        "Starting rule-engine service..."
    );

    let settings = EngineSettings::from_config(&config.engine)
        .context("invalid [engine] configuration")?;

    let store = RuleStore::new();
    let service = Arc::new(RuleService::with_settings(Arc::new(store), settings));

    let app = api::router(AppState::new(service)).layer(build_cors_layer(&config.cors));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address: {}", config.server_addr()))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Service shutdown complete");
    Ok(())
}

/// 按配置构建 CORS 层
fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if cors.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}

/// 优雅关闭信号处理
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        }
    }
}
