//! Logging bootstrap
//!
//! Initializes the tracing subscriber for embedded deployments. The log
//! level defaults to the `RUST_LOG` environment variable when set.

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 初始化日志系统
pub fn init_logging(log_level: &str, log_format: &str) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        "compact" => {
            registry
                .with(tracing_subscriber::fmt::layer().compact())
                .try_init()
                .context("初始化Compact日志格式失败")?;
        }
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 以默认参数初始化日志系统，重复调用时忽略错误
pub fn init_default_logging() {
    let _ = init_logging("info", "compact");
}
