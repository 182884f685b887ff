use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use schedule_core::AppConfig;
use schedule_strategies::ScheduleTaskFactory;

/// 通用的启动配置
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// 配置文件路径，未指定时按默认位置查找
    pub config_path: Option<String>,
    /// 覆盖配置中的日志级别
    pub log_level: Option<String>,
    /// 覆盖配置中的日志格式
    pub log_format: Option<String>,
}

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
        _ => {
            return Err(anyhow::anyhow!("不支持的日志格式: {log_format}"));
        }
    }

    Ok(())
}

/// 加载应用配置
pub fn load_config(startup_config: &StartupConfig) -> Result<AppConfig> {
    if let Some(path) = startup_config.config_path.as_deref() {
        if !std::path::Path::new(path).exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {path}"));
        }
    }

    let mut config = AppConfig::load(startup_config.config_path.as_deref()).with_context(|| {
        format!(
            "加载配置文件失败: {}",
            startup_config.config_path.as_deref().unwrap_or("<默认位置>")
        )
    })?;

    if let Some(ref log_level) = startup_config.log_level {
        config.observability.log_level = log_level.clone();
    }
    if let Some(ref log_format) = startup_config.log_format {
        config.observability.log_format = log_format.clone();
    }
    config.validate()?;

    Ok(config)
}

/// 加载配置、初始化日志并构建调度任务工厂
pub fn bootstrap(startup_config: &StartupConfig) -> Result<(AppConfig, ScheduleTaskFactory)> {
    let config = load_config(startup_config)?;
    init_logging(&config.observability.log_level, &config.observability.log_format)?;

    let factory = ScheduleTaskFactory::from_config(&config);
    info!(
        default_timezone = %config.scheduling.default_timezone,
        modules = ?factory.strategies().registered_modules(),
        "调度核心初始化完成"
    );

    Ok((config, factory))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_load_config_applies_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scheduling]\ndefault_timezone = \"Europe/Berlin\"").unwrap();

        let startup = StartupConfig {
            config_path: Some(file.path().to_string_lossy().to_string()),
            log_level: Some("debug".to_string()),
            log_format: Some("json".to_string()),
        };
        let config = load_config(&startup).unwrap();

        assert_eq!(config.scheduling.default_timezone, "Europe/Berlin");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_load_config_rejects_missing_file() {
        let startup = StartupConfig {
            config_path: Some("/nonexistent/schedule.toml".to_string()),
            ..Default::default()
        };
        assert!(load_config(&startup).is_err());
    }

    #[test]
    fn test_load_config_rejects_bad_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[observability]\nlog_level = \"info\"").unwrap();
        let startup = StartupConfig {
            config_path: Some(file.path().to_string_lossy().to_string()),
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(load_config(&startup).is_err());
    }

    #[test]
    fn test_init_logging_rejects_unknown_format() {
        assert!(init_logging("info", "xml").is_err());
    }
}
