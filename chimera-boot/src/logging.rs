use crate::config::Environment;
use crate::constants::{
    LOGGING_FILTER_PROPERTY, LOGGING_FORMAT_PROPERTY, LOGGING_LEVEL_PROPERTY,
    LOGGING_SHOW_TARGET_PROPERTY,
};
use crate::error::{ApplicationError, ApplicationResult, Result};
use crate::event::StartupEvent;
use crate::listener::ApplicationListener;
use crate::phase::LifecyclePhase;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 紧凑格式（默认）
    Compact,
    /// 完整格式（带时间、级别、目标）
    Full,
    Json,
    /// 美化格式（适合开发）
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "full" => Ok(LogFormat::Full),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_thread_names: bool,
    /// 自定义过滤器，例如："chimera_boot=debug,hyper=warn"
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            show_thread_names: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn show_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// 从环境变量读取配置（RUST_LOG / LOG_LEVEL / LOG_FORMAT）
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            config.filter = Some(rust_log);
        }

        if let Some(level) = std::env::var("LOG_LEVEL").ok().and_then(|s| s.parse().ok()) {
            config.level = level;
        }

        if let Some(format) = std::env::var("LOG_FORMAT").ok().and_then(|s| s.parse().ok()) {
            config.format = format;
        }

        config
    }

    /// 从已准备好的 Environment 读取配置
    ///
    /// 无法识别的级别或格式视为配置错误
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        let mut config = Self::default();

        if let Some(level) = env.get_string(LOGGING_LEVEL_PROPERTY) {
            config.level = level.parse().map_err(|_| ApplicationError::ConfigurationBinding {
                key: LOGGING_LEVEL_PROPERTY.to_string(),
                value: level.clone(),
                expected: "a log level",
            })?;
        }

        if let Some(format) = env.get_string(LOGGING_FORMAT_PROPERTY) {
            config.format = format.parse().map_err(|_| ApplicationError::ConfigurationBinding {
                key: LOGGING_FORMAT_PROPERTY.to_string(),
                value: format.clone(),
                expected: "one of compact, full, json, pretty",
            })?;
        }

        config.filter = env.get_string(LOGGING_FILTER_PROPERTY);
        config.show_target = env
            .get_tri_state(LOGGING_SHOW_TARGET_PROPERTY)?
            .unwrap_or(false);

        Ok(config)
    }

    /// 初始化日志系统
    pub fn init(self) -> ApplicationResult<()> {
        let env_filter = match &self.filter {
            Some(filter) => EnvFilter::try_new(filter)
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string())),
            // 优先使用 RUST_LOG 环境变量，否则使用配置的级别
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.to_string())),
        };

        let result = match self.format {
            LogFormat::Compact => fmt()
                .with_env_filter(env_filter)
                .compact()
                .with_target(self.show_target)
                .with_thread_ids(self.show_thread_ids)
                .with_thread_names(self.show_thread_names)
                .try_init(),
            LogFormat::Full => fmt()
                .with_env_filter(env_filter)
                .with_target(self.show_target)
                .with_thread_ids(self.show_thread_ids)
                .with_thread_names(self.show_thread_names)
                .try_init(),
            LogFormat::Json => fmt()
                .with_env_filter(env_filter)
                .json()
                .with_target(self.show_target)
                .try_init(),
            LogFormat::Pretty => fmt()
                .with_env_filter(env_filter)
                .pretty()
                .with_target(self.show_target)
                .try_init(),
        };

        result.map_err(|e| ApplicationError::LoggingInitFailed(e.to_string()))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Full => write!(f, "full"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// 在 Environment 准备好之后初始化日志系统
#[derive(Default)]
pub struct LoggingListener;

impl ApplicationListener for LoggingListener {
    fn on_event(&self, event: &StartupEvent) -> Result<()> {
        let Some(env) = event.environment() else {
            return Ok(());
        };

        let config = LoggingConfig::from_environment(&env)?;
        if let Err(e) = config.init() {
            // 已经安装了全局订阅者（例如显式配置了日志），保持原样
            tracing::debug!("Logging already initialized: {}", e);
        }
        Ok(())
    }

    fn listener_name(&self) -> &str {
        "LoggingListener"
    }

    fn supports_phase(&self, phase: LifecyclePhase) -> bool {
        phase == LifecyclePhase::EnvironmentPrepared
    }
}

crate::submit_listener!(LoggingListener, 20);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapPropertySource;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_config_from_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property(LOGGING_LEVEL_PROPERTY, "debug")
                .with_property(LOGGING_FORMAT_PROPERTY, "json")
                .with_property(LOGGING_FILTER_PROPERTY, "chimera_boot=trace")
                .with_property(LOGGING_SHOW_TARGET_PROPERTY, true),
        ));

        let config = LoggingConfig::from_environment(&env).unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter.as_deref(), Some("chimera_boot=trace"));
        assert!(config.show_target);
    }

    #[test]
    fn test_invalid_level_is_binding_failure() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test").with_property(LOGGING_LEVEL_PROPERTY, "loud"),
        ));

        assert!(matches!(
            LoggingConfig::from_environment(&env),
            Err(ApplicationError::ConfigurationBinding { .. })
        ));
    }

    #[test]
    fn test_logging_config_builder() {
        let config = LoggingConfig::new()
            .level(LogLevel::Warn)
            .format(LogFormat::Pretty)
            .show_target(true)
            .filter("warn");

        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.show_target);
        assert_eq!(config.filter.as_deref(), Some("warn"));
    }
}
