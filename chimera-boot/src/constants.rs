//! 框架使用的配置键
//!
//! 监听器和 Web 模块共用这些常量，避免硬编码不一致

/// ANSI 输出模式：detect / always / never
pub const ANSI_ENABLED_PROPERTY: &str = "output.ansi.enabled";
/// 控制台是否可用（三态）
pub const ANSI_CONSOLE_AVAILABLE_PROPERTY: &str = "output.ansi.console-available";

/// 日志配置
pub const LOGGING_LEVEL_PROPERTY: &str = "logging.level";
pub const LOGGING_FORMAT_PROPERTY: &str = "logging.format";
pub const LOGGING_FILTER_PROPERTY: &str = "logging.filter";
pub const LOGGING_SHOW_TARGET_PROPERTY: &str = "logging.show-target";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";
/// 默认环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "APP_";
/// 通过环境变量激活 profile，例如 APP_PROFILES_ACTIVE=dev,local
pub const PROFILES_ACTIVE_SUFFIX: &str = "PROFILES_ACTIVE";
