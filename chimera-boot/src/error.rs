use crate::phase::LifecyclePhase;
use thiserror::Error;

/// 启动过程中的统一错误类型
///
/// 监听器回调本身返回 `anyhow::Result`，由多播器包装成 [`ApplicationError::ListenerFailure`]，
/// 保留原始错误链。
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 监听器在处理事件时失败（返回错误或 panic）
    #[error("Listener '{listener}' failed while handling {phase} event")]
    ListenerFailure {
        listener: String,
        phase: LifecyclePhase,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// 配置值无法绑定为目标类型
    #[error("Invalid value '{value}' for property '{key}': expected {expected}")]
    ConfigurationBinding {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// 没有可用的应用上下文
    #[error("No usable application context")]
    ContextUnavailable,

    /// 生命周期阶段顺序错误
    #[error("Lifecycle phase {next} cannot follow {previous}")]
    PhaseOrder {
        previous: String,
        next: LifecyclePhase,
    },

    /// 配置加载失败
    #[error("Configuration error: {0}")]
    Config(String),

    /// 日志系统初始化失败
    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApplicationError {
    /// 将监听器返回的错误包装为 ListenerFailure
    pub fn listener_failure(
        listener: impl Into<String>,
        phase: LifecyclePhase,
        source: anyhow::Error,
    ) -> Self {
        ApplicationError::ListenerFailure {
            listener: listener.into(),
            phase,
            source: source.into(),
        }
    }

    /// 包含完整错误链的描述，例如 "Listener 'a' failed while handling STARTING event: boom"
    pub fn chain_message(&self) -> String {
        anyhow::Chain::new(self)
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(": ")
    }
}

/// 启动相关操作的 Result 类型
pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

/// 用户代码（监听器、初始化器、runner）使用的 Result 类型
pub use anyhow::Result;
