// chimera-boot: 类似 Spring Boot 的启动引导
//
// 提供：
// - 有序的启动阶段与启动事件
// - 早期多播器与上下文多播器之间的交接
// - 启动失败事件的可靠投递
// - 基于三态配置和特性探测的条件激活

pub mod activation;
pub mod ansi;
pub mod app;
pub mod broadcaster;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod event;
pub mod failure;
pub mod listener;
pub mod logging;
pub mod multicaster;
pub mod phase;

// 重新导出常用类型
pub use activation::{
    decide, resolve, ActivationFlags, Condition, ConditionOutcome, FeatureProbe,
    FeatureSubmission, OnPropertyCondition, RegisteredFeatureProbe, StaticFeatureProbe,
};
pub use ansi::{AnsiEnabled, AnsiOutput, AnsiOutputListener};
pub use app::{ApplicationDescriptor, ApplicationRunner, BootApplication};
pub use broadcaster::{RunListener, StartupBroadcaster};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use context::{ConfigurableApplicationContext, ContextState, GenericApplicationContext};
pub use error::{ApplicationError, ApplicationResult, Result};
pub use event::{EventPayload, StartupEvent};
pub use failure::FailureRouter;
pub use listener::{
    load_listeners, ApplicationListener, ContextAware, FnListener, ListenerSubmission,
};
pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingListener};
pub use multicaster::{
    logging_error_handler, ApplicationEventMulticaster, ErrorHandler,
    SimpleApplicationEventMulticaster,
};
pub use phase::LifecyclePhase;

// 导出 async_trait 和 inventory，供宏使用
pub use async_trait;
pub use inventory;

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::activation::{
        Condition, ConditionOutcome, FeatureProbe, OnPropertyCondition, RegisteredFeatureProbe,
        StaticFeatureProbe,
    };
    pub use crate::app::{ApplicationDescriptor, ApplicationRunner, BootApplication};
    pub use crate::broadcaster::RunListener;
    pub use crate::config::{Environment, MapPropertySource, PropertySource};
    pub use crate::context::{ConfigurableApplicationContext, GenericApplicationContext};
    pub use crate::error::{ApplicationError, ApplicationResult, Result};
    pub use crate::event::StartupEvent;
    pub use crate::listener::{ApplicationListener, ContextAware, FnListener};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use crate::phase::LifecyclePhase;
    pub use crate::{submit_feature, submit_listener};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
