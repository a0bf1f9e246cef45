use crate::app::ApplicationDescriptor;
use crate::config::Environment;
use crate::context::ConfigurableApplicationContext;
use crate::error::ApplicationError;
use crate::phase::LifecyclePhase;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// 事件携带的阶段相关数据
#[derive(Clone)]
pub enum EventPayload {
    /// STARTING：只有应用信息和参数
    None,
    /// ENVIRONMENT_PREPARED
    Environment(Arc<Environment>),
    /// CONTEXT_PREPARED / CONTEXT_LOADED / STARTED / RUNNING
    Context(Arc<dyn ConfigurableApplicationContext>),
    /// FAILED：上下文可能还不存在
    Failure {
        context: Option<Arc<dyn ConfigurableApplicationContext>>,
        cause: Arc<ApplicationError>,
    },
}

/// 启动事件
///
/// 每次阶段切换创建一次，投递后即丢弃，不会被修改。
#[derive(Clone)]
pub struct StartupEvent {
    phase: LifecyclePhase,
    application: Arc<ApplicationDescriptor>,
    args: Arc<[String]>,
    payload: EventPayload,
    timestamp: SystemTime,
}

impl StartupEvent {
    fn new(
        phase: LifecyclePhase,
        application: Arc<ApplicationDescriptor>,
        args: Arc<[String]>,
        payload: EventPayload,
    ) -> Self {
        Self {
            phase,
            application,
            args,
            payload,
            timestamp: SystemTime::now(),
        }
    }

    pub fn starting(application: Arc<ApplicationDescriptor>, args: Arc<[String]>) -> Self {
        Self::new(LifecyclePhase::Starting, application, args, EventPayload::None)
    }

    pub fn environment_prepared(
        application: Arc<ApplicationDescriptor>,
        args: Arc<[String]>,
        environment: Arc<Environment>,
    ) -> Self {
        Self::new(
            LifecyclePhase::EnvironmentPrepared,
            application,
            args,
            EventPayload::Environment(environment),
        )
    }

    /// 构建携带上下文的事件（CONTEXT_PREPARED 到 RUNNING）
    pub fn with_context(
        phase: LifecyclePhase,
        application: Arc<ApplicationDescriptor>,
        args: Arc<[String]>,
        context: Arc<dyn ConfigurableApplicationContext>,
    ) -> Self {
        debug_assert!(phase >= LifecyclePhase::ContextPrepared && phase <= LifecyclePhase::Running);
        Self::new(phase, application, args, EventPayload::Context(context))
    }

    pub fn failed(
        application: Arc<ApplicationDescriptor>,
        args: Arc<[String]>,
        context: Option<Arc<dyn ConfigurableApplicationContext>>,
        cause: Arc<ApplicationError>,
    ) -> Self {
        Self::new(
            LifecyclePhase::Failed,
            application,
            args,
            EventPayload::Failure { context, cause },
        )
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn application(&self) -> &Arc<ApplicationDescriptor> {
        &self.application
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// 事件可见的 Environment
    ///
    /// ENVIRONMENT_PREPARED 直接携带，之后的阶段从上下文中获取
    pub fn environment(&self) -> Option<Arc<Environment>> {
        match &self.payload {
            EventPayload::None => None,
            EventPayload::Environment(env) => Some(Arc::clone(env)),
            EventPayload::Context(context) => Some(context.environment()),
            EventPayload::Failure { context, .. } => context.as_ref().map(|c| c.environment()),
        }
    }

    pub fn context(&self) -> Option<&Arc<dyn ConfigurableApplicationContext>> {
        match &self.payload {
            EventPayload::Context(context) => Some(context),
            EventPayload::Failure { context, .. } => context.as_ref(),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&Arc<ApplicationError>> {
        match &self.payload {
            EventPayload::Failure { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl fmt::Debug for StartupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupEvent")
            .field("phase", &self.phase)
            .field("application", &self.application.name())
            .field("args", &self.args)
            .field("context", &self.context().map(|c| c.id().to_string()))
            .field("cause", &self.cause().map(|c| c.to_string()))
            .finish()
    }
}
