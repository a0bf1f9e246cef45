use crate::context::ConfigurableApplicationContext;
use crate::error::Result;
use crate::event::StartupEvent;
use crate::phase::LifecyclePhase;
use std::sync::Arc;

/// 启动事件监听器
///
/// 类似 Spring 的 ApplicationListener。监听器通过 [`supports_phase`](Self::supports_phase)
/// 声明自己关心的阶段，多播器只投递匹配的事件。
pub trait ApplicationListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &StartupEvent) -> Result<()>;

    /// 获取监听器名称（用于日志）
    fn listener_name(&self) -> &str {
        "AnonymousListener"
    }

    /// 是否支持该阶段的事件（默认支持所有阶段）
    fn supports_phase(&self, phase: LifecyclePhase) -> bool {
        let _ = phase;
        true
    }

    /// 如果监听器需要绑定上下文，返回其 ContextAware 视图
    fn as_context_aware(&self) -> Option<&dyn ContextAware> {
        None
    }
}

/// 需要持有应用上下文引用的监听器
///
/// 在 CONTEXT_LOADED 事件投递之前，上下文会先通过此回调绑定。
pub trait ContextAware: Send + Sync {
    fn set_application_context(&self, context: Arc<dyn ConfigurableApplicationContext>);
}

/// 基于闭包的监听器
///
/// ```rust,ignore
/// let listener = FnListener::new("printer", |event| {
///     println!("{}", event.phase());
///     Ok(())
/// })
/// .on_phases(&[LifecyclePhase::Started, LifecyclePhase::Running]);
/// ```
pub struct FnListener<F> {
    name: String,
    phases: Option<Vec<LifecyclePhase>>,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&StartupEvent) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            phases: None,
            handler,
        }
    }

    /// 只接收指定阶段的事件
    pub fn on_phases(mut self, phases: &[LifecyclePhase]) -> Self {
        self.phases = Some(phases.to_vec());
        self
    }
}

impl<F> ApplicationListener for FnListener<F>
where
    F: Fn(&StartupEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &StartupEvent) -> Result<()> {
        (self.handler)(event)
    }

    fn listener_name(&self) -> &str {
        &self.name
    }

    fn supports_phase(&self, phase: LifecyclePhase) -> bool {
        self.phases
            .as_ref()
            .map_or(true, |phases| phases.contains(&phase))
    }
}

/// 用于全局注册默认监听器的宏
///
/// 类型必须实现 `Default`。
#[macro_export]
macro_rules! submit_listener {
    ($listener_type:ty) => {
        $crate::submit_listener!($listener_type, 0);
    };
    ($listener_type:ty, $order:expr) => {
        $crate::inventory::submit! {
            $crate::ListenerSubmission {
                name: stringify!($listener_type),
                order: $order,
                create: || {
                    ::std::sync::Arc::new(<$listener_type>::default())
                        as ::std::sync::Arc<dyn $crate::ApplicationListener>
                },
            }
        }
    };
}

/// 监听器提交结构
pub struct ListenerSubmission {
    pub name: &'static str,
    /// 数字越小越先注册
    pub order: i32,
    pub create: fn() -> Arc<dyn ApplicationListener>,
}

inventory::collect!(ListenerSubmission);

/// 从全局注册表加载所有默认监听器，按 order 排序
pub fn load_listeners() -> Vec<Arc<dyn ApplicationListener>> {
    let mut submissions: Vec<_> = inventory::iter::<ListenerSubmission>().collect();
    submissions.sort_by_key(|s| (s.order, s.name));

    submissions
        .into_iter()
        .map(|submission| {
            tracing::debug!("Loading registered listener: {}", submission.name);
            (submission.create)()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_listener_phase_filter() {
        let listener = FnListener::new("filtered", |_| Ok(()))
            .on_phases(&[LifecyclePhase::Started]);

        assert!(listener.supports_phase(LifecyclePhase::Started));
        assert!(!listener.supports_phase(LifecyclePhase::Starting));
        assert_eq!(listener.listener_name(), "filtered");
        assert!(listener.as_context_aware().is_none());
    }

    #[test]
    fn test_unfiltered_listener_supports_every_phase() {
        let listener = FnListener::new("all", |_| Ok(()));
        assert!(LifecyclePhase::all()
            .iter()
            .all(|phase| listener.supports_phase(*phase)));
        assert!(listener.supports_phase(LifecyclePhase::Failed));
    }

    #[test]
    fn test_load_listeners_is_ordered() {
        let listeners = load_listeners();
        let names: Vec<_> = listeners.iter().map(|l| l.listener_name().to_string()).collect();

        let ansi = names.iter().position(|n| n == "AnsiOutputListener");
        let logging = names.iter().position(|n| n == "LoggingListener");
        assert!(ansi.is_some());
        assert!(logging.is_some());
        assert!(ansi < logging);
    }
}
