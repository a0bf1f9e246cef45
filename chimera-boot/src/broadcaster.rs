use crate::app::ApplicationDescriptor;
use crate::config::Environment;
use crate::context::ConfigurableApplicationContext;
use crate::error::{ApplicationError, ApplicationResult};
use crate::event::StartupEvent;
use crate::failure::FailureRouter;
use crate::multicaster::{ApplicationEventMulticaster, SimpleApplicationEventMulticaster};
use crate::phase::LifecyclePhase;
use parking_lot::Mutex;
use std::sync::Arc;

/// 启动过程监听器
///
/// 引导程序按阶段顺序调用每个方法，`failed` 可以在任何阶段之后调用。
pub trait RunListener: Send + Sync {
    /// 数字越小越先调用
    fn order(&self) -> i32 {
        0
    }

    fn starting(&self) -> ApplicationResult<()>;

    fn environment_prepared(&self, environment: &Arc<Environment>) -> ApplicationResult<()>;

    fn context_prepared(
        &self,
        context: &Arc<dyn ConfigurableApplicationContext>,
    ) -> ApplicationResult<()>;

    fn context_loaded(
        &self,
        context: &Arc<dyn ConfigurableApplicationContext>,
    ) -> ApplicationResult<()>;

    fn started(&self, context: &Arc<dyn ConfigurableApplicationContext>)
        -> ApplicationResult<()>;

    fn running(&self, context: &Arc<dyn ConfigurableApplicationContext>)
        -> ApplicationResult<()>;

    /// 启动失败，不允许再返回错误
    fn failed(
        &self,
        context: Option<&Arc<dyn ConfigurableApplicationContext>>,
        cause: &Arc<ApplicationError>,
    );
}

/// 启动事件广播器
///
/// 上下文加载之前的事件由早期多播器投递，它在构造时复制了应用的全部监听器；
/// 从 CONTEXT_LOADED 开始，监听器被注册到上下文中，事件改由上下文自己的多播器投递。
pub struct StartupBroadcaster {
    application: Arc<ApplicationDescriptor>,
    args: Arc<[String]>,
    initial_multicaster: SimpleApplicationEventMulticaster,
    last_phase: Mutex<Option<LifecyclePhase>>,
}

impl StartupBroadcaster {
    pub fn new(application: Arc<ApplicationDescriptor>, args: Arc<[String]>) -> Self {
        let initial_multicaster = SimpleApplicationEventMulticaster::new();
        for listener in application.listeners() {
            initial_multicaster.add_listener(Arc::clone(listener));
        }

        Self {
            application,
            args,
            initial_multicaster,
            last_phase: Mutex::new(None),
        }
    }

    pub fn application(&self) -> &Arc<ApplicationDescriptor> {
        &self.application
    }

    /// 最近一次发出的阶段
    pub fn last_phase(&self) -> Option<LifecyclePhase> {
        *self.last_phase.lock()
    }

    /// 早期多播器，上下文加载之前的事件都经由它投递
    pub fn initial_multicaster(&self) -> &SimpleApplicationEventMulticaster {
        &self.initial_multicaster
    }

    /// 校验并记录阶段切换，只允许进入紧接着的下一个阶段
    fn advance(&self, next: LifecyclePhase) -> ApplicationResult<()> {
        let mut last = self.last_phase.lock();
        let expected = match *last {
            None => Some(LifecyclePhase::Starting),
            Some(phase) => phase.next(),
        };

        if expected != Some(next) {
            return Err(ApplicationError::PhaseOrder {
                previous: last.map_or_else(|| "nothing".to_string(), |p| p.to_string()),
                next,
            });
        }

        tracing::debug!("Entering lifecycle phase {}", next);
        *last = Some(next);
        Ok(())
    }

    fn context_event(
        &self,
        phase: LifecyclePhase,
        context: &Arc<dyn ConfigurableApplicationContext>,
    ) -> StartupEvent {
        StartupEvent::with_context(
            phase,
            Arc::clone(&self.application),
            Arc::clone(&self.args),
            Arc::clone(context),
        )
    }

    /// 把应用的监听器注册到上下文：先绑定上下文，再注册
    fn register_with_context(&self, context: &Arc<dyn ConfigurableApplicationContext>) {
        for listener in self.application.listeners() {
            if let Some(aware) = listener.as_context_aware() {
                tracing::debug!(
                    "Binding context '{}' to listener '{}'",
                    context.id(),
                    listener.listener_name()
                );
                aware.set_application_context(Arc::clone(context));
            }
            context.add_application_listener(Arc::clone(listener));
        }
    }
}

impl RunListener for StartupBroadcaster {
    fn starting(&self) -> ApplicationResult<()> {
        self.advance(LifecyclePhase::Starting)?;
        let event = StartupEvent::starting(Arc::clone(&self.application), Arc::clone(&self.args));
        self.initial_multicaster.multicast_event(&event)
    }

    fn environment_prepared(&self, environment: &Arc<Environment>) -> ApplicationResult<()> {
        self.advance(LifecyclePhase::EnvironmentPrepared)?;
        let event = StartupEvent::environment_prepared(
            Arc::clone(&self.application),
            Arc::clone(&self.args),
            Arc::clone(environment),
        );
        self.initial_multicaster.multicast_event(&event)
    }

    fn context_prepared(
        &self,
        context: &Arc<dyn ConfigurableApplicationContext>,
    ) -> ApplicationResult<()> {
        self.advance(LifecyclePhase::ContextPrepared)?;
        let event = self.context_event(LifecyclePhase::ContextPrepared, context);
        self.initial_multicaster.multicast_event(&event)
    }

    fn context_loaded(
        &self,
        context: &Arc<dyn ConfigurableApplicationContext>,
    ) -> ApplicationResult<()> {
        self.advance(LifecyclePhase::ContextLoaded)?;
        self.register_with_context(context);
        let event = self.context_event(LifecyclePhase::ContextLoaded, context);
        context.publish_event(&event)
    }

    fn started(&self, context: &Arc<dyn ConfigurableApplicationContext>) -> ApplicationResult<()> {
        self.advance(LifecyclePhase::Started)?;
        context.publish_event(&self.context_event(LifecyclePhase::Started, context))
    }

    fn running(&self, context: &Arc<dyn ConfigurableApplicationContext>) -> ApplicationResult<()> {
        self.advance(LifecyclePhase::Running)?;
        context.publish_event(&self.context_event(LifecyclePhase::Running, context))
    }

    fn failed(
        &self,
        context: Option<&Arc<dyn ConfigurableApplicationContext>>,
        cause: &Arc<ApplicationError>,
    ) {
        {
            let mut last = self.last_phase.lock();
            if *last == Some(LifecyclePhase::Failed) {
                tracing::warn!("Startup failure already reported, ignoring: {}", cause);
                return;
            }
            *last = Some(LifecyclePhase::Failed);
        }

        let event = StartupEvent::failed(
            Arc::clone(&self.application),
            Arc::clone(&self.args),
            context.cloned(),
            Arc::clone(cause),
        );
        FailureRouter::new(&self.initial_multicaster).route(context, &event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::GenericApplicationContext;
    use crate::listener::{ApplicationListener, ContextAware, FnListener};
    use crate::error::Result;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(name: &str, log: &Log) -> Arc<dyn ApplicationListener> {
        let log = Arc::clone(log);
        let label = name.to_string();
        Arc::new(FnListener::new(name, move |event| {
            log.lock().push(format!("{}:{}", label, event.phase()));
            Ok(())
        }))
    }

    /// 记录收到 CONTEXT_LOADED 时是否已经绑定了上下文
    #[derive(Default)]
    struct AwareListener {
        context: Mutex<Option<Arc<dyn ConfigurableApplicationContext>>>,
        received: Mutex<Vec<(LifecyclePhase, bool)>>,
    }

    impl ContextAware for AwareListener {
        fn set_application_context(&self, context: Arc<dyn ConfigurableApplicationContext>) {
            *self.context.lock() = Some(context);
        }
    }

    impl ApplicationListener for AwareListener {
        fn on_event(&self, event: &StartupEvent) -> Result<()> {
            let bound = self.context.lock().is_some();
            self.received.lock().push((event.phase(), bound));
            Ok(())
        }

        fn listener_name(&self) -> &str {
            "AwareListener"
        }

        fn supports_phase(&self, phase: LifecyclePhase) -> bool {
            phase >= LifecyclePhase::ContextLoaded
        }

        fn as_context_aware(&self) -> Option<&dyn ContextAware> {
            Some(self)
        }
    }

    fn broadcaster(listeners: Vec<Arc<dyn ApplicationListener>>) -> StartupBroadcaster {
        let app = Arc::new(ApplicationDescriptor::new("test-app", listeners));
        StartupBroadcaster::new(app, Arc::from(vec!["--debug".to_string()]))
    }

    fn new_context() -> (Arc<GenericApplicationContext>, Arc<dyn ConfigurableApplicationContext>) {
        let concrete = Arc::new(GenericApplicationContext::with_id(
            "test",
            Arc::new(Environment::new()),
        ));
        let handle: Arc<dyn ConfigurableApplicationContext> = concrete.clone();
        (concrete, handle)
    }

    #[test]
    fn test_early_phases_do_not_touch_context() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let b = broadcaster(vec![recorder("A", &log)]);
        let (_, ctx) = new_context();

        b.starting().unwrap();
        b.environment_prepared(&ctx.environment()).unwrap();
        b.context_prepared(&ctx).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["A:STARTING", "A:ENVIRONMENT_PREPARED", "A:CONTEXT_PREPARED"]
        );
        assert!(ctx.application_listeners().is_empty());
    }

    #[test]
    fn test_context_phases_are_delivered_through_context() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let b = broadcaster(vec![recorder("A", &log)]);
        let (_, ctx) = new_context();

        b.starting().unwrap();
        b.environment_prepared(&ctx.environment()).unwrap();
        b.context_prepared(&ctx).unwrap();
        b.context_loaded(&ctx).unwrap();

        // 清空早期多播器后，后续事件只能经由上下文到达
        b.initial_multicaster().remove_all_listeners();
        ctx.refresh().unwrap();
        b.started(&ctx).unwrap();
        b.running(&ctx).unwrap();

        assert_eq!(ctx.application_listeners().len(), 1);
        assert_eq!(
            log.lock()[3..].to_vec(),
            vec!["A:CONTEXT_LOADED", "A:STARTED", "A:RUNNING"]
        );
    }

    #[test]
    fn test_context_is_bound_before_context_loaded_delivery() {
        let aware = Arc::new(AwareListener::default());
        let b = broadcaster(vec![aware.clone() as Arc<dyn ApplicationListener>]);
        let (_, ctx) = new_context();

        b.starting().unwrap();
        b.environment_prepared(&ctx.environment()).unwrap();
        b.context_prepared(&ctx).unwrap();
        assert!(aware.context.lock().is_none());

        b.context_loaded(&ctx).unwrap();

        assert_eq!(*aware.received.lock(), vec![(LifecyclePhase::ContextLoaded, true)]);
        let bound = aware.context.lock().clone().unwrap();
        assert_eq!(bound.id(), "test");
    }

    #[test]
    fn test_out_of_order_phase_is_rejected() {
        let b = broadcaster(Vec::new());
        let (_, ctx) = new_context();

        match b.started(&ctx) {
            Err(ApplicationError::PhaseOrder { previous, next }) => {
                assert_eq!(previous, "nothing");
                assert_eq!(next, LifecyclePhase::Started);
            }
            other => panic!("Expected PhaseOrder error, got {:?}", other),
        }

        b.starting().unwrap();
        assert!(b.starting().is_err());
        assert!(b.context_prepared(&ctx).is_err());
        assert_eq!(b.last_phase(), Some(LifecyclePhase::Starting));
    }

    #[test]
    fn test_failed_before_any_context() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let b = broadcaster(vec![recorder("A", &log)]);

        b.starting().unwrap();
        b.failed(None, &Arc::new(ApplicationError::Config("bad".to_string())));

        assert_eq!(*log.lock(), vec!["A:STARTING", "A:FAILED"]);
        assert_eq!(b.last_phase(), Some(LifecyclePhase::Failed));
    }

    #[test]
    fn test_failure_is_reported_once() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let b = broadcaster(vec![recorder("A", &log)]);
        let cause = Arc::new(ApplicationError::ContextUnavailable);

        b.failed(None, &cause);
        b.failed(None, &cause);

        assert_eq!(*log.lock(), vec!["A:FAILED"]);
    }

    #[test]
    fn test_failure_event_carries_cause_and_args() {
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let listener: Arc<dyn ApplicationListener> = Arc::new(
            FnListener::new("reporter", move |event| {
                let cause = event.cause().map(|c| c.to_string());
                *seen_clone.lock() = Some((cause, event.args().to_vec()));
                Ok(())
            })
            .on_phases(&[LifecyclePhase::Failed]),
        );
        let b = broadcaster(vec![listener]);

        b.failed(None, &Arc::new(ApplicationError::Config("missing file".to_string())));

        let (cause, args) = seen.lock().clone().unwrap();
        assert_eq!(cause.as_deref(), Some("Configuration error: missing file"));
        assert_eq!(args, vec!["--debug"]);
    }
}
