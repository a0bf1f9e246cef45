use crate::config::Environment;
use crate::error::{ApplicationError, ApplicationResult, Result};
use crate::event::StartupEvent;
use crate::listener::ApplicationListener;
use crate::multicaster::{
    logging_error_handler, ApplicationEventMulticaster, SimpleApplicationEventMulticaster,
};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// 应用上下文句柄
///
/// 启动广播器通过此接口与宿主上下文交互
pub trait ConfigurableApplicationContext: Send + Sync {
    fn id(&self) -> &str;

    fn environment(&self) -> Arc<Environment>;

    /// 已刷新且尚未关闭
    fn is_active(&self) -> bool;

    /// 通过上下文自己的多播器发布事件
    fn publish_event(&self, event: &StartupEvent) -> ApplicationResult<()>;

    /// 以隔离策略发布事件
    ///
    /// 单个监听器失败只记录警告，其余监听器照常收到事件。用于失败事件的投递。
    fn publish_event_isolated(&self, event: &StartupEvent) -> ApplicationResult<()> {
        let multicaster = SimpleApplicationEventMulticaster::new();
        for listener in self.application_listeners() {
            multicaster.add_listener(listener);
        }
        multicaster.set_error_handler(logging_error_handler());
        multicaster.multicast_event(event)
    }

    /// 已注册的监听器（按注册顺序）
    fn application_listeners(&self) -> Vec<Arc<dyn ApplicationListener>>;

    fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>);

    fn refresh(&self) -> ApplicationResult<()>;

    fn close(&self);
}

/// 上下文状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Created,
    Active,
    Closed,
}

/// 刷新回调类型
pub type RefreshCallback = Box<dyn Fn(&GenericApplicationContext) -> Result<()> + Send + Sync>;

/// Shutdown hook类型
pub type ShutdownHook = Box<dyn Fn() -> Result<()> + Send + Sync>;

static CONTEXT_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// 通用应用上下文
///
/// 持有 Environment 和自己的事件多播器。`refresh` 成功后进入 Active 状态。
pub struct GenericApplicationContext {
    id: String,
    environment: Arc<Environment>,
    multicaster: SimpleApplicationEventMulticaster,
    state: RwLock<ContextState>,
    refresh_callbacks: RwLock<Vec<RefreshCallback>>,
    shutdown_hooks: RwLock<Vec<ShutdownHook>>,
}

impl GenericApplicationContext {
    pub fn new(environment: Arc<Environment>) -> Self {
        let sequence = CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::with_id(format!("application-{}", sequence), environment)
    }

    pub fn with_id(id: impl Into<String>, environment: Arc<Environment>) -> Self {
        Self {
            id: id.into(),
            environment,
            multicaster: SimpleApplicationEventMulticaster::new(),
            state: RwLock::new(ContextState::Created),
            refresh_callbacks: RwLock::new(Vec::new()),
            shutdown_hooks: RwLock::new(Vec::new()),
        }
    }

    pub fn state(&self) -> ContextState {
        *self.state.read()
    }

    /// 注册刷新回调，按注册顺序在 refresh 时执行
    pub fn add_refresh_callback<F>(&self, callback: F)
    where
        F: Fn(&GenericApplicationContext) -> Result<()> + Send + Sync + 'static,
    {
        self.refresh_callbacks.write().push(Box::new(callback));
    }

    /// 注册 shutdown hook
    ///
    /// Shutdown hook 会在上下文关闭时按注册顺序执行
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let mut hooks = self.shutdown_hooks.write();
        hooks.push(Box::new(hook));
        tracing::debug!("Registered shutdown hook, total: {}", hooks.len());
    }
}

impl ConfigurableApplicationContext for GenericApplicationContext {
    fn id(&self) -> &str {
        &self.id
    }

    fn environment(&self) -> Arc<Environment> {
        Arc::clone(&self.environment)
    }

    fn is_active(&self) -> bool {
        self.state() == ContextState::Active
    }

    fn publish_event(&self, event: &StartupEvent) -> ApplicationResult<()> {
        if self.state() == ContextState::Closed {
            return Err(ApplicationError::ContextUnavailable);
        }
        self.multicaster.multicast_event(event)
    }

    fn application_listeners(&self) -> Vec<Arc<dyn ApplicationListener>> {
        self.multicaster.listeners()
    }

    fn add_application_listener(&self, listener: Arc<dyn ApplicationListener>) {
        let already_registered = self
            .multicaster
            .listeners()
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &listener));
        if already_registered {
            tracing::debug!(
                "Listener '{}' already registered on context '{}'",
                listener.listener_name(),
                self.id
            );
            return;
        }
        self.multicaster.add_listener(listener);
    }

    fn refresh(&self) -> ApplicationResult<()> {
        if self.state() != ContextState::Created {
            return Err(ApplicationError::Other(anyhow::anyhow!(
                "Context '{}' cannot be refreshed in state {:?}",
                self.id,
                self.state()
            )));
        }

        tracing::info!("Refreshing application context '{}'", self.id);
        // 回调执行期间不持锁，回调里可以继续注册回调
        let callbacks = std::mem::take(&mut *self.refresh_callbacks.write());
        let result = callbacks.iter().try_for_each(|callback| callback(self));
        {
            let mut registered = self.refresh_callbacks.write();
            let added = std::mem::replace(&mut *registered, callbacks);
            registered.extend(added);
        }
        result?;

        *self.state.write() = ContextState::Active;
        tracing::debug!("Application context '{}' is active", self.id);
        Ok(())
    }

    fn close(&self) {
        {
            let mut state = self.state.write();
            if *state == ContextState::Closed {
                return;
            }
            *state = ContextState::Closed;
        }

        tracing::info!("Closing application context '{}'", self.id);
        for hook in self.shutdown_hooks.read().iter() {
            if let Err(e) = hook() {
                tracing::error!("Shutdown hook failed: {:#}", e);
            }
        }
    }
}

impl std::fmt::Debug for GenericApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericApplicationContext")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("listeners", &self.multicaster.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listener::FnListener;
    use std::sync::atomic::AtomicBool;

    fn context() -> GenericApplicationContext {
        GenericApplicationContext::with_id("test", Arc::new(Environment::new()))
    }

    #[test]
    fn test_refresh_activates_context() {
        let ctx = context();
        assert_eq!(ctx.state(), ContextState::Created);
        assert!(!ctx.is_active());

        ctx.refresh().unwrap();
        assert!(ctx.is_active());

        ctx.close();
        assert!(!ctx.is_active());
        assert_eq!(ctx.state(), ContextState::Closed);
    }

    #[test]
    fn test_failed_refresh_leaves_context_inactive() {
        let ctx = context();
        ctx.add_refresh_callback(|_| Err(anyhow::anyhow!("bean creation failed")));

        assert!(ctx.refresh().is_err());
        assert_eq!(ctx.state(), ContextState::Created);
    }

    #[test]
    fn test_refresh_callback_can_register_callbacks() {
        let ctx = context();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        ctx.add_refresh_callback(move |ctx| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            ctx.add_refresh_callback(|_| Ok(()));
            Ok(())
        });

        ctx.refresh().unwrap();
        assert!(ctx.is_active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.refresh_callbacks.read().len(), 2);
    }

    #[test]
    fn test_isolated_publish_reaches_every_listener() {
        let ctx = context();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        ctx.add_application_listener(Arc::new(FnListener::new("broken", |_| {
            Err(anyhow::anyhow!("cannot report"))
        })));
        ctx.add_application_listener(Arc::new(FnListener::new("reporter", move |_| {
            seen_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })));
        ctx.refresh().unwrap();

        let event = StartupEvent::starting(
            Arc::new(crate::app::ApplicationDescriptor::new("test", Vec::new())),
            Arc::from(Vec::<String>::new()),
        );
        assert!(ctx.publish_event(&event).is_err());
        assert_eq!(seen.load(Ordering::SeqCst), 0);

        ctx.publish_event_isolated(&event).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refresh_twice_is_rejected() {
        let ctx = context();
        ctx.refresh().unwrap();
        assert!(ctx.refresh().is_err());
    }

    #[test]
    fn test_identical_listener_is_registered_once() {
        let ctx = context();
        let listener: Arc<dyn ApplicationListener> = Arc::new(FnListener::new("l", |_| Ok(())));
        ctx.add_application_listener(Arc::clone(&listener));
        ctx.add_application_listener(Arc::clone(&listener));
        ctx.add_application_listener(Arc::new(FnListener::new("l", |_| Ok(()))));

        assert_eq!(ctx.application_listeners().len(), 2);
    }

    #[test]
    fn test_close_runs_shutdown_hooks() {
        let ctx = context();
        let called = Arc::new(AtomicBool::new(false));
        let called_clone = Arc::clone(&called);
        ctx.register_shutdown_hook(move || {
            called_clone.store(true, Ordering::SeqCst);
            Ok(())
        });
        ctx.register_shutdown_hook(|| Err(anyhow::anyhow!("ignored")));

        ctx.refresh().unwrap();
        ctx.close();
        assert!(called.load(Ordering::SeqCst));
    }
}
