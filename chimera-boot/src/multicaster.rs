use crate::error::{ApplicationError, ApplicationResult};
use crate::event::StartupEvent;
use crate::listener::ApplicationListener;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// 错误处理器类型
///
/// 设置后多播器进入隔离模式：每个监听器的失败交给处理器，然后继续投递。
pub type ErrorHandler = Arc<dyn Fn(&dyn ApplicationListener, &StartupEvent, &anyhow::Error) + Send + Sync>;

/// 事件多播器 trait
///
/// 类似 Spring 的 ApplicationEventMulticaster，负责将事件传播到所有注册的监听器
pub trait ApplicationEventMulticaster: Send + Sync {
    /// 添加监听器（同一实例重复添加不会去重）
    fn add_listener(&self, listener: Arc<dyn ApplicationListener>);

    fn remove_all_listeners(&self);

    /// 按注册顺序返回当前监听器快照
    fn listeners(&self) -> Vec<Arc<dyn ApplicationListener>>;

    /// 同步广播事件
    ///
    /// 没有错误处理器时，第一个失败的监听器会中断后续投递并返回错误
    fn multicast_event(&self, event: &StartupEvent) -> ApplicationResult<()>;

    fn listener_count(&self) -> usize {
        self.listeners().len()
    }
}

/// 简单事件多播器实现
///
/// 按注册顺序同步调用监听器。注册与投递不能并发进行，调用方负责串行化。
pub struct SimpleApplicationEventMulticaster {
    listeners: RwLock<Vec<Arc<dyn ApplicationListener>>>,
    error_handler: RwLock<Option<ErrorHandler>>,
}

impl SimpleApplicationEventMulticaster {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            error_handler: RwLock::new(None),
        }
    }

    /// 设置错误处理器
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&dyn ApplicationListener, &StartupEvent, &anyhow::Error) + Send + Sync + 'static,
    {
        *self.error_handler.write() = Some(Arc::new(handler));
    }

    /// 移除错误处理器，恢复 fail-fast
    pub fn remove_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    pub fn has_error_handler(&self) -> bool {
        self.error_handler.read().is_some()
    }

    /// 调用单个监听器，panic 也视为失败
    fn invoke_listener(
        listener: &Arc<dyn ApplicationListener>,
        event: &StartupEvent,
    ) -> anyhow::Result<()> {
        match catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
            Ok(result) => result,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                Err(anyhow::anyhow!("Listener panicked: {}", message))
            }
        }
    }
}

impl Default for SimpleApplicationEventMulticaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationEventMulticaster for SimpleApplicationEventMulticaster {
    fn add_listener(&self, listener: Arc<dyn ApplicationListener>) {
        tracing::debug!("Added event listener: {}", listener.listener_name());
        self.listeners.write().push(listener);
    }

    fn remove_all_listeners(&self) {
        self.listeners.write().clear();
        tracing::debug!("Removed all event listeners");
    }

    fn listeners(&self) -> Vec<Arc<dyn ApplicationListener>> {
        self.listeners.read().clone()
    }

    fn multicast_event(&self, event: &StartupEvent) -> ApplicationResult<()> {
        let phase = event.phase();

        // 克隆监听器列表，避免回调期间持锁
        let listeners: Vec<_> = self
            .listeners
            .read()
            .iter()
            .filter(|l| l.supports_phase(phase))
            .map(Arc::clone)
            .collect();

        let error_handler = self.error_handler.read().clone();

        tracing::debug!(
            "Multicasting {} event to {} listener(s) (isolated: {})",
            phase,
            listeners.len(),
            error_handler.is_some()
        );

        for listener in &listeners {
            if let Err(err) = Self::invoke_listener(listener, event) {
                match &error_handler {
                    Some(handler) => handler(listener.as_ref(), event, &err),
                    None => {
                        tracing::error!(
                            "Listener '{}' failed while handling {} event: {:#}",
                            listener.listener_name(),
                            phase,
                            err
                        );
                        return Err(ApplicationError::listener_failure(
                            listener.listener_name(),
                            phase,
                            err,
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

/// 隔离模式的错误处理器：记录警告后继续投递
pub fn logging_error_handler(
) -> impl Fn(&dyn ApplicationListener, &StartupEvent, &anyhow::Error) + Send + Sync + 'static {
    |listener, event, err| {
        tracing::warn!(
            "Error calling listener '{}' for {} event: {:#}",
            listener.listener_name(),
            event.phase(),
            err
        );
    }
}
