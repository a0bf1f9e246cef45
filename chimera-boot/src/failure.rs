use crate::context::ConfigurableApplicationContext;
use crate::error::{ApplicationError, ApplicationResult};
use crate::event::StartupEvent;
use crate::multicaster::{
    logging_error_handler, ApplicationEventMulticaster, SimpleApplicationEventMulticaster,
};
use std::sync::Arc;

/// 启动失败事件的路由
///
/// 活动的上下文已经有完整的监听器，直接用它发布；否则退回到早期多播器，
/// 并先把上下文里已注册的监听器复制过来。两条路径都使用隔离策略，
/// 失败事件的投递本身永远不会返回错误。
pub struct FailureRouter<'a> {
    early: &'a SimpleApplicationEventMulticaster,
}

impl<'a> FailureRouter<'a> {
    pub fn new(early: &'a SimpleApplicationEventMulticaster) -> Self {
        Self { early }
    }

    /// 投递失败事件
    pub fn route(
        &self,
        context: Option<&Arc<dyn ConfigurableApplicationContext>>,
        event: &StartupEvent,
    ) {
        match Self::active_context(context) {
            Ok(active) => {
                tracing::debug!("Publishing failure event through context '{}'", active.id());
                if let Err(e) = active.publish_event_isolated(event) {
                    tracing::warn!("Error publishing failure event: {}", e);
                }
            }
            Err(reason) => {
                tracing::debug!("{}, falling back to early multicaster", reason);
                if let Some(inactive) = context {
                    self.adopt_listeners(inactive.as_ref());
                }
                self.early.set_error_handler(logging_error_handler());
                if let Err(e) = self.early.multicast_event(event) {
                    tracing::warn!("Error publishing failure event: {}", e);
                }
            }
        }
    }

    fn active_context(
        context: Option<&Arc<dyn ConfigurableApplicationContext>>,
    ) -> ApplicationResult<&Arc<dyn ConfigurableApplicationContext>> {
        context
            .filter(|c| c.is_active())
            .ok_or(ApplicationError::ContextUnavailable)
    }

    /// 复制上下文中已注册、但早期多播器还不知道的监听器
    fn adopt_listeners(&self, context: &dyn ConfigurableApplicationContext) {
        let known = self.early.listeners();
        for listener in context.application_listeners() {
            if known.iter().any(|existing| Arc::ptr_eq(existing, &listener)) {
                continue;
            }
            tracing::debug!(
                "Adopting listener '{}' from inactive context '{}'",
                listener.listener_name(),
                context.id()
            );
            self.early.add_listener(listener);
        }
    }
}
