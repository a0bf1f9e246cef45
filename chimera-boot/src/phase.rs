use serde::{Deserialize, Serialize};
use std::fmt;

/// 应用启动的生命周期阶段
///
/// 正常顺序：
/// STARTING -> ENVIRONMENT_PREPARED -> CONTEXT_PREPARED -> CONTEXT_LOADED -> STARTED -> RUNNING
///
/// FAILED 是终止阶段，可以出现在任何阶段之后。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecyclePhase {
    /// 应用开始启动，此时只有 Environment 之前的信息
    Starting,
    /// Environment 已准备好
    EnvironmentPrepared,
    /// ApplicationContext 已创建，初始化器已执行
    ContextPrepared,
    /// 上下文已加载监听器，尚未刷新
    ContextLoaded,
    /// 上下文已刷新，runner 尚未执行
    Started,
    /// 应用已就绪
    Running,
    /// 启动失败
    Failed,
}

impl LifecyclePhase {
    /// 按顺序返回所有正常阶段（不包含 FAILED）
    pub fn all() -> &'static [LifecyclePhase] {
        &[
            LifecyclePhase::Starting,
            LifecyclePhase::EnvironmentPrepared,
            LifecyclePhase::ContextPrepared,
            LifecyclePhase::ContextLoaded,
            LifecyclePhase::Started,
            LifecyclePhase::Running,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Starting => "STARTING",
            LifecyclePhase::EnvironmentPrepared => "ENVIRONMENT_PREPARED",
            LifecyclePhase::ContextPrepared => "CONTEXT_PREPARED",
            LifecyclePhase::ContextLoaded => "CONTEXT_LOADED",
            LifecyclePhase::Started => "STARTED",
            LifecyclePhase::Running => "RUNNING",
            LifecyclePhase::Failed => "FAILED",
        }
    }

    /// 正常顺序中的下一个阶段
    pub fn next(&self) -> Option<LifecyclePhase> {
        match self {
            LifecyclePhase::Starting => Some(LifecyclePhase::EnvironmentPrepared),
            LifecyclePhase::EnvironmentPrepared => Some(LifecyclePhase::ContextPrepared),
            LifecyclePhase::ContextPrepared => Some(LifecyclePhase::ContextLoaded),
            LifecyclePhase::ContextLoaded => Some(LifecyclePhase::Started),
            LifecyclePhase::Started => Some(LifecyclePhase::Running),
            LifecyclePhase::Running | LifecyclePhase::Failed => None,
        }
    }

    /// 该阶段的事件是否必须通过早期多播器投递
    ///
    /// CONTEXT_LOADED 之前上下文还没有注册任何监听器。
    pub fn is_early(&self) -> bool {
        matches!(
            self,
            LifecyclePhase::Starting
                | LifecyclePhase::EnvironmentPrepared
                | LifecyclePhase::ContextPrepared
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecyclePhase::Running | LifecyclePhase::Failed)
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phases_are_totally_ordered() {
        let phases = LifecyclePhase::all();
        for pair in phases.windows(2) {
            assert!(pair[0] < pair[1]);
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(LifecyclePhase::Running.next(), None);
        assert_eq!(LifecyclePhase::Failed.next(), None);
    }

    #[test]
    fn test_early_phases() {
        let early: Vec<_> = LifecyclePhase::all().iter().filter(|p| p.is_early()).collect();
        assert_eq!(
            early,
            vec![
                &LifecyclePhase::Starting,
                &LifecyclePhase::EnvironmentPrepared,
                &LifecyclePhase::ContextPrepared
            ]
        );
        assert!(!LifecyclePhase::Failed.is_early());
    }

    #[test]
    fn test_display() {
        assert_eq!(LifecyclePhase::ContextLoaded.to_string(), "CONTEXT_LOADED");
        assert!(LifecyclePhase::Failed.is_terminal());
        assert!(!LifecyclePhase::Started.is_terminal());
    }
}
