use crate::constants::{ANSI_CONSOLE_AVAILABLE_PROPERTY, ANSI_ENABLED_PROPERTY};
use crate::error::{ApplicationError, Result};
use crate::event::StartupEvent;
use crate::listener::ApplicationListener;
use crate::phase::LifecyclePhase;
use parking_lot::RwLock;
use std::io::IsTerminal;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

/// ANSI 输出开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnsiEnabled {
    /// 根据终端自动检测
    #[default]
    Detect,
    Always,
    Never,
}

impl FromStr for AnsiEnabled {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "detect" => Ok(AnsiEnabled::Detect),
            "always" => Ok(AnsiEnabled::Always),
            "never" => Ok(AnsiEnabled::Never),
            _ => Err(format!("Invalid ANSI mode: {}", s)),
        }
    }
}

/// ANSI 输出设置
#[derive(Debug, Default)]
pub struct AnsiOutput {
    enabled: RwLock<AnsiEnabled>,
    console_available: RwLock<Option<bool>>,
}

impl AnsiOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级实例
    pub fn global() -> Arc<AnsiOutput> {
        static GLOBAL: OnceLock<Arc<AnsiOutput>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(AnsiOutput::new())))
    }

    pub fn enabled(&self) -> AnsiEnabled {
        *self.enabled.read()
    }

    pub fn set_enabled(&self, enabled: AnsiEnabled) {
        *self.enabled.write() = enabled;
    }

    pub fn console_available(&self) -> Option<bool> {
        *self.console_available.read()
    }

    pub fn set_console_available(&self, available: Option<bool>) {
        *self.console_available.write() = available;
    }

    /// 是否输出 ANSI 转义序列
    pub fn is_enabled(&self) -> bool {
        match self.enabled() {
            AnsiEnabled::Always => true,
            AnsiEnabled::Never => false,
            AnsiEnabled::Detect => self
                .console_available()
                .unwrap_or_else(|| std::io::stdout().is_terminal()),
        }
    }
}

/// 在 Environment 准备好之后应用 ANSI 配置
pub struct AnsiOutputListener {
    output: Arc<AnsiOutput>,
}

impl AnsiOutputListener {
    pub fn new(output: Arc<AnsiOutput>) -> Self {
        Self { output }
    }
}

impl Default for AnsiOutputListener {
    fn default() -> Self {
        Self::new(AnsiOutput::global())
    }
}

impl ApplicationListener for AnsiOutputListener {
    fn on_event(&self, event: &StartupEvent) -> Result<()> {
        let Some(env) = event.environment() else {
            return Ok(());
        };

        if let Some(value) = env.get_string(ANSI_ENABLED_PROPERTY) {
            let enabled = value
                .parse::<AnsiEnabled>()
                .map_err(|_| ApplicationError::ConfigurationBinding {
                    key: ANSI_ENABLED_PROPERTY.to_string(),
                    value,
                    expected: "one of detect, always, never",
                })?;
            self.output.set_enabled(enabled);
        }

        self.output
            .set_console_available(env.get_tri_state(ANSI_CONSOLE_AVAILABLE_PROPERTY)?);
        Ok(())
    }

    fn listener_name(&self) -> &str {
        "AnsiOutputListener"
    }

    fn supports_phase(&self, phase: LifecyclePhase) -> bool {
        phase == LifecyclePhase::EnvironmentPrepared
    }
}

crate::submit_listener!(AnsiOutputListener, 10);
