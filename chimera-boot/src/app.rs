use crate::broadcaster::{RunListener, StartupBroadcaster};
use crate::config::{Environment, EnvironmentPropertySource, TomlPropertySource};
use crate::constants::{DEFAULT_CONFIG_FILE, DEFAULT_ENV_PREFIX, PROFILES_ACTIVE_SUFFIX};
use crate::context::{ConfigurableApplicationContext, GenericApplicationContext};
use crate::error::{ApplicationError, ApplicationResult, Result};
use crate::listener::{load_listeners, ApplicationListener};
use crate::logging::LoggingConfig;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// 应用描述
///
/// 启动期间只读：应用名称和注册的监听器
pub struct ApplicationDescriptor {
    name: String,
    listeners: Vec<Arc<dyn ApplicationListener>>,
}

impl ApplicationDescriptor {
    pub fn new(name: impl Into<String>, listeners: Vec<Arc<dyn ApplicationListener>>) -> Self {
        Self {
            name: name.into(),
            listeners,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn listeners(&self) -> &[Arc<dyn ApplicationListener>] {
        &self.listeners
    }
}

/// 在 STARTED 与 RUNNING 之间执行的任务
#[async_trait]
pub trait ApplicationRunner: Send + Sync {
    fn name(&self) -> &str {
        "AnonymousRunner"
    }

    async fn run(&self, context: &Arc<GenericApplicationContext>, args: &[String]) -> Result<()>;
}

type ContextInitializer = Box<dyn Fn(&Arc<GenericApplicationContext>) -> Result<()> + Send + Sync>;

type RunListenerFactory =
    Box<dyn Fn(Arc<ApplicationDescriptor>, Arc<[String]>) -> Arc<dyn RunListener> + Send + Sync>;

/// Chimera Boot 应用
///
/// 按固定顺序驱动启动阶段，并在失败时发布 FAILED 事件
pub struct BootApplication {
    name: String,
    config_files: Vec<String>,
    env_prefix: String,
    profiles: Vec<String>,
    show_banner: bool,
    logging_config: Option<LoggingConfig>,
    listeners: Vec<Arc<dyn ApplicationListener>>,
    register_default_listeners: bool,
    initializers: Vec<ContextInitializer>,
    runners: Vec<Arc<dyn ApplicationRunner>>,
    run_listener_factories: Vec<RunListenerFactory>,
}

impl BootApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec![DEFAULT_CONFIG_FILE.to_string()],
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            profiles: Vec::new(),
            show_banner: true,
            logging_config: None,
            listeners: Vec::new(),
            register_default_listeners: true,
            initializers: Vec::new(),
            runners: Vec::new(),
            run_listener_factories: Vec::new(),
        }
    }

    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// 设置日志配置
    ///
    /// 设置后在启动前立即初始化日志；否则由 LoggingListener 在 Environment 准备好后初始化
    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ApplicationListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// 是否加载通过 `submit_listener!` 注册的默认监听器
    pub fn register_default_listeners(mut self, enabled: bool) -> Self {
        self.register_default_listeners = enabled;
        self
    }

    /// 添加上下文初始化器，在 CONTEXT_PREPARED 之前执行
    pub fn initializer<F>(mut self, f: F) -> Self
    where
        F: Fn(&Arc<GenericApplicationContext>) -> Result<()> + Send + Sync + 'static,
    {
        self.initializers.push(Box::new(f));
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ApplicationRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    /// 添加额外的 RunListener
    pub fn run_listener<F>(mut self, factory: F) -> Self
    where
        F: Fn(Arc<ApplicationDescriptor>, Arc<[String]>) -> Arc<dyn RunListener>
            + Send
            + Sync
            + 'static,
    {
        self.run_listener_factories.push(Box::new(factory));
        self
    }

    /// 运行应用
    pub async fn run(self, args: Vec<String>) -> ApplicationResult<Arc<GenericApplicationContext>> {
        if let Some(config) = self.logging_config.clone() {
            config.init()?;
        }

        let start_time = std::time::Instant::now();

        let mut listeners = if self.register_default_listeners {
            load_listeners()
        } else {
            Vec::new()
        };
        listeners.extend(self.listeners.iter().cloned());

        let descriptor = Arc::new(ApplicationDescriptor::new(self.name.clone(), listeners));
        let args: Arc<[String]> = Arc::from(args);
        let run_listeners = self.create_run_listeners(&descriptor, &args);

        tracing::info!("Starting {} application", self.name);

        let mut context: Option<Arc<GenericApplicationContext>> = None;
        match self.run_phases(&run_listeners, &args, &mut context).await {
            Ok(context) => {
                tracing::info!(
                    "Started {} in {}ms",
                    self.name,
                    start_time.elapsed().as_millis()
                );
                Ok(context)
            }
            Err(e) => {
                tracing::error!("Application run failed: {}", e.chain_message());
                let handle = context.map(|c| c as Arc<dyn ConfigurableApplicationContext>);
                let cause = Arc::new(e);
                for listener in &run_listeners {
                    listener.failed(handle.as_ref(), &cause);
                }
                if let Some(handle) = &handle {
                    handle.close();
                }
                Err(Arc::try_unwrap(cause)
                    .unwrap_or_else(|shared| ApplicationError::Other(anyhow::anyhow!(shared.chain_message()))))
            }
        }
    }

    fn create_run_listeners(
        &self,
        descriptor: &Arc<ApplicationDescriptor>,
        args: &Arc<[String]>,
    ) -> Vec<Arc<dyn RunListener>> {
        let mut run_listeners: Vec<Arc<dyn RunListener>> = vec![Arc::new(StartupBroadcaster::new(
            Arc::clone(descriptor),
            Arc::clone(args),
        ))];
        for factory in &self.run_listener_factories {
            run_listeners.push(factory(Arc::clone(descriptor), Arc::clone(args)));
        }
        // stable sort: the broadcaster stays first among order 0
        run_listeners.sort_by_key(|l| l.order());
        run_listeners
    }

    async fn run_phases(
        &self,
        run_listeners: &[Arc<dyn RunListener>],
        args: &Arc<[String]>,
        context_slot: &mut Option<Arc<GenericApplicationContext>>,
    ) -> ApplicationResult<Arc<GenericApplicationContext>> {
        for listener in run_listeners {
            listener.starting()?;
        }

        let environment = Arc::new(self.prepare_environment()?);
        for listener in run_listeners {
            listener.environment_prepared(&environment)?;
        }

        if self.show_banner {
            self.print_banner();
        }

        let context = Arc::new(GenericApplicationContext::new(Arc::clone(&environment)));
        *context_slot = Some(Arc::clone(&context));
        let handle: Arc<dyn ConfigurableApplicationContext> = context.clone();

        for initializer in &self.initializers {
            initializer(&context)?;
        }
        for listener in run_listeners {
            listener.context_prepared(&handle)?;
        }

        for listener in run_listeners {
            listener.context_loaded(&handle)?;
        }

        handle.refresh()?;
        for listener in run_listeners {
            listener.started(&handle)?;
        }

        for runner in &self.runners {
            tracing::debug!("Calling runner: {}", runner.name());
            runner.run(&context, args).await?;
        }

        for listener in run_listeners {
            listener.running(&handle)?;
        }

        Ok(context)
    }

    /// 解析激活的 profiles
    ///
    /// 优先级：代码设置 > 环境变量 {prefix}PROFILES_ACTIVE
    fn active_profiles(&self) -> Vec<String> {
        if !self.profiles.is_empty() {
            return self.profiles.clone();
        }
        std::env::var(format!("{}{}", self.env_prefix, PROFILES_ACTIVE_SUFFIX))
            .map(|profiles| {
                profiles
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 构建 Environment
    ///
    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml
    /// 2. application-{profile}.toml
    /// 3. 环境变量
    fn prepare_environment(&self) -> ApplicationResult<Environment> {
        let environment = Environment::new();
        let active_profiles = self.active_profiles();

        for base_config in &self.config_files {
            self.load_config_file(&environment, base_config, 0)?;
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = profile_config_path(base_config, profile);
                self.load_config_file(&environment, &profile_config, 10 + index as i32)?;
            }
        }

        environment.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));

        if active_profiles.is_empty() {
            tracing::info!("No active profiles set, using default configuration");
        } else {
            tracing::info!("Active profiles: {:?}", active_profiles);
        }
        environment.set_active_profiles(active_profiles);

        Ok(environment)
    }

    /// 文件不存在时跳过，存在但无法解析时报错
    fn load_config_file(
        &self,
        environment: &Environment,
        config_file: &str,
        priority: i32,
    ) -> ApplicationResult<()> {
        if !Path::new(config_file).exists() {
            tracing::debug!("Configuration file not found: {}", config_file);
            return Ok(());
        }

        let source = TomlPropertySource::from_file(config_file)?;
        tracing::info!(
            "Loaded configuration from: {} (priority: {})",
            config_file,
            priority
        );
        environment.add_property_source(Box::new(source.with_priority(priority)));
        Ok(())
    }

    fn print_banner(&self) {
        println!();
        println!(r"   ____ _     _                           ");
        println!(r"  / ___| |__ (_)_ __ ___   ___ _ __ __ _ ");
        println!(r" | |   | '_ \| | '_ ` _ \ / _ \ '__/ _` |");
        println!(r" | |___| | | | | | | | | |  __/ | | (_| |");
        println!(r"  \____|_| |_|_|_| |_| |_|\___|_|  \__,_|");
        println!();
        println!("  :: Chimera Boot ::        (v{})", env!("CARGO_PKG_VERSION"));
        println!();
    }
}

impl Default for BootApplication {
    fn default() -> Self {
        Self::new("ChimeraApplication")
    }
}

/// 例如：application.toml -> application-dev.toml
///
/// 只识别文件名中的扩展名，目录里的 '.' 不受影响
fn profile_config_path(base_path: &str, profile: &str) -> String {
    let path = Path::new(base_path);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(ext)) => path
            .with_file_name(format!(
                "{}-{}.{}",
                stem.to_string_lossy(),
                profile,
                ext.to_string_lossy()
            ))
            .to_string_lossy()
            .into_owned(),
        _ => format!("{}-{}", base_path, profile),
    }
}
