//! Web MVC 自动配置
//!
//! 在 CONTEXT_LOADED 阶段读取上下文的 Environment，计算资源映射、视图与区域解析器，
//! 以及 favicon 和各个过滤器是否启用。结果通过 [`WebMvcAutoConfiguration::settings`] 暴露给宿主。

use crate::constants::*;
use crate::mvc::{FaviconMapping, LocaleResolver, ViewResolver};
use crate::properties::{MvcProperties, ResourceProperties};
use crate::resource_chain::OnEnabledResourceChainCondition;
use crate::resources::{
    add_resource_handlers, ResourceChainCustomizer, ResourceHandlerRegistrationCustomizer,
    ResourceHandlerRegistry,
};
use chimera_boot::prelude::*;
use parking_lot::RwLock;
use std::sync::Arc;

/// 自动配置的计算结果
#[derive(Debug, Clone)]
pub struct WebMvcSettings {
    pub resource_properties: ResourceProperties,
    pub mvc_properties: MvcProperties,
    pub resource_chain: ConditionOutcome,
    pub registry: ResourceHandlerRegistry,
    pub view_resolver: ViewResolver,
    /// `mvc.locale` 配置时才有区域解析器
    pub locale_resolver_condition: ConditionOutcome,
    pub locale_resolver: Option<LocaleResolver>,
    pub favicon: ConditionOutcome,
    pub favicon_mapping: Option<FaviconMapping>,
    pub hidden_method_filter: ConditionOutcome,
    pub form_content_filter: ConditionOutcome,
}

impl WebMvcSettings {
    pub fn resource_chain_enabled(&self) -> bool {
        self.resource_chain.is_match()
    }

    pub fn static_path_pattern(&self) -> &str {
        &self.mvc_properties.static_path_pattern
    }
}

/// 用户在默认映射之前注册的资源映射
pub type RegistryConfigurer = Box<dyn Fn(&mut ResourceHandlerRegistry) + Send + Sync>;

/// Web MVC 自动配置监听器
///
/// 需要注册到 [`BootApplication`]：
///
/// ```rust,ignore
/// let web = Arc::new(WebMvcAutoConfiguration::default());
/// BootApplication::new("demo").listener(web.clone()).run(args).await?;
/// assert!(web.settings().is_some());
/// ```
pub struct WebMvcAutoConfiguration {
    probe: Arc<dyn FeatureProbe>,
    configurers: Vec<RegistryConfigurer>,
    context: RwLock<Option<Arc<dyn ConfigurableApplicationContext>>>,
    settings: RwLock<Option<Arc<WebMvcSettings>>>,
}

impl Default for WebMvcAutoConfiguration {
    fn default() -> Self {
        Self::new(Arc::new(RegisteredFeatureProbe))
    }
}

impl WebMvcAutoConfiguration {
    pub fn new(probe: Arc<dyn FeatureProbe>) -> Self {
        Self {
            probe,
            configurers: Vec::new(),
            context: RwLock::new(None),
            settings: RwLock::new(None),
        }
    }

    /// 添加自定义资源映射
    pub fn with_resource_handlers<F>(mut self, configurer: F) -> Self
    where
        F: Fn(&mut ResourceHandlerRegistry) + Send + Sync + 'static,
    {
        self.configurers.push(Box::new(configurer));
        self
    }

    /// CONTEXT_LOADED 之后可用
    pub fn settings(&self) -> Option<Arc<WebMvcSettings>> {
        self.settings.read().clone()
    }

    /// 根据 Environment 计算配置
    pub fn configure(&self, env: &Environment) -> ApplicationResult<WebMvcSettings> {
        let resource_properties = ResourceProperties::from_environment(env)?;
        let mvc_properties = MvcProperties::from_environment(env)?;
        let resource_chain = OnEnabledResourceChainCondition.matches(env, self.probe.as_ref())?;

        let mut registry = ResourceHandlerRegistry::new();
        for configurer in &self.configurers {
            configurer(&mut registry);
        }

        let customizer = resource_chain
            .is_match()
            .then(|| ResourceChainCustomizer::new(resource_properties.chain.clone()));
        add_resource_handlers(
            &mut registry,
            &resource_properties,
            &mvc_properties.static_path_pattern,
            customizer
                .as_ref()
                .map(|c| c as &dyn ResourceHandlerRegistrationCustomizer),
        );

        let locale_resolver_condition = OnPropertyCondition::new("mvc", "locale")
            .any_value()
            .matches(env, self.probe.as_ref())?;
        let locale_resolver = if locale_resolver_condition.is_match() {
            LocaleResolver::from_properties(&mvc_properties)
        } else {
            None
        };

        let favicon = OnPropertyCondition::new(MVC_FAVICON_PREFIX, "enabled")
            .match_if_missing(true)
            .matches(env, self.probe.as_ref())?;
        let favicon_mapping = favicon
            .is_match()
            .then(|| FaviconMapping::from_properties(&resource_properties));

        let hidden_method_filter = OnPropertyCondition::new(MVC_HIDDEN_METHOD_FILTER_PREFIX, "enabled")
            .match_if_missing(true)
            .matches(env, self.probe.as_ref())?;
        let form_content_filter = OnPropertyCondition::new(MVC_FORM_CONTENT_FILTER_PREFIX, "enabled")
            .match_if_missing(true)
            .matches(env, self.probe.as_ref())?;

        Ok(WebMvcSettings {
            view_resolver: ViewResolver::from_properties(&mvc_properties),
            resource_properties,
            mvc_properties,
            resource_chain,
            registry,
            locale_resolver_condition,
            locale_resolver,
            favicon,
            favicon_mapping,
            hidden_method_filter,
            form_content_filter,
        })
    }
}

impl ContextAware for WebMvcAutoConfiguration {
    fn set_application_context(&self, context: Arc<dyn ConfigurableApplicationContext>) {
        *self.context.write() = Some(context);
    }
}

impl ApplicationListener for WebMvcAutoConfiguration {
    fn on_event(&self, _event: &StartupEvent) -> Result<()> {
        let context = self
            .context
            .read()
            .clone()
            .ok_or(ApplicationError::ContextUnavailable)?;

        let settings = self.configure(&context.environment())?;
        tracing::info!(
            "Web MVC configured: {} resource mapping(s), resource chain {}",
            settings.registry.registrations().len(),
            if settings.resource_chain_enabled() { "enabled" } else { "disabled" }
        );

        *self.settings.write() = Some(Arc::new(settings));
        Ok(())
    }

    fn listener_name(&self) -> &str {
        "WebMvcAutoConfiguration"
    }

    fn supports_phase(&self, phase: LifecyclePhase) -> bool {
        phase == LifecyclePhase::ContextLoaded
    }

    fn as_context_aware(&self) -> Option<&dyn ContextAware> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chimera_boot::StaticFeatureProbe;

    fn quiet_app(name: &str) -> BootApplication {
        BootApplication::new(name)
            .banner(false)
            .register_default_listeners(false)
            .config_files(Vec::new())
            .env_prefix("CHIMERA_BOOT_WEB_TEST_")
    }

    #[test]
    fn test_configure_defaults() {
        let config = WebMvcAutoConfiguration::new(Arc::new(StaticFeatureProbe::new()));
        let settings = config.configure(&Environment::new()).unwrap();

        assert!(!settings.resource_chain_enabled());
        assert_eq!(settings.static_path_pattern(), "/**");
        assert_eq!(settings.registry.registrations().len(), 2);
        assert!(settings
            .registry
            .registrations()
            .iter()
            .all(|r| r.chain().is_none()));
        assert!(settings.hidden_method_filter.is_match());
        assert!(settings.form_content_filter.is_match());
        assert_eq!(settings.view_resolver, ViewResolver::default());
        assert!(!settings.locale_resolver_condition.is_match());
        assert_eq!(settings.locale_resolver, None);
        assert!(settings.favicon.is_match());
        assert_eq!(
            settings.favicon_mapping.as_ref().map(|m| m.pattern.as_str()),
            Some("**/favicon.ico")
        );
    }

    fn configure_with(source: MapPropertySource) -> WebMvcSettings {
        let env = Environment::new();
        env.add_property_source(Box::new(source));
        WebMvcAutoConfiguration::new(Arc::new(StaticFeatureProbe::new()))
            .configure(&env)
            .unwrap()
    }

    #[test]
    fn test_favicon_can_be_disabled() {
        let settings =
            configure_with(MapPropertySource::new("test").with_property("mvc.favicon.enabled", false));

        assert!(!settings.favicon.is_match());
        assert_eq!(
            settings.favicon.message(),
            "property mvc.favicon.enabled=false (expected true)"
        );
        assert!(settings.favicon_mapping.is_none());
    }

    #[test]
    fn test_locale_resolver_requires_locale() {
        let settings = configure_with(
            MapPropertySource::new("test")
                .with_property(MVC_LOCALE, "zh_CN")
                .with_property(MVC_LOCALE_RESOLVER, "fixed"),
        );
        assert!(settings.locale_resolver_condition.is_match());
        assert_eq!(
            settings.locale_resolver,
            Some(LocaleResolver::Fixed {
                locale: "zh_CN".to_string()
            })
        );

        let settings =
            configure_with(MapPropertySource::new("test").with_property(MVC_LOCALE, "en_US"));
        assert_eq!(
            settings.locale_resolver,
            Some(LocaleResolver::AcceptHeader {
                default_locale: "en_US".to_string()
            })
        );

        let settings =
            configure_with(MapPropertySource::new("test").with_property(MVC_LOCALE, "false"));
        assert!(!settings.locale_resolver_condition.is_match());
        assert_eq!(settings.locale_resolver, None);
    }

    #[test]
    fn test_view_prefix_and_suffix() {
        let settings = configure_with(
            MapPropertySource::new("test")
                .with_property(MVC_VIEW_PREFIX, "/templates/")
                .with_property(MVC_VIEW_SUFFIX, ".html"),
        );

        assert_eq!(settings.view_resolver.resolve("home"), "/templates/home.html");
    }

    #[test]
    fn test_configure_with_webjars_locator() {
        let probe = StaticFeatureProbe::new().with_feature(WEBJARS_LOCATOR_FEATURE);
        let config = WebMvcAutoConfiguration::new(Arc::new(probe));
        let settings = config.configure(&Environment::new()).unwrap();

        assert!(settings.resource_chain_enabled());
        assert!(settings
            .registry
            .registrations()
            .iter()
            .all(|r| r.chain().is_some()));
    }

    #[test]
    fn test_user_mapping_takes_precedence() {
        let config = WebMvcAutoConfiguration::new(Arc::new(StaticFeatureProbe::new()))
            .with_resource_handlers(|registry| {
                registry
                    .add_resource_handler("/**")
                    .add_resource_locations(["file:/srv/site/"]);
            });
        let settings = config.configure(&Environment::new()).unwrap();

        let patterns: Vec<_> = settings
            .registry
            .registrations()
            .iter()
            .map(|r| r.pattern())
            .collect();
        assert_eq!(patterns, vec!["/**", "/webjars/**"]);
        assert_eq!(
            settings.registry.registration("/**").unwrap().locations(),
            ["file:/srv/site/"]
        );
    }

    #[test]
    fn test_event_without_bound_context_fails() {
        let config = WebMvcAutoConfiguration::default();
        let descriptor = Arc::new(ApplicationDescriptor::new("web", Vec::new()));
        let event = StartupEvent::starting(descriptor, Arc::from(Vec::new()));

        assert!(config.on_event(&event).is_err());
        assert!(config.settings().is_none());
    }

    #[tokio::test]
    async fn test_configured_during_startup() {
        let web = Arc::new(WebMvcAutoConfiguration::new(Arc::new(StaticFeatureProbe::new())));

        let context = quiet_app("web")
            .listener(web.clone())
            .initializer(|context| {
                context.environment().add_property_source(Box::new(
                    MapPropertySource::new("web-test")
                        .with_property(RESOURCES_CHAIN_CONTENT_ENABLED, true)
                        .with_property(MVC_STATIC_PATH_PATTERN, "/assets/**")
                        .with_property("mvc.hiddenmethod.filter.enabled", false),
                ));
                Ok(())
            })
            .run(Vec::new())
            .await
            .unwrap();

        assert!(context.is_active());
        let settings = web.settings().unwrap();
        assert!(settings.resource_chain_enabled());
        assert_eq!(settings.resource_chain.message(), "enabled");
        assert!(settings.registry.has_mapping_for_pattern("/assets/**"));
        assert!(!settings.hidden_method_filter.is_match());
        assert_eq!(
            settings.hidden_method_filter.message(),
            "property mvc.hiddenmethod.filter.enabled=false (expected true)"
        );
        assert!(context
            .application_listeners()
            .iter()
            .any(|l| l.listener_name() == "WebMvcAutoConfiguration"));
    }

    #[tokio::test]
    async fn test_invalid_switch_aborts_startup() {
        let web = Arc::new(WebMvcAutoConfiguration::new(Arc::new(StaticFeatureProbe::new())));

        let result = quiet_app("web-invalid")
            .listener(web.clone())
            .initializer(|context| {
                context.environment().add_property_source(Box::new(
                    MapPropertySource::new("web-test")
                        .with_property(RESOURCES_CHAIN_ENABLED, "maybe"),
                ));
                Ok(())
            })
            .run(Vec::new())
            .await;

        assert!(result.is_err());
        assert!(web.settings().is_none());
    }
}
