//! 静态资源处理器注册

use crate::constants::{WEBJARS_LOCATION, WEBJARS_PATH_PATTERN};
use crate::properties::{ChainProperties, ResourceProperties};

/// 资源解析器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceResolver {
    /// 优先返回预压缩的资源
    Encoded,
    /// 按版本策略解析带版本号的路径
    Version(VersionStrategies),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionStrategies {
    pub fixed: Option<FixedVersion>,
    /// 使用内容哈希作为版本的路径
    pub content_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedVersion {
    pub version: Option<String>,
    pub paths: Vec<String>,
}

/// 资源转换器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceTransformer {
    AppCacheManifest,
}

/// 资源链
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChain {
    pub cache: bool,
    pub resolvers: Vec<ResourceResolver>,
    pub transformers: Vec<ResourceTransformer>,
}

impl ResourceChain {
    pub fn new(cache: bool) -> Self {
        Self {
            cache,
            resolvers: Vec::new(),
            transformers: Vec::new(),
        }
    }
}

/// 单个路径模式的资源映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandlerRegistration {
    pattern: String,
    locations: Vec<String>,
    cache_period: Option<u64>,
    chain: Option<ResourceChain>,
}

impl ResourceHandlerRegistration {
    fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            locations: Vec::new(),
            cache_period: None,
            chain: None,
        }
    }

    pub fn add_resource_locations<I, S>(&mut self, locations: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations.extend(locations.into_iter().map(Into::into));
        self
    }

    pub fn set_cache_period(&mut self, seconds: Option<u64>) -> &mut Self {
        self.cache_period = seconds;
        self
    }

    /// 启用资源链并返回它，重复调用返回同一个链
    pub fn resource_chain(&mut self, cache: bool) -> &mut ResourceChain {
        self.chain.get_or_insert_with(|| ResourceChain::new(cache))
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn cache_period(&self) -> Option<u64> {
        self.cache_period
    }

    pub fn chain(&self) -> Option<&ResourceChain> {
        self.chain.as_ref()
    }
}

/// 资源映射注册表，保持注册顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHandlerRegistry {
    registrations: Vec<ResourceHandlerRegistration>,
}

impl ResourceHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource_handler(&mut self, pattern: &str) -> &mut ResourceHandlerRegistration {
        self.registrations.push(ResourceHandlerRegistration::new(pattern));
        let index = self.registrations.len() - 1;
        &mut self.registrations[index]
    }

    pub fn has_mapping_for_pattern(&self, pattern: &str) -> bool {
        self.registrations.iter().any(|r| r.pattern == pattern)
    }

    pub fn registration(&self, pattern: &str) -> Option<&ResourceHandlerRegistration> {
        self.registrations.iter().find(|r| r.pattern == pattern)
    }

    pub fn registrations(&self) -> &[ResourceHandlerRegistration] {
        &self.registrations
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// 对新增的资源映射做额外配置
pub trait ResourceHandlerRegistrationCustomizer: Send + Sync {
    fn customize(&self, registration: &mut ResourceHandlerRegistration);
}

/// 根据资源链配置安装解析器和转换器
#[derive(Debug, Clone)]
pub struct ResourceChainCustomizer {
    properties: ChainProperties,
}

impl ResourceChainCustomizer {
    pub fn new(properties: ChainProperties) -> Self {
        Self { properties }
    }

    fn version_strategies(&self) -> VersionStrategies {
        let strategy = &self.properties.strategy;
        VersionStrategies {
            fixed: strategy.fixed.enabled.then(|| FixedVersion {
                version: strategy.fixed.version.clone(),
                paths: strategy.fixed.paths.clone(),
            }),
            content_paths: strategy
                .content
                .enabled
                .then(|| strategy.content.paths.clone()),
        }
    }
}

impl ResourceHandlerRegistrationCustomizer for ResourceChainCustomizer {
    fn customize(&self, registration: &mut ResourceHandlerRegistration) {
        let props = &self.properties;
        let strategies = self.version_strategies();
        let chain = registration.resource_chain(props.cache);

        if props.compressed {
            chain.resolvers.push(ResourceResolver::Encoded);
        }
        if strategies.fixed.is_some() || strategies.content_paths.is_some() {
            chain.resolvers.push(ResourceResolver::Version(strategies));
        }
        if props.html_application_cache {
            chain.transformers.push(ResourceTransformer::AppCacheManifest);
        }
    }
}

/// 注册默认的资源映射
///
/// `/webjars/**` 和静态资源路径各自只在尚未被映射时注册，
/// 已有的用户映射保持不变。
pub fn add_resource_handlers(
    registry: &mut ResourceHandlerRegistry,
    properties: &ResourceProperties,
    static_path_pattern: &str,
    customizer: Option<&dyn ResourceHandlerRegistrationCustomizer>,
) {
    if !properties.add_mappings {
        tracing::debug!("Default resource handling disabled");
        return;
    }

    let mappings = [
        (WEBJARS_PATH_PATTERN, vec![WEBJARS_LOCATION.to_string()]),
        (static_path_pattern, properties.static_locations.clone()),
    ];

    for (pattern, locations) in mappings {
        if registry.has_mapping_for_pattern(pattern) {
            tracing::debug!("Resource pattern '{}' already mapped, skipping", pattern);
            continue;
        }

        let registration = registry.add_resource_handler(pattern);
        registration
            .add_resource_locations(locations)
            .set_cache_period(properties.cache_period);
        if let Some(customizer) = customizer {
            customizer.customize(registration);
        }
        tracing::debug!("Mapped resource pattern '{}'", pattern);
    }
}
