// chimera-boot-web: 基于条件的 MVC 静态资源装配
//
// 提供：
// - 静态资源配置绑定
// - 资源链启用条件
// - 视图、区域解析器与 favicon 的条件装配
// - 默认资源映射注册
// - 在 CONTEXT_LOADED 阶段运行的自动配置监听器

pub mod auto_config;
pub mod constants;
pub mod mvc;
pub mod properties;
pub mod resource_chain;
pub mod resources;

pub use auto_config::{RegistryConfigurer, WebMvcAutoConfiguration, WebMvcSettings};
pub use mvc::{FaviconMapping, LocaleResolver, ViewResolver};
pub use properties::{
    ChainProperties, ContentStrategy, FixedStrategy, LocaleResolverKind, MvcProperties,
    ResourceProperties, StrategyProperties, ViewProperties,
};
pub use resource_chain::OnEnabledResourceChainCondition;
pub use resources::{
    add_resource_handlers, FixedVersion, ResourceChain, ResourceChainCustomizer,
    ResourceHandlerRegistration, ResourceHandlerRegistrationCustomizer, ResourceHandlerRegistry,
    ResourceResolver, ResourceTransformer, VersionStrategies,
};

/// Prelude 模块
pub mod prelude {
    pub use crate::auto_config::{WebMvcAutoConfiguration, WebMvcSettings};
    pub use crate::properties::{MvcProperties, ResourceProperties};
    pub use crate::resources::{ResourceHandlerRegistration, ResourceHandlerRegistry};
}
