//! Web 模块配置常量定义
//!
//! 定义资源映射与 MVC 过滤器使用的配置键名称

// ==================== 静态资源配置 ====================

/// 是否注册默认的静态资源映射
pub const RESOURCES_ADD_MAPPINGS: &str = "resources.add-mappings";

/// 静态资源位置
pub const RESOURCES_STATIC_LOCATIONS: &str = "resources.static-locations";

/// 缓存时间（秒）
pub const RESOURCES_CACHE_PERIOD: &str = "resources.cache.period";

// ==================== 资源链配置 ====================

/// 资源链相关键的公共前缀
pub const RESOURCES_CHAIN_PREFIX: &str = "resources.chain.";

pub const RESOURCES_CHAIN_ENABLED: &str = "resources.chain.enabled";
pub const RESOURCES_CHAIN_CACHE: &str = "resources.chain.cache";
pub const RESOURCES_CHAIN_COMPRESSED: &str = "resources.chain.compressed";
pub const RESOURCES_CHAIN_HTML_APPLICATION_CACHE: &str = "resources.chain.html-application-cache";

pub const RESOURCES_CHAIN_FIXED_ENABLED: &str = "resources.chain.strategy.fixed.enabled";
pub const RESOURCES_CHAIN_FIXED_VERSION: &str = "resources.chain.strategy.fixed.version";
pub const RESOURCES_CHAIN_FIXED_PATHS: &str = "resources.chain.strategy.fixed.paths";

pub const RESOURCES_CHAIN_CONTENT_ENABLED: &str = "resources.chain.strategy.content.enabled";
pub const RESOURCES_CHAIN_CONTENT_PATHS: &str = "resources.chain.strategy.content.paths";

// ==================== MVC 配置 ====================

/// 静态资源的映射路径
pub const MVC_STATIC_PATH_PATTERN: &str = "mvc.static-path-pattern";

/// 固定的区域设置，例如 zh_CN
pub const MVC_LOCALE: &str = "mvc.locale";

/// 区域解析方式：fixed / accept-header
pub const MVC_LOCALE_RESOLVER: &str = "mvc.locale-resolver";

/// 视图名前缀与后缀
pub const MVC_VIEW_PREFIX: &str = "mvc.view.prefix";
pub const MVC_VIEW_SUFFIX: &str = "mvc.view.suffix";

pub const MVC_FAVICON_PREFIX: &str = "mvc.favicon";

pub const MVC_HIDDEN_METHOD_FILTER_PREFIX: &str = "mvc.hiddenmethod.filter";
pub const MVC_FORM_CONTENT_FILTER_PREFIX: &str = "mvc.formcontent.filter";

// ==================== 特性与默认值 ====================

/// 资源链在没有显式配置时依赖的特性
pub const WEBJARS_LOCATOR_FEATURE: &str = "webjars-locator";

pub const WEBJARS_PATH_PATTERN: &str = "/webjars/**";
pub const WEBJARS_LOCATION: &str = "classpath:/META-INF/resources/webjars/";

pub const FAVICON_PATH_PATTERN: &str = "**/favicon.ico";
/// 除静态资源位置外，favicon 还会在根路径下查找
pub const FAVICON_ROOT_LOCATION: &str = "classpath:/";

pub const DEFAULT_STATIC_PATH_PATTERN: &str = "/**";
pub const DEFAULT_STATIC_LOCATIONS: &[&str] = &[
    "classpath:/META-INF/resources/",
    "classpath:/resources/",
    "classpath:/static/",
    "classpath:/public/",
];
