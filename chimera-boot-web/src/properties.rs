//! 静态资源与 MVC 配置

use crate::constants::*;
use chimera_boot::activation::decide;
use chimera_boot::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 静态资源配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResourceProperties {
    /// 是否注册默认的资源映射
    pub add_mappings: bool,

    pub static_locations: Vec<String>,

    /// 缓存时间（秒），未配置表示不设置
    pub cache_period: Option<u64>,

    pub chain: ChainProperties,
}

impl Default for ResourceProperties {
    fn default() -> Self {
        Self {
            add_mappings: true,
            static_locations: DEFAULT_STATIC_LOCATIONS.iter().map(|s| s.to_string()).collect(),
            cache_period: None,
            chain: ChainProperties::default(),
        }
    }
}

impl ResourceProperties {
    /// 从 Environment 绑定配置
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        let defaults = Self::default();
        let cache_period = match env.get_string(RESOURCES_CACHE_PERIOD) {
            None => None,
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                ApplicationError::ConfigurationBinding {
                    key: RESOURCES_CACHE_PERIOD.to_string(),
                    value: value.clone(),
                    expected: "a number of seconds",
                }
            })?),
        };

        Ok(Self {
            add_mappings: env
                .get_tri_state(RESOURCES_ADD_MAPPINGS)?
                .unwrap_or(defaults.add_mappings),
            static_locations: env
                .get_string_array(RESOURCES_STATIC_LOCATIONS)
                .map(|locations| locations.into_iter().map(normalize_location).collect())
                .unwrap_or(defaults.static_locations),
            cache_period,
            chain: ChainProperties::from_environment(env)?,
        })
    }
}

/// 资源位置统一以 '/' 结尾
fn normalize_location(location: String) -> String {
    if location.ends_with('/') {
        location
    } else {
        format!("{}/", location)
    }
}

/// 资源链配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainProperties {
    /// 显式开关，未设置时由版本策略决定
    pub enabled: Option<bool>,

    /// 是否缓存资源解析结果
    pub cache: bool,

    /// 是否解析预压缩资源（gzip、brotli）
    pub compressed: bool,

    pub html_application_cache: bool,

    pub strategy: StrategyProperties,
}

impl Default for ChainProperties {
    fn default() -> Self {
        Self {
            enabled: None,
            cache: true,
            compressed: false,
            html_application_cache: false,
            strategy: StrategyProperties::default(),
        }
    }
}

impl ChainProperties {
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        Ok(Self {
            enabled: env.get_tri_state(RESOURCES_CHAIN_ENABLED)?,
            cache: env.get_tri_state(RESOURCES_CHAIN_CACHE)?.unwrap_or(true),
            compressed: env.get_tri_state(RESOURCES_CHAIN_COMPRESSED)?.unwrap_or(false),
            html_application_cache: env
                .get_tri_state(RESOURCES_CHAIN_HTML_APPLICATION_CACHE)?
                .unwrap_or(false),
            strategy: StrategyProperties {
                fixed: FixedStrategy {
                    enabled: env.get_tri_state(RESOURCES_CHAIN_FIXED_ENABLED)?.unwrap_or(false),
                    version: env.get_string(RESOURCES_CHAIN_FIXED_VERSION),
                    paths: env
                        .get_string_array(RESOURCES_CHAIN_FIXED_PATHS)
                        .unwrap_or_else(default_paths),
                },
                content: ContentStrategy {
                    enabled: env
                        .get_tri_state(RESOURCES_CHAIN_CONTENT_ENABLED)?
                        .unwrap_or(false),
                    paths: env
                        .get_string_array(RESOURCES_CHAIN_CONTENT_PATHS)
                        .unwrap_or_else(default_paths),
                },
            },
        })
    }

    /// 组合后的开关，`None` 表示需要依赖特性探测
    pub fn effective_enabled(&self) -> Option<bool> {
        decide(
            self.strategy.fixed.enabled,
            self.strategy.content.enabled,
            self.enabled,
        )
    }
}

fn default_paths() -> Vec<String> {
    vec!["/**".to_string()]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyProperties {
    pub fixed: FixedStrategy,
    pub content: ContentStrategy,
}

/// 固定版本策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedStrategy {
    pub enabled: bool,
    pub version: Option<String>,
    pub paths: Vec<String>,
}

impl Default for FixedStrategy {
    fn default() -> Self {
        Self {
            enabled: false,
            version: None,
            paths: default_paths(),
        }
    }
}

/// 内容哈希版本策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStrategy {
    pub enabled: bool,
    pub paths: Vec<String>,
}

impl Default for ContentStrategy {
    fn default() -> Self {
        Self {
            enabled: false,
            paths: default_paths(),
        }
    }
}

/// 区域解析方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocaleResolverKind {
    /// 总是使用配置的区域
    Fixed,
    /// 优先使用请求头 Accept-Language，缺失时使用配置的区域
    #[default]
    AcceptHeader,
}

impl FromStr for LocaleResolverKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fixed" => Ok(LocaleResolverKind::Fixed),
            "accept-header" => Ok(LocaleResolverKind::AcceptHeader),
            _ => Err(format!("Invalid locale resolver: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewProperties {
    pub prefix: String,
    pub suffix: String,
}

/// MVC 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MvcProperties {
    pub static_path_pattern: String,
    pub locale: Option<String>,
    pub locale_resolver: LocaleResolverKind,
    pub view: ViewProperties,
}

impl Default for MvcProperties {
    fn default() -> Self {
        Self {
            static_path_pattern: DEFAULT_STATIC_PATH_PATTERN.to_string(),
            locale: None,
            locale_resolver: LocaleResolverKind::default(),
            view: ViewProperties::default(),
        }
    }
}

impl MvcProperties {
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        let locale_resolver = match env.get_string(MVC_LOCALE_RESOLVER) {
            None => LocaleResolverKind::default(),
            Some(value) => value.parse().map_err(|_| ApplicationError::ConfigurationBinding {
                key: MVC_LOCALE_RESOLVER.to_string(),
                value: value.clone(),
                expected: "one of fixed, accept-header",
            })?,
        };

        Ok(Self {
            static_path_pattern: env
                .get_string_or(MVC_STATIC_PATH_PATTERN, DEFAULT_STATIC_PATH_PATTERN),
            locale: env.get_string(MVC_LOCALE),
            locale_resolver,
            view: ViewProperties {
                prefix: env.get_string_or(MVC_VIEW_PREFIX, ""),
                suffix: env.get_string_or(MVC_VIEW_SUFFIX, ""),
            },
        })
    }
}
