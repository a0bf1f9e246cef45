//! 视图、区域与 favicon 的装配结果

use crate::constants::{FAVICON_PATH_PATTERN, FAVICON_ROOT_LOCATION};
use crate::properties::{LocaleResolverKind, MvcProperties, ResourceProperties};

/// 默认视图解析器：视图名加上前缀和后缀
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewResolver {
    pub prefix: String,
    pub suffix: String,
}

impl ViewResolver {
    pub fn from_properties(properties: &MvcProperties) -> Self {
        Self {
            prefix: properties.view.prefix.clone(),
            suffix: properties.view.suffix.clone(),
        }
    }

    pub fn resolve(&self, view_name: &str) -> String {
        format!("{}{}{}", self.prefix, view_name, self.suffix)
    }
}

/// 区域解析器
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleResolver {
    Fixed { locale: String },
    AcceptHeader { default_locale: String },
}

impl LocaleResolver {
    /// 未配置 `mvc.locale` 时没有解析器
    pub fn from_properties(properties: &MvcProperties) -> Option<Self> {
        let locale = properties.locale.clone()?;
        Some(match properties.locale_resolver {
            LocaleResolverKind::Fixed => LocaleResolver::Fixed { locale },
            LocaleResolverKind::AcceptHeader => LocaleResolver::AcceptHeader {
                default_locale: locale,
            },
        })
    }

    /// 根据 Accept-Language 请求头选择区域
    pub fn resolve(&self, accept_language: Option<&str>) -> String {
        match self {
            LocaleResolver::Fixed { locale } => locale.clone(),
            LocaleResolver::AcceptHeader { default_locale } => accept_language
                .and_then(|header| header.split(',').next())
                .map(|tag| tag.split(';').next().unwrap_or(tag).trim())
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| default_locale.clone()),
        }
    }
}

/// favicon 映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconMapping {
    pub pattern: String,
    pub locations: Vec<String>,
}

impl FaviconMapping {
    /// 在静态资源位置和根路径下查找 favicon.ico
    pub fn from_properties(properties: &ResourceProperties) -> Self {
        let mut locations = properties.static_locations.clone();
        locations.push(FAVICON_ROOT_LOCATION.to_string());
        Self {
            pattern: FAVICON_PATH_PATTERN.to_string(),
            locations,
        }
    }
}
