//! 条件激活
//!
//! 自动配置模块在注册自己之前查询这里的判定：多个三态开关组合成一个结论，
//! 没有任何显式配置时再退回到特性探测。

use crate::config::Environment;
use crate::error::ApplicationResult;
use std::collections::HashSet;
use std::fmt;

/// 组合三个开关
///
/// `chain` 显式配置时直接生效；否则 `fixed || content` 为真时返回 `Some(true)`；
/// 其余情况返回 `None`，由调用方使用后备信号。
pub fn decide(fixed: bool, content: bool, chain: Option<bool>) -> Option<bool> {
    if chain.is_some() {
        return chain;
    }
    if fixed || content {
        return Some(true);
    }
    None
}

/// 用后备信号补全未设置的判定
pub fn resolve(decision: Option<bool>, fallback_present: bool) -> bool {
    decision.unwrap_or(fallback_present)
}

/// 一组激活开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActivationFlags {
    pub fixed: bool,
    pub content: bool,
    pub chain: Option<bool>,
}

impl ActivationFlags {
    /// 从配置中读取 `{prefix}strategy.fixed.enabled`、`{prefix}strategy.content.enabled`
    /// 和 `{prefix}enabled`
    pub fn from_environment(env: &Environment, prefix: &str) -> ApplicationResult<Self> {
        let enabled = |key: &str| format!("{}{}enabled", prefix, key);
        Ok(Self {
            fixed: env
                .get_property_or(&enabled("strategy.fixed."), Some(false))?
                .unwrap_or(false),
            content: env
                .get_property_or(&enabled("strategy.content."), Some(false))?
                .unwrap_or(false),
            chain: env.get_property_or(&enabled(""), None)?,
        })
    }

    pub fn decide(&self) -> Option<bool> {
        decide(self.fixed, self.content, self.chain)
    }
}

/// 特性存在性探测
///
/// 相当于“某个类是否在 classpath 上”。
pub trait FeatureProbe: Send + Sync {
    fn is_present(&self, feature: &str) -> bool;
}

impl<F> FeatureProbe for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_present(&self, feature: &str) -> bool {
        self(feature)
    }
}

/// 固定特性集合
#[derive(Debug, Clone, Default)]
pub struct StaticFeatureProbe {
    features: HashSet<String>,
}

impl StaticFeatureProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }
}

impl<S: Into<String>> FromIterator<S> for StaticFeatureProbe {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            features: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl FeatureProbe for StaticFeatureProbe {
    fn is_present(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// 特性提交结构，由链接进来的 crate 声明自己提供的特性
pub struct FeatureSubmission {
    pub name: &'static str,
}

inventory::collect!(FeatureSubmission);

/// 声明一个可被探测到的特性
#[macro_export]
macro_rules! submit_feature {
    ($name:expr) => {
        $crate::inventory::submit! {
            $crate::FeatureSubmission { name: $name }
        }
    };
}

/// 基于全局注册表的特性探测
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisteredFeatureProbe;

impl FeatureProbe for RegisteredFeatureProbe {
    fn is_present(&self, feature: &str) -> bool {
        inventory::iter::<FeatureSubmission>().any(|submission| submission.name == feature)
    }
}

/// 条件判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    matched: bool,
    message: String,
}

impl ConditionOutcome {
    pub fn matched(message: impl Into<String>) -> Self {
        Self {
            matched: true,
            message: message.into(),
        }
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        Self {
            matched: false,
            message: message.into(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConditionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.matched { "matched" } else { "did not match" };
        write!(f, "{} ({})", verdict, self.message)
    }
}

/// 激活条件
pub trait Condition: Send + Sync {
    fn name(&self) -> &str;

    /// 判定条件，配置值无法绑定时返回错误
    fn matches(
        &self,
        env: &Environment,
        probe: &dyn FeatureProbe,
    ) -> ApplicationResult<ConditionOutcome>;
}

/// 基于单个属性的条件
///
/// 属性值（忽略大小写）等于 `having_value` 时匹配，未配置时按 `match_if_missing` 决定。
/// 使用 [`any_value`](Self::any_value) 后，除 `false` 以外的任何值都匹配。
#[derive(Debug, Clone)]
pub struct OnPropertyCondition {
    key: String,
    having_value: Option<String>,
    match_if_missing: bool,
}

impl OnPropertyCondition {
    pub fn new(prefix: &str, name: &str) -> Self {
        let key = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", prefix.trim_end_matches('.'), name)
        };
        Self {
            key,
            having_value: Some("true".to_string()),
            match_if_missing: false,
        }
    }

    pub fn having_value(mut self, value: impl Into<String>) -> Self {
        self.having_value = Some(value.into());
        self
    }

    /// 只要属性存在且不是 `false` 即匹配
    pub fn any_value(mut self) -> Self {
        self.having_value = None;
        self
    }

    pub fn match_if_missing(mut self, value: bool) -> Self {
        self.match_if_missing = value;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Condition for OnPropertyCondition {
    fn name(&self) -> &str {
        "OnPropertyCondition"
    }

    fn matches(
        &self,
        env: &Environment,
        _probe: &dyn FeatureProbe,
    ) -> ApplicationResult<ConditionOutcome> {
        let outcome = match env.get_string(&self.key) {
            None if self.match_if_missing => {
                ConditionOutcome::matched(format!("property {} not set, matching by default", self.key))
            }
            None => ConditionOutcome::no_match(format!("did not find property {}", self.key)),
            Some(value) => {
                let trimmed = value.trim();
                let matched = match &self.having_value {
                    Some(expected) => trimmed.eq_ignore_ascii_case(expected),
                    None => !trimmed.eq_ignore_ascii_case("false"),
                };
                match (&self.having_value, matched) {
                    (_, true) => ConditionOutcome::matched(format!("property {}={}", self.key, value)),
                    (Some(expected), false) => ConditionOutcome::no_match(format!(
                        "property {}={} (expected {})",
                        self.key, value, expected
                    )),
                    (None, false) => {
                        ConditionOutcome::no_match(format!("property {}={}", self.key, value))
                    }
                }
            }
        };
        tracing::debug!("{} on '{}': {}", self.name(), self.key, outcome);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapPropertySource;
    use crate::error::ApplicationError;

    const TRI_STATES: [Option<bool>; 3] = [None, Some(true), Some(false)];

    #[test]
    fn test_explicit_chain_always_wins() {
        for fixed in [true, false] {
            for content in [true, false] {
                assert_eq!(decide(fixed, content, Some(true)), Some(true));
                assert_eq!(decide(fixed, content, Some(false)), Some(false));
            }
        }
    }

    #[test]
    fn test_strategy_enables_when_chain_unset() {
        assert_eq!(decide(true, false, None), Some(true));
        assert_eq!(decide(false, true, None), Some(true));
        assert_eq!(decide(true, true, None), Some(true));
    }

    #[test]
    fn test_no_signal_falls_back() {
        assert_eq!(decide(false, false, None), None);
        assert!(resolve(None, true));
        assert!(!resolve(None, false));
    }

    #[test]
    fn test_resolve_keeps_explicit_decision() {
        for decision in TRI_STATES {
            for fallback in [true, false] {
                let first = resolve(decision, fallback);
                assert_eq!(first, resolve(decision, fallback));
                if let Some(explicit) = decision {
                    assert_eq!(first, explicit);
                }
            }
        }
    }

    #[test]
    fn test_chain_false_is_not_overridden_by_feature() {
        let decision = decide(true, true, Some(false));
        assert!(!resolve(decision, true));
    }

    #[test]
    fn test_flags_from_environment() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("resources.chain.strategy.content.enabled", "true"),
        ));

        let flags = ActivationFlags::from_environment(&env, "resources.chain.").unwrap();
        assert_eq!(
            flags,
            ActivationFlags {
                fixed: false,
                content: true,
                chain: None
            }
        );
        assert_eq!(flags.decide(), Some(true));
    }

    #[test]
    fn test_malformed_flag_is_binding_failure() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test").with_property("resources.chain.enabled", "sometimes"),
        ));

        let result = ActivationFlags::from_environment(&env, "resources.chain.");
        assert!(matches!(
            result,
            Err(ApplicationError::ConfigurationBinding { .. })
        ));
    }

    #[test]
    fn test_feature_probes() {
        let probe: StaticFeatureProbe = ["webjars-locator"].into_iter().collect();
        assert!(probe.is_present("webjars-locator"));
        assert!(!probe.is_present("other"));

        let closure = |feature: &str| feature.starts_with("web");
        assert!(closure.is_present("webjars-locator"));

        assert!(!RegisteredFeatureProbe.is_present("never-registered-feature"));
    }

    #[test]
    fn test_on_property_condition() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("mvc.hiddenmethod.filter.enabled", false)
                .with_property("mvc.locale", "en_US"),
        ));
        let probe = StaticFeatureProbe::new();

        let disabled = OnPropertyCondition::new("mvc.hiddenmethod.filter", "enabled")
            .match_if_missing(true);
        assert!(!disabled.matches(&env, &probe).unwrap().is_match());

        let missing = OnPropertyCondition::new("mvc.formcontent.filter", "enabled")
            .match_if_missing(true);
        assert!(missing.matches(&env, &probe).unwrap().is_match());

        let locale = OnPropertyCondition::new("mvc", "locale").having_value("en_us");
        assert_eq!(locale.key(), "mvc.locale");
        assert!(locale.matches(&env, &probe).unwrap().is_match());

        let absent = OnPropertyCondition::new("", "favicon.enabled");
        let outcome = absent.matches(&env, &probe).unwrap();
        assert!(!outcome.is_match());
        assert_eq!(outcome.message(), "did not find property favicon.enabled");
    }

    #[test]
    fn test_any_value_matches_everything_but_false() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("test")
                .with_property("mvc.locale", "zh_CN")
                .with_property("mvc.favicon.enabled", "FALSE"),
        ));
        let probe = StaticFeatureProbe::new();

        let locale = OnPropertyCondition::new("mvc", "locale").any_value();
        let outcome = locale.matches(&env, &probe).unwrap();
        assert!(outcome.is_match());
        assert_eq!(outcome.message(), "property mvc.locale=zh_CN");

        let favicon = OnPropertyCondition::new("mvc.favicon", "enabled").any_value();
        let outcome = favicon.matches(&env, &probe).unwrap();
        assert!(!outcome.is_match());
        assert_eq!(outcome.message(), "property mvc.favicon.enabled=FALSE");

        let missing = OnPropertyCondition::new("mvc", "view.prefix").any_value();
        assert!(!missing.matches(&env, &probe).unwrap().is_match());
    }
}
