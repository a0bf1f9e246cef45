//! 资源链启用条件

use crate::constants::{RESOURCES_CHAIN_PREFIX, WEBJARS_LOCATOR_FEATURE};
use chimera_boot::prelude::*;
use chimera_boot::ActivationFlags;

/// 资源链是否启用
///
/// `resources.chain.enabled` 显式配置时直接采用；任一版本策略启用时视为启用；
/// 都没有配置时，只有 webjars 定位器可用才启用。
#[derive(Debug, Clone, Copy, Default)]
pub struct OnEnabledResourceChainCondition;

impl Condition for OnEnabledResourceChainCondition {
    fn name(&self) -> &str {
        "OnEnabledResourceChainCondition"
    }

    fn matches(
        &self,
        env: &Environment,
        probe: &dyn FeatureProbe,
    ) -> ApplicationResult<ConditionOutcome> {
        let flags = ActivationFlags::from_environment(env, RESOURCES_CHAIN_PREFIX)?;

        let outcome = match flags.decide() {
            Some(true) => ConditionOutcome::matched("enabled"),
            Some(false) => ConditionOutcome::no_match("disabled"),
            None if probe.is_present(WEBJARS_LOCATOR_FEATURE) => {
                ConditionOutcome::matched(format!("found feature {}", WEBJARS_LOCATOR_FEATURE))
            }
            None => ConditionOutcome::no_match(format!(
                "did not find feature {}",
                WEBJARS_LOCATOR_FEATURE
            )),
        };

        tracing::debug!("Resource chain condition: {}", outcome);
        Ok(outcome)
    }
}

#[cfg(feature = "webjars-locator")]
chimera_boot::submit_feature!(crate::constants::WEBJARS_LOCATOR_FEATURE);
