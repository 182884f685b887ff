use std::time::Duration;

use serde::{Deserialize, Serialize};

use schedule_core::RetryPolicyConfig;
use schedule_errors::{ScheduleError, ScheduleResult};

/// 执行失败时的重试策略，由执行引擎在执行期解释
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RetryPolicyData")]
pub struct RetryPolicy {
    pub enabled: bool,
    pub max_retries: u32,
    /// 首次重试间隔（毫秒）
    pub initial_delay_ms: u64,
    /// 指数退避倍数
    pub backoff_multiplier: f64,
    /// 最大重试间隔（毫秒）
    pub max_delay_ms: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetryPolicyData {
    enabled: bool,
    max_retries: u32,
    initial_delay_ms: u64,
    backoff_multiplier: f64,
    max_delay_ms: u64,
}

impl TryFrom<RetryPolicyData> for RetryPolicy {
    type Error = ScheduleError;

    fn try_from(data: RetryPolicyData) -> Result<Self, Self::Error> {
        let policy = Self {
            enabled: data.enabled,
            max_retries: data.max_retries,
            initial_delay_ms: data.initial_delay_ms,
            backoff_multiplier: data.backoff_multiplier,
            max_delay_ms: data.max_delay_ms,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryPolicyConfig::default())
    }
}

impl From<&RetryPolicyConfig> for RetryPolicy {
    fn from(config: &RetryPolicyConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_retries: config.max_retries,
            initial_delay_ms: config.initial_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
            max_delay_ms: config.max_delay_ms,
        }
    }
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(ScheduleError::retry_policy(format!(
                "退避倍数必须不小于1.0: {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ScheduleError::retry_policy(format!(
                "首次重试间隔({})不能超过最大重试间隔({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// `attempt` 为已失败的次数（从1开始）
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.enabled && attempt >= 1 && attempt <= self.max_retries
    }

    /// 第 `attempt` 次重试前的等待时间：initial * multiplier^(attempt-1)，不超过上限
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        if !self.should_retry(attempt) {
            return None;
        }
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64);
        Some(Duration::from_millis(capped as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.max_retries, 3);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_deserialize_rejects_invalid_policy() {
        let value = serde_json::json!({
            "enabled": true,
            "maxRetries": 3,
            "initialDelayMs": 10_000,
            "backoffMultiplier": 2.0,
            "maxDelayMs": 1_000,
        });
        assert!(serde_json::from_value::<RetryPolicy>(value).is_err());

        let roundtrip = serde_json::to_value(RetryPolicy::default()).unwrap();
        assert_eq!(serde_json::from_value::<RetryPolicy>(roundtrip).unwrap(), RetryPolicy::default());
    }

    #[test]
    fn test_delay_grows_exponentially_and_is_capped() {
        let policy = RetryPolicy {
            enabled: true,
            max_retries: 5,
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 5_000,
        };

        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_secs(1)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for_attempt(3), Some(Duration::from_secs(4)));
        assert_eq!(policy.delay_for_attempt(4), Some(Duration::from_secs(5)));
        assert_eq!(policy.delay_for_attempt(6), None);
        assert_eq!(policy.delay_for_attempt(0), None);
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        let policy = RetryPolicy::disabled();
        assert!(!policy.should_retry(1));
        assert_eq!(policy.delay_for_attempt(1), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let policy = RetryPolicy {
            backoff_multiplier: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.validate().unwrap_err().code(), "RETRY_POLICY_ERROR");

        let policy = RetryPolicy {
            initial_delay_ms: 10,
            max_delay_ms: 5,
            ..RetryPolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
