use serde::{Deserialize, Serialize};

/// 调度派生的全局默认值
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    /// 来源实体未指定时区时使用的时区标识
    pub default_timezone: String,
    /// 写入任务元数据的默认执行超时（毫秒）
    pub default_task_timeout_ms: u64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_timezone: "UTC".to_string(),
            default_task_timeout_ms: 30_000,
        }
    }
}

impl SchedulingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.default_timezone.trim().is_empty() {
            return Err(anyhow::anyhow!("默认时区不能为空"));
        }
        if self.default_task_timeout_ms == 0 {
            return Err(anyhow::anyhow!("默认任务超时时间必须大于0"));
        }
        Ok(())
    }
}

/// 新建调度任务使用的默认重试策略
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicyConfig {
    pub enabled: bool,
    pub max_retries: u32,
    /// 首次重试间隔（毫秒）
    pub initial_delay_ms: u64,
    /// 指数退避倍数
    pub backoff_multiplier: f64,
    /// 最大重试间隔（毫秒）
    pub max_delay_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            initial_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryPolicyConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(anyhow::anyhow!(
                "退避倍数必须不小于1.0: {}",
                self.backoff_multiplier
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(anyhow::anyhow!(
                "首次重试间隔({})不能超过最大重试间隔({})",
                self.initial_delay_ms,
                self.max_delay_ms
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduling_config_validation() {
        let mut config = SchedulingConfig::default();
        assert!(config.validate().is_ok());

        config.default_timezone = "  ".to_string();
        assert!(config.validate().is_err());

        config.default_timezone = "Europe/Berlin".to_string();
        config.default_task_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_config_validation() {
        let mut config = RetryPolicyConfig::default();
        assert!(config.validate().is_ok());

        config.backoff_multiplier = 0.5;
        assert!(config.validate().is_err());

        config.backoff_multiplier = 2.0;
        config.initial_delay_ms = 120_000;
        assert!(config.validate().is_err());
    }
}
