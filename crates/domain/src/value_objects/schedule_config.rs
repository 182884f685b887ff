use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schedule_core::CronScheduler;
use schedule_errors::{ScheduleError, ScheduleResult};

/// 调度配置：CRON表达式 + 时区 + 有效期窗口 + 执行次数上限
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ScheduleConfigData")]
pub struct ScheduleConfig {
    cron_expression: String,
    timezone: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    max_executions: Option<u32>,
}

/// 反序列化的中间形态，校验通过后才成为 [`ScheduleConfig`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleConfigData {
    cron_expression: String,
    timezone: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    max_executions: Option<u32>,
}

impl TryFrom<ScheduleConfigData> for ScheduleConfig {
    type Error = ScheduleError;

    fn try_from(data: ScheduleConfigData) -> Result<Self, Self::Error> {
        let config = Self {
            cron_expression: data.cron_expression,
            timezone: data.timezone,
            start_date: data.start_date,
            end_date: data.end_date,
            max_executions: data.max_executions,
        };
        config.validate()?;
        Ok(config)
    }
}

impl ScheduleConfig {
    pub fn new<E: Into<String>, T: Into<String>>(cron_expression: E, timezone: T) -> ScheduleResult<Self> {
        let config = Self {
            cron_expression: cron_expression.into(),
            timezone: timezone.into(),
            start_date: None,
            end_date: None,
            max_executions: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn cron_expression(&self) -> &str {
        &self.cron_expression
    }

    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn max_executions(&self) -> Option<u32> {
        self.max_executions
    }

    pub fn with_cron_expression<E: Into<String>>(&self, cron_expression: E) -> ScheduleResult<Self> {
        let config = Self {
            cron_expression: cron_expression.into(),
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_timezone<T: Into<String>>(&self, timezone: T) -> ScheduleResult<Self> {
        let config = Self {
            timezone: timezone.into(),
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_window(
        &self,
        start_date: Option<DateTime<Utc>>,
        end_date: Option<DateTime<Utc>>,
    ) -> ScheduleResult<Self> {
        let config = Self {
            start_date,
            end_date,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_executions(&self, max_executions: Option<u32>) -> ScheduleResult<Self> {
        let config = Self {
            max_executions,
            ..self.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// 给定时间是否处于有效期窗口内（起始包含，结束不包含）
    pub fn is_within_window(&self, at: DateTime<Utc>) -> bool {
        let after_start = self.start_date.map_or(true, |start| at >= start);
        let before_end = self.end_date.map_or(true, |end| at < end);
        after_start && before_end
    }

    fn validate(&self) -> ScheduleResult<()> {
        if self.cron_expression.trim().is_empty() {
            return Err(ScheduleError::invalid_config(
                "cronExpression",
                "CRON表达式不能为空",
            ));
        }
        CronScheduler::validate_cron_expression(&self.cron_expression)?;

        if self.timezone.trim().is_empty() {
            return Err(ScheduleError::invalid_config("timezone", "时区不能为空"));
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start >= end {
                return Err(ScheduleError::invalid_config(
                    "startDate",
                    format!("开始时间 {start} 必须早于结束时间 {end}"),
                ));
            }
        }

        if self.max_executions == Some(0) {
            return Err(ScheduleError::invalid_config(
                "maxExecutions",
                "最大执行次数必须大于0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_new_schedule_config() {
        let config = ScheduleConfig::new("0 0 9 * * *", "UTC").unwrap();
        assert_eq!(config.cron_expression(), "0 0 9 * * *");
        assert_eq!(config.timezone(), "UTC");
        assert!(config.start_date().is_none());
        assert!(config.max_executions().is_none());
    }

    #[test]
    fn test_rejects_empty_expression_and_timezone() {
        let error = ScheduleConfig::new("  ", "UTC").unwrap_err();
        assert_eq!(error.code(), "INVALID_SCHEDULE_CONFIG");

        let error = ScheduleConfig::new("0 0 9 * * *", "").unwrap_err();
        assert_eq!(error.code(), "INVALID_SCHEDULE_CONFIG");
    }

    #[test]
    fn test_rejects_malformed_expression() {
        let error = ScheduleConfig::new("0 0 9 * *", "UTC").unwrap_err();
        assert_eq!(error.code(), "INVALID_CRON_EXPRESSION");
    }

    #[test]
    fn test_window_must_be_ordered() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(10);
        let config = ScheduleConfig::new("0 0 9 * * *", "UTC").unwrap();

        assert!(config.with_window(Some(start), Some(end)).is_ok());
        assert!(config.with_window(Some(end), Some(start)).is_err());
        assert!(config.with_window(Some(start), Some(start)).is_err());
        assert!(config.with_window(None, Some(start)).is_ok());
    }

    #[test]
    fn test_max_executions_must_be_positive() {
        let config = ScheduleConfig::new("0 30 8 * * *", "UTC").unwrap();
        assert_eq!(
            config.with_max_executions(Some(1)).unwrap().max_executions(),
            Some(1)
        );
        assert!(config.with_max_executions(Some(0)).is_err());
    }

    #[test]
    fn test_transforms_leave_original_untouched() {
        let config = ScheduleConfig::new("0 0 9 * * *", "UTC").unwrap();
        let changed = config.with_cron_expression("0 0 20 * * *").unwrap();

        assert_eq!(config.cron_expression(), "0 0 9 * * *");
        assert_eq!(changed.cron_expression(), "0 0 20 * * *");
        assert_ne!(config, changed);
    }

    #[test]
    fn test_deserialize_validates() {
        let parsed: ScheduleConfig = serde_json::from_value(serde_json::json!({
            "cronExpression": "0 0 9 * * 1",
            "timezone": "UTC",
            "maxExecutions": 3,
        }))
        .unwrap();
        assert_eq!(parsed.max_executions(), Some(3));
        assert_eq!(parsed.start_date(), None);

        let invalid = [
            serde_json::json!({ "cronExpression": "", "timezone": "UTC" }),
            serde_json::json!({ "cronExpression": "0 0 9 * * *", "timezone": "" }),
            serde_json::json!({ "cronExpression": "0 0 9 * *", "timezone": "UTC" }),
            serde_json::json!({
                "cronExpression": "0 0 9 * * *",
                "timezone": "UTC",
                "startDate": "2025-01-01T00:00:00Z",
                "endDate": "2024-01-01T00:00:00Z",
            }),
            serde_json::json!({ "cronExpression": "0 0 9 * * *", "timezone": "UTC", "maxExecutions": 0 }),
        ];
        for value in invalid {
            assert!(serde_json::from_value::<ScheduleConfig>(value.clone()).is_err(), "{value}");
        }
    }

    #[test]
    fn test_is_within_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let config = ScheduleConfig::new("0 0 9 * * *", "UTC")
            .unwrap()
            .with_window(Some(start), Some(end))
            .unwrap();

        assert!(config.is_within_window(start));
        assert!(config.is_within_window(start + Duration::days(3)));
        assert!(!config.is_within_window(end));
        assert!(!config.is_within_window(start - Duration::seconds(1)));
    }
}
