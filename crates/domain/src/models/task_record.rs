//! 持久化形态
//!
//! 扁平记录：日期为 ISO-8601 字符串，payload 为 JSON 文本，tags 为 JSON 数组文本。
//! 与 [`ScheduleTask`] 之间双向无损转换。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use schedule_errors::{ScheduleError, ScheduleResult};

use crate::entities::{validate_identity, ScheduleTask, SourceModule};
use crate::value_objects::{ExecutionInfo, ExecutionStatus, RetryPolicy, ScheduleConfig, TaskMetadata, TaskPriority};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTaskRecord {
    pub uuid: String,
    pub account_uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub source_module: String,
    pub source_entity_id: String,
    pub cron_expression: String,
    pub timezone: String,
    pub schedule_start_date: Option<String>,
    pub schedule_end_date: Option<String>,
    pub max_executions: Option<u32>,
    pub next_run_at: Option<String>,
    pub last_run_at: Option<String>,
    pub execution_count: u64,
    pub last_execution_status: Option<String>,
    pub last_execution_duration: Option<u64>,
    pub consecutive_failures: u32,
    pub priority: String,
    pub tags: String,
    pub timeout: Option<u64>,
    pub payload: String,
    pub retry_policy: String,
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

fn format_date(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

fn format_optional_date(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(format_date)
}

fn parse_date(field: &str, raw: &str) -> ScheduleResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| ScheduleError::Serialization(format!("{field} 日期格式错误 '{raw}': {e}")))
}

fn parse_optional_date(field: &str, raw: Option<&str>) -> ScheduleResult<Option<DateTime<Utc>>> {
    raw.map(|raw| parse_date(field, raw)).transpose()
}

impl From<&ScheduleTask> for ScheduleTaskRecord {
    fn from(task: &ScheduleTask) -> Self {
        let schedule = task.schedule();
        let execution = task.execution_info();
        let metadata = task.metadata();

        Self {
            uuid: task.uuid().to_string(),
            account_uuid: task.account_uuid().to_string(),
            name: task.name().to_string(),
            description: task.description().map(str::to_string),
            source_module: task.source_module().as_str().to_string(),
            source_entity_id: task.source_entity_id().to_string(),
            cron_expression: schedule.cron_expression().to_string(),
            timezone: schedule.timezone().to_string(),
            schedule_start_date: format_optional_date(schedule.start_date()),
            schedule_end_date: format_optional_date(schedule.end_date()),
            max_executions: schedule.max_executions(),
            next_run_at: format_optional_date(execution.next_run_at),
            last_run_at: format_optional_date(execution.last_run_at),
            execution_count: execution.execution_count,
            last_execution_status: execution.last_execution_status.map(|s| s.as_str().to_string()),
            last_execution_duration: execution.last_execution_duration,
            consecutive_failures: execution.consecutive_failures,
            priority: metadata.priority().as_str().to_string(),
            tags: Value::from(metadata.tags().to_vec()).to_string(),
            timeout: metadata.timeout(),
            payload: Value::Object(metadata.payload().clone().into_iter().collect()).to_string(),
            retry_policy: serde_json::to_string(task.retry_policy()).unwrap_or_else(|_| "{}".to_string()),
            enabled: task.is_enabled(),
            created_at: format_date(task.created_at()),
            updated_at: format_date(task.updated_at()),
        }
    }
}

impl TryFrom<ScheduleTaskRecord> for ScheduleTask {
    type Error = ScheduleError;

    fn try_from(record: ScheduleTaskRecord) -> Result<Self, Self::Error> {
        let uuid = Uuid::parse_str(&record.uuid)
            .map_err(|e| ScheduleError::Serialization(format!("uuid 格式错误 '{}': {e}", record.uuid)))?;

        let schedule = ScheduleConfig::new(record.cron_expression, record.timezone)?
            .with_window(
                parse_optional_date("scheduleStartDate", record.schedule_start_date.as_deref())?,
                parse_optional_date("scheduleEndDate", record.schedule_end_date.as_deref())?,
            )?
            .with_max_executions(record.max_executions)?;

        let execution_info = ExecutionInfo {
            next_run_at: parse_optional_date("nextRunAt", record.next_run_at.as_deref())?,
            last_run_at: parse_optional_date("lastRunAt", record.last_run_at.as_deref())?,
            execution_count: record.execution_count,
            last_execution_status: record
                .last_execution_status
                .as_deref()
                .map(str::parse::<ExecutionStatus>)
                .transpose()?,
            last_execution_duration: record.last_execution_duration,
            consecutive_failures: record.consecutive_failures,
        };

        let tags: Vec<String> = serde_json::from_str(&record.tags)?;
        let payload: BTreeMap<String, Value> = serde_json::from_str(&record.payload)?;
        let metadata = TaskMetadata::new(record.priority.parse::<TaskPriority>()?)
            .with_tags(tags)
            .with_timeout(record.timeout)
            .with_payload(payload)?;

        let retry_policy: RetryPolicy = serde_json::from_str(&record.retry_policy)?;
        validate_identity(&record.account_uuid, &record.source_entity_id, &record.name)?;

        Ok(ScheduleTask {
            uuid,
            account_uuid: record.account_uuid,
            name: record.name,
            description: record.description,
            source_module: record.source_module.parse::<SourceModule>()?,
            source_entity_id: record.source_entity_id,
            schedule,
            execution_info,
            retry_policy,
            metadata,
            enabled: record.enabled,
            created_at: parse_date("createdAt", &record.created_at)?,
            updated_at: parse_date("updatedAt", &record.updated_at)?,
            pending_events: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use crate::entities::NewScheduleTask;

    fn sample_task() -> ScheduleTask {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let schedule = ScheduleConfig::new("0 0 9 * * 1", "Asia/Shanghai")
            .unwrap()
            .with_window(Some(start), Some(start + Duration::days(90)))
            .unwrap()
            .with_max_executions(Some(12))
            .unwrap();
        let metadata = TaskMetadata::new(TaskPriority::High)
            .with_tags(["objective", "weekly"])
            .with_timeout(Some(30_000))
            .with_payload_entry("objectiveUuid", json!("g-1"))
            .unwrap();

        let mut task = ScheduleTask::create(NewScheduleTask {
            account_uuid: "acc-1".to_string(),
            name: "Ship v1".to_string(),
            description: Some("quarterly objective".to_string()),
            source_module: SourceModule::Objective,
            source_entity_id: "g-1".to_string(),
            schedule,
            metadata,
            retry_policy: RetryPolicy::default(),
            enabled: true,
        })
        .unwrap();
        task.record_execution(ExecutionStatus::Failed, 80, start, Some(start + Duration::days(7)));
        task
    }

    #[test]
    fn test_record_shape() {
        let task = sample_task();
        let record = ScheduleTaskRecord::from(&task);

        assert_eq!(record.source_module, "OBJECTIVE");
        assert_eq!(record.schedule_start_date.as_deref(), Some("2024-03-01T00:00:00+00:00"));
        assert_eq!(record.tags, r#"["objective","weekly"]"#);
        assert_eq!(record.payload, r#"{"objectiveUuid":"g-1"}"#);
        assert_eq!(record.last_execution_status.as_deref(), Some("FAILED"));
        assert_eq!(record.consecutive_failures, 1);
    }

    #[test]
    fn test_record_restores_task() {
        let task = sample_task();
        let restored = ScheduleTask::try_from(ScheduleTaskRecord::from(&task)).unwrap();

        assert_eq!(restored.uuid(), task.uuid());
        assert_eq!(restored.schedule(), task.schedule());
        assert_eq!(restored.execution_info(), task.execution_info());
        assert_eq!(restored.metadata(), task.metadata());
        assert_eq!(restored.retry_policy(), task.retry_policy());
        assert_eq!(restored.created_at(), task.created_at());
        assert!(restored.pending_events().is_empty());
    }

    #[test]
    fn test_corrupt_record_is_rejected() {
        let mut record = ScheduleTaskRecord::from(&sample_task());
        record.tags = "not json".to_string();
        let error = ScheduleTask::try_from(record).unwrap_err();
        assert_eq!(error.code(), "SERIALIZATION_ERROR");

        let mut record = ScheduleTaskRecord::from(&sample_task());
        record.source_module = "TASK".to_string();
        assert!(ScheduleTask::try_from(record).is_err());
    }
}
