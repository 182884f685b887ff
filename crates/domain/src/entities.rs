use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use schedule_errors::{ScheduleError, ScheduleResult};

use crate::events::ScheduleTaskEvent;
use crate::value_objects::{ExecutionInfo, ExecutionStatus, RetryPolicy, ScheduleConfig, TaskMetadata};

/// 调度任务的来源业务模块
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceModule {
    #[serde(rename = "OBJECTIVE")]
    Objective,
    #[serde(rename = "WORK_ITEM")]
    WorkItem,
    #[serde(rename = "REMINDER")]
    Reminder,
}

impl SourceModule {
    pub const ALL: [SourceModule; 3] = [SourceModule::Objective, SourceModule::WorkItem, SourceModule::Reminder];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceModule::Objective => "OBJECTIVE",
            SourceModule::WorkItem => "WORK_ITEM",
            SourceModule::Reminder => "REMINDER",
        }
    }
}

impl fmt::Display for SourceModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceModule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OBJECTIVE" => Ok(SourceModule::Objective),
            "WORK_ITEM" => Ok(SourceModule::WorkItem),
            "REMINDER" => Ok(SourceModule::Reminder),
            _ => Err(ScheduleError::invalid_config(
                "sourceModule",
                format!("未知的来源模块: {s}"),
            )),
        }
    }
}

/// 创建调度任务所需的参数
#[derive(Debug, Clone)]
pub struct NewScheduleTask {
    pub account_uuid: String,
    pub name: String,
    pub description: Option<String>,
    pub source_module: SourceModule,
    pub source_entity_id: String,
    pub schedule: ScheduleConfig,
    pub metadata: TaskMetadata,
    pub retry_policy: RetryPolicy,
    pub enabled: bool,
}

/// 调度任务聚合根
///
/// 每个 (source_module, source_entity_id) 至多对应一个有效任务，唯一性由仓储保证。
/// 状态变更会记录到 `pending_events`，持久化成功后通过 [`ScheduleTask::take_events`] 取出发布。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ScheduleTaskData")]
pub struct ScheduleTask {
    pub(crate) uuid: Uuid,
    pub(crate) account_uuid: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) source_module: SourceModule,
    pub(crate) source_entity_id: String,
    pub(crate) schedule: ScheduleConfig,
    pub(crate) execution_info: ExecutionInfo,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) metadata: TaskMetadata,
    pub(crate) enabled: bool,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) pending_events: Vec<ScheduleTaskEvent>,
}

/// 反序列化的中间形态；值对象各自校验，聚合再校验标识字段
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleTaskData {
    uuid: Uuid,
    account_uuid: String,
    name: String,
    description: Option<String>,
    source_module: SourceModule,
    source_entity_id: String,
    schedule: ScheduleConfig,
    #[serde(default)]
    execution_info: ExecutionInfo,
    retry_policy: RetryPolicy,
    metadata: TaskMetadata,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ScheduleTaskData> for ScheduleTask {
    type Error = ScheduleError;

    fn try_from(data: ScheduleTaskData) -> Result<Self, Self::Error> {
        validate_identity(&data.account_uuid, &data.source_entity_id, &data.name)?;
        Ok(Self {
            uuid: data.uuid,
            account_uuid: data.account_uuid,
            name: data.name,
            description: data.description,
            source_module: data.source_module,
            source_entity_id: data.source_entity_id,
            schedule: data.schedule,
            execution_info: data.execution_info,
            retry_policy: data.retry_policy,
            metadata: data.metadata,
            enabled: data.enabled,
            created_at: data.created_at,
            updated_at: data.updated_at,
            pending_events: Vec::new(),
        })
    }
}

pub(crate) fn validate_identity(account_uuid: &str, source_entity_id: &str, name: &str) -> ScheduleResult<()> {
    if account_uuid.trim().is_empty() {
        return Err(ScheduleError::invalid_config("accountUuid", "账户标识不能为空"));
    }
    if source_entity_id.trim().is_empty() {
        return Err(ScheduleError::invalid_config("sourceEntityId", "来源实体标识不能为空"));
    }
    if name.trim().is_empty() {
        return Err(ScheduleError::invalid_config("name", "任务名称不能为空"));
    }
    Ok(())
}

impl ScheduleTask {
    pub fn create(params: NewScheduleTask) -> ScheduleResult<Self> {
        validate_identity(&params.account_uuid, &params.source_entity_id, &params.name)?;
        params.retry_policy.validate()?;

        let now = Utc::now();
        let mut task = Self {
            uuid: Uuid::new_v4(),
            account_uuid: params.account_uuid,
            name: params.name,
            description: params.description,
            source_module: params.source_module,
            source_entity_id: params.source_entity_id,
            schedule: params.schedule,
            execution_info: ExecutionInfo::default(),
            retry_policy: params.retry_policy,
            metadata: params.metadata,
            enabled: params.enabled,
            created_at: now,
            updated_at: now,
            pending_events: Vec::new(),
        };

        task.record(ScheduleTaskEvent::TaskCreated {
            id: Uuid::new_v4(),
            task_uuid: task.uuid,
            account_uuid: task.account_uuid.clone(),
            source_module: task.source_module,
            source_entity_id: task.source_entity_id.clone(),
            cron_expression: task.schedule.cron_expression().to_string(),
            occurred_at: now,
        });

        Ok(task)
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn account_uuid(&self) -> &str {
        &self.account_uuid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn source_module(&self) -> SourceModule {
        self.source_module
    }

    pub fn source_entity_id(&self) -> &str {
        &self.source_entity_id
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub fn execution_info(&self) -> &ExecutionInfo {
        &self.execution_info
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn metadata(&self) -> &TaskMetadata {
        &self.metadata
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 替换调度配置，返回是否发生变化
    pub fn update_schedule(&mut self, schedule: ScheduleConfig) -> bool {
        if self.schedule == schedule {
            return false;
        }

        let previous_expression = self.schedule.cron_expression().to_string();
        self.schedule = schedule;
        let now = self.touch();
        self.record(ScheduleTaskEvent::ScheduleUpdated {
            id: Uuid::new_v4(),
            task_uuid: self.uuid,
            previous_expression,
            cron_expression: self.schedule.cron_expression().to_string(),
            occurred_at: now,
        });
        true
    }

    pub fn update_metadata(&mut self, metadata: TaskMetadata) -> bool {
        if self.metadata == metadata {
            return false;
        }

        self.metadata = metadata;
        let now = self.touch();
        self.record(ScheduleTaskEvent::MetadataUpdated {
            id: Uuid::new_v4(),
            task_uuid: self.uuid,
            priority: self.metadata.priority(),
            occurred_at: now,
        });
        true
    }

    pub fn update_description(&mut self, description: Option<String>) -> bool {
        if self.description == description {
            return false;
        }
        self.description = description;
        self.touch();
        true
    }

    pub fn rename<S: Into<String>>(&mut self, name: S) -> ScheduleResult<bool> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ScheduleError::invalid_config("name", "任务名称不能为空"));
        }
        if self.name == name {
            return Ok(false);
        }
        self.name = name;
        self.touch();
        Ok(true)
    }

    /// 暂停任务，已暂停时返回 false
    pub fn pause(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.enabled = false;
        let now = self.touch();
        self.record(ScheduleTaskEvent::TaskPaused {
            id: Uuid::new_v4(),
            task_uuid: self.uuid,
            occurred_at: now,
        });
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.enabled = true;
        let now = self.touch();
        self.record(ScheduleTaskEvent::TaskResumed {
            id: Uuid::new_v4(),
            task_uuid: self.uuid,
            occurred_at: now,
        });
        true
    }

    /// 记录一次执行结果，执行历史整体替换
    pub fn record_execution(
        &mut self,
        status: ExecutionStatus,
        duration_ms: u64,
        executed_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) {
        self.execution_info = self
            .execution_info
            .after_execution(status, duration_ms, executed_at, next_run_at);
        let now = self.touch();
        self.record(ScheduleTaskEvent::TaskExecuted {
            id: Uuid::new_v4(),
            task_uuid: self.uuid,
            status,
            execution_count: self.execution_info.execution_count,
            consecutive_failures: self.execution_info.consecutive_failures,
            occurred_at: now,
        });
    }

    pub fn schedule_next_run(&mut self, next_run_at: Option<DateTime<Utc>>) {
        self.execution_info = self.execution_info.with_next_run_at(next_run_at);
    }

    pub fn has_reached_execution_limit(&self) -> bool {
        self.schedule
            .max_executions()
            .map_or(false, |max| self.execution_info.execution_count >= u64::from(max))
    }

    /// 在给定时刻是否应当被执行引擎触发
    pub fn is_due_eligible(&self, at: DateTime<Utc>) -> bool {
        self.enabled && self.schedule.is_within_window(at) && !self.has_reached_execution_limit()
    }

    /// 逻辑删除：停用任务并记录删除事件，物理删除由仓储完成
    pub fn mark_removed<S: Into<String>>(&mut self, reason: S) {
        self.enabled = false;
        let now = self.touch();
        self.record(ScheduleTaskEvent::TaskRemoved {
            id: Uuid::new_v4(),
            task_uuid: self.uuid,
            reason: reason.into(),
            occurred_at: now,
        });
    }

    pub fn pending_events(&self) -> &[ScheduleTaskEvent] {
        &self.pending_events
    }

    pub fn take_events(&mut self) -> Vec<ScheduleTaskEvent> {
        std::mem::take(&mut self.pending_events)
    }

    fn touch(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        self.updated_at = now;
        now
    }

    fn record(&mut self, event: ScheduleTaskEvent) {
        self.pending_events.push(event);
    }
}
