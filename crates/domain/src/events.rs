//! 领域事件
//!
//! 聚合在状态变更时记录事件（outbox），由持久化层在提交成功后取出并发布。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::SourceModule;
use crate::value_objects::{ExecutionStatus, TaskPriority};

/// 领域事件基础trait
pub trait DomainEvent: Send + Sync {
    fn event_id(&self) -> Uuid;
    fn event_type(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn aggregate_id(&self) -> String;
}

/// 调度任务相关事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScheduleTaskEvent {
    TaskCreated {
        id: Uuid,
        task_uuid: Uuid,
        account_uuid: String,
        source_module: SourceModule,
        source_entity_id: String,
        cron_expression: String,
        occurred_at: DateTime<Utc>,
    },
    ScheduleUpdated {
        id: Uuid,
        task_uuid: Uuid,
        previous_expression: String,
        cron_expression: String,
        occurred_at: DateTime<Utc>,
    },
    MetadataUpdated {
        id: Uuid,
        task_uuid: Uuid,
        priority: TaskPriority,
        occurred_at: DateTime<Utc>,
    },
    TaskPaused {
        id: Uuid,
        task_uuid: Uuid,
        occurred_at: DateTime<Utc>,
    },
    TaskResumed {
        id: Uuid,
        task_uuid: Uuid,
        occurred_at: DateTime<Utc>,
    },
    TaskExecuted {
        id: Uuid,
        task_uuid: Uuid,
        status: ExecutionStatus,
        execution_count: u64,
        consecutive_failures: u32,
        occurred_at: DateTime<Utc>,
    },
    TaskRemoved {
        id: Uuid,
        task_uuid: Uuid,
        reason: String,
        occurred_at: DateTime<Utc>,
    },
}

impl ScheduleTaskEvent {
    pub fn task_uuid(&self) -> Uuid {
        match self {
            ScheduleTaskEvent::TaskCreated { task_uuid, .. } => *task_uuid,
            ScheduleTaskEvent::ScheduleUpdated { task_uuid, .. } => *task_uuid,
            ScheduleTaskEvent::MetadataUpdated { task_uuid, .. } => *task_uuid,
            ScheduleTaskEvent::TaskPaused { task_uuid, .. } => *task_uuid,
            ScheduleTaskEvent::TaskResumed { task_uuid, .. } => *task_uuid,
            ScheduleTaskEvent::TaskExecuted { task_uuid, .. } => *task_uuid,
            ScheduleTaskEvent::TaskRemoved { task_uuid, .. } => *task_uuid,
        }
    }
}

impl DomainEvent for ScheduleTaskEvent {
    fn event_id(&self) -> Uuid {
        match self {
            ScheduleTaskEvent::TaskCreated { id, .. } => *id,
            ScheduleTaskEvent::ScheduleUpdated { id, .. } => *id,
            ScheduleTaskEvent::MetadataUpdated { id, .. } => *id,
            ScheduleTaskEvent::TaskPaused { id, .. } => *id,
            ScheduleTaskEvent::TaskResumed { id, .. } => *id,
            ScheduleTaskEvent::TaskExecuted { id, .. } => *id,
            ScheduleTaskEvent::TaskRemoved { id, .. } => *id,
        }
    }

    fn event_type(&self) -> &str {
        match self {
            ScheduleTaskEvent::TaskCreated { .. } => "TaskCreated",
            ScheduleTaskEvent::ScheduleUpdated { .. } => "ScheduleUpdated",
            ScheduleTaskEvent::MetadataUpdated { .. } => "MetadataUpdated",
            ScheduleTaskEvent::TaskPaused { .. } => "TaskPaused",
            ScheduleTaskEvent::TaskResumed { .. } => "TaskResumed",
            ScheduleTaskEvent::TaskExecuted { .. } => "TaskExecuted",
            ScheduleTaskEvent::TaskRemoved { .. } => "TaskRemoved",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ScheduleTaskEvent::TaskCreated { occurred_at, .. } => *occurred_at,
            ScheduleTaskEvent::ScheduleUpdated { occurred_at, .. } => *occurred_at,
            ScheduleTaskEvent::MetadataUpdated { occurred_at, .. } => *occurred_at,
            ScheduleTaskEvent::TaskPaused { occurred_at, .. } => *occurred_at,
            ScheduleTaskEvent::TaskResumed { occurred_at, .. } => *occurred_at,
            ScheduleTaskEvent::TaskExecuted { occurred_at, .. } => *occurred_at,
            ScheduleTaskEvent::TaskRemoved { occurred_at, .. } => *occurred_at,
        }
    }

    fn aggregate_id(&self) -> String {
        self.task_uuid().to_string()
    }
}
