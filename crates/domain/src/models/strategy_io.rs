use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::SourceModule;
use crate::sources::SourceEntity;
use crate::value_objects::{ScheduleConfig, TaskMetadata};

/// 策略输入：账户、来源标识与实体快照
///
/// `evaluated_at` 是所有与当前时间相关的推导所使用的"现在"，
/// 相同输入多次调用策略得到等值输出。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStrategyInput {
    pub account_uuid: String,
    pub source_module: SourceModule,
    pub source_entity_id: String,
    pub source_entity: SourceEntity,
    /// 覆盖默认时区
    pub timezone: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl ScheduleStrategyInput {
    pub fn new<S: Into<String>>(account_uuid: S, source_entity: SourceEntity) -> Self {
        Self {
            account_uuid: account_uuid.into(),
            source_module: source_entity.source_module(),
            source_entity_id: source_entity.entity_id().to_string(),
            source_entity,
            timezone: None,
            evaluated_at: Utc::now(),
        }
    }

    pub fn at(mut self, evaluated_at: DateTime<Utc>) -> Self {
        self.evaluated_at = evaluated_at;
        self
    }

    pub fn with_timezone<S: Into<String>>(mut self, timezone: S) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// 覆盖来源模块标识（来源模块与快照类型不一致时由策略判定为不符合条件）
    pub fn with_source_module(mut self, source_module: SourceModule) -> Self {
        self.source_module = source_module;
        self
    }

    pub fn snapshot_json(&self) -> Value {
        serde_json::to_value(&self.source_entity).unwrap_or(Value::Null)
    }
}

/// 策略输出，不持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleStrategyOutput {
    pub name: String,
    pub description: Option<String>,
    pub schedule_config: ScheduleConfig,
    pub metadata: TaskMetadata,
    pub enabled: bool,
}
