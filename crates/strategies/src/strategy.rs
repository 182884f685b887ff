use serde_json::{json, Value};

use schedule_core::AppConfig;
use schedule_domain::{
    ScheduleStrategyInput, ScheduleStrategyOutput, ScheduleTask, SourceEntity, SourceModule, TaskMetadata,
    TaskPriority,
};
use schedule_errors::{ScheduleError, ScheduleResult};

/// 单个来源模块的调度策略
///
/// 策略是纯函数：不做 I/O，不读取系统时间，所有时间相关推导使用 `input.evaluated_at`。
pub trait ScheduleStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// 策略负责的来源模块
    fn source_module(&self) -> SourceModule;

    fn supports(&self, source_module: SourceModule) -> bool {
        self.source_module() == source_module
    }

    /// 实体当前是否需要调度任务
    fn should_create_schedule(&self, entity: &SourceEntity) -> bool;

    /// 派生调度配置与元数据；实体不符合条件时返回 `EntityNoScheduleRequired`
    fn create_schedule(&self, input: &ScheduleStrategyInput) -> ScheduleResult<ScheduleStrategyOutput>;

    /// 默认完整重算
    fn update_schedule(
        &self,
        _existing: &ScheduleTask,
        input: &ScheduleStrategyInput,
    ) -> ScheduleResult<ScheduleStrategyOutput> {
        self.create_schedule(input)
    }
}

/// 策略共享的默认值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySettings {
    pub default_timezone: String,
    pub default_timeout_ms: Option<u64>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for StrategySettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            default_timezone: config.scheduling.default_timezone.clone(),
            default_timeout_ms: Some(config.scheduling.default_task_timeout_ms),
        }
    }
}

impl StrategySettings {
    pub fn timezone_for(&self, input: &ScheduleStrategyInput) -> String {
        input
            .timezone
            .clone()
            .filter(|tz| !tz.trim().is_empty())
            .unwrap_or_else(|| self.default_timezone.clone())
    }

    /// 所有策略共用的元数据骨架：优先级、超时、来源标签与关联 payload
    pub(crate) fn base_metadata(
        &self,
        input: &ScheduleStrategyInput,
        priority: TaskPriority,
    ) -> ScheduleResult<TaskMetadata> {
        TaskMetadata::new(priority)
            .with_timeout(self.default_timeout_ms)
            .add_tag(module_tag(input.source_module))
            .with_payload_entry("sourceModule", json!(input.source_module.as_str()))?
            .with_payload_entry("sourceEntityId", json!(input.source_entity_id))?
            .with_payload_entry("accountUuid", json!(input.account_uuid))
    }
}

pub(crate) fn module_tag(source_module: SourceModule) -> &'static str {
    match source_module {
        SourceModule::Objective => "objective",
        SourceModule::WorkItem => "work-item",
        SourceModule::Reminder => "reminder",
    }
}

pub(crate) fn ineligible<R: Into<String>>(input: &ScheduleStrategyInput, reason: R) -> ScheduleError {
    ScheduleError::no_schedule_required(input.source_module.as_str(), input.source_entity_id.clone(), reason)
}

/// 依次写入多个 payload 键
pub(crate) fn with_entries(
    metadata: TaskMetadata,
    entries: impl IntoIterator<Item = (&'static str, Value)>,
) -> ScheduleResult<TaskMetadata> {
    entries
        .into_iter()
        .try_fold(metadata, |metadata, (key, value)| metadata.with_payload_entry(key, value))
}
