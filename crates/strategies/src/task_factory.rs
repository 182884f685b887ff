use std::sync::Arc;

use tracing::{debug, error, info, warn};

use schedule_core::AppConfig;
use schedule_domain::{NewScheduleTask, RetryPolicy, ScheduleStrategyInput, ScheduleTask, SourceModule};
use schedule_errors::{ErrorSeverity, ScheduleError, ScheduleResult};

use crate::registry::ScheduleStrategyFactory;
use crate::strategy::StrategySettings;

const STEP_DERIVE_SCHEDULE: &str = "derive_schedule";
const STEP_BUILD_TASK: &str = "build_task";
const STEP_VERIFY_SOURCE: &str = "verify_source";
const STEP_APPLY_CHANGES: &str = "apply_changes";

/// 编排策略查找、资格判断与调度任务构建
pub struct ScheduleTaskFactory {
    strategies: Arc<ScheduleStrategyFactory>,
    default_retry_policy: RetryPolicy,
}

impl ScheduleTaskFactory {
    pub fn new(strategies: Arc<ScheduleStrategyFactory>, default_retry_policy: RetryPolicy) -> Self {
        Self {
            strategies,
            default_retry_policy,
        }
    }

    /// 根据应用配置构造默认策略注册表与默认重试策略
    pub fn from_config(config: &AppConfig) -> Self {
        let registry = ScheduleStrategyFactory::with_default_strategies(StrategySettings::from(config));
        Self::new(Arc::new(registry), RetryPolicy::from(&config.retry))
    }

    pub fn strategies(&self) -> &Arc<ScheduleStrategyFactory> {
        &self.strategies
    }

    pub fn supports_source_module(&self, source_module: SourceModule) -> bool {
        self.strategies.supports(source_module)
    }

    pub fn create_from_source_entity(&self, input: &ScheduleStrategyInput) -> ScheduleResult<ScheduleTask> {
        let strategy = self.strategies.get_strategy(input.source_module)?;

        if !strategy.should_create_schedule(&input.source_entity) {
            return Err(ScheduleError::no_schedule_required(
                input.source_module.as_str(),
                input.source_entity_id.clone(),
                format!("{} 判定实体当前不需要调度", strategy.name()),
            ));
        }

        let wrap = |step: &str, err: ScheduleError| -> ScheduleError {
            if err.is_expected() {
                return err;
            }
            ScheduleError::task_creation(
                input.source_module.as_str(),
                input.source_entity_id.clone(),
                step,
                input.snapshot_json(),
                err,
            )
        };

        let output = strategy
            .create_schedule(input)
            .map_err(|e| wrap(STEP_DERIVE_SCHEDULE, e))?;

        let task = ScheduleTask::create(NewScheduleTask {
            account_uuid: input.account_uuid.clone(),
            name: output.name,
            description: output.description,
            source_module: input.source_module,
            source_entity_id: input.source_entity_id.clone(),
            schedule: output.schedule_config,
            metadata: output.metadata,
            retry_policy: self.default_retry_policy.clone(),
            enabled: output.enabled,
        })
        .map_err(|e| wrap(STEP_BUILD_TASK, e))?;

        debug!(
            source_module = %input.source_module,
            source_entity_id = %input.source_entity_id,
            task_uuid = %task.uuid(),
            cron_expression = task.schedule().cron_expression(),
            "创建调度任务"
        );
        Ok(task)
    }

    /// 批量创建，单个失败只记录日志并跳过
    pub fn create_batch(&self, inputs: &[ScheduleStrategyInput]) -> Vec<ScheduleTask> {
        let mut tasks = Vec::with_capacity(inputs.len());

        for input in inputs {
            match self.create_from_source_entity(input) {
                Ok(task) => tasks.push(task),
                Err(err) => log_skipped(input, &err),
            }
        }

        info!(total = inputs.len(), created = tasks.len(), "批量创建调度任务完成");
        tasks
    }

    /// 按最新实体快照重算调度配置
    ///
    /// 实体不再符合条件时返回 `EntityNoScheduleRequired`，删除任务由调用方负责。
    pub fn update_from_source_entity(
        &self,
        task: &mut ScheduleTask,
        input: &ScheduleStrategyInput,
    ) -> ScheduleResult<()> {
        let task_uuid = task.uuid().to_string();

        if task.source_module() != input.source_module || task.source_entity_id() != input.source_entity_id {
            return Err(ScheduleError::task_update(
                task_uuid,
                STEP_VERIFY_SOURCE,
                ScheduleError::invalid_config(
                    "sourceEntityId",
                    format!(
                        "任务来源 {}/{} 与输入 {}/{} 不一致",
                        task.source_module(),
                        task.source_entity_id(),
                        input.source_module,
                        input.source_entity_id
                    ),
                ),
            ));
        }

        let strategy = self.strategies.get_strategy(input.source_module)?;

        if !strategy.should_create_schedule(&input.source_entity) {
            return Err(ScheduleError::no_schedule_required(
                input.source_module.as_str(),
                input.source_entity_id.clone(),
                format!("{} 判定实体不再需要调度", strategy.name()),
            ));
        }

        let wrap = |step: &str, err: ScheduleError| -> ScheduleError {
            if err.is_expected() {
                err
            } else {
                ScheduleError::task_update(task_uuid.clone(), step, err)
            }
        };

        let output = strategy
            .update_schedule(task, input)
            .map_err(|e| wrap(STEP_DERIVE_SCHEDULE, e))?;

        let schedule_changed = task.update_schedule(output.schedule_config);
        let metadata_changed = task.update_metadata(output.metadata);
        let description_changed = task.update_description(output.description);
        let renamed = task.rename(output.name).map_err(|e| wrap(STEP_APPLY_CHANGES, e))?;

        debug!(
            task_uuid = %task.uuid(),
            schedule_changed,
            metadata_changed,
            description_changed,
            renamed,
            "更新调度任务"
        );
        Ok(())
    }
}

fn log_skipped(input: &ScheduleStrategyInput, err: &ScheduleError) {
    let source_module = input.source_module.as_str();
    let source_entity_id = input.source_entity_id.as_str();
    if err.is_expected() {
        debug!(source_module, source_entity_id, reason = %err, "实体无需调度，跳过");
        return;
    }
    let code = err.code();
    match err.severity() {
        ErrorSeverity::Critical | ErrorSeverity::Error => {
            error!(source_module, source_entity_id, code, error = %err, "创建调度任务失败，跳过")
        }
        _ => warn!(source_module, source_entity_id, code, error = %err, "创建调度任务失败，跳过"),
    }
}
