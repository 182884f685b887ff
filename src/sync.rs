//! 来源实体变更 → 调度任务同步
//!
//! 应用层在实体创建、更新、删除时调用：工厂派生任务，仓储持久化，执行引擎重新装载。

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};
use uuid::Uuid;

use schedule_domain::{
    DomainEvent, ScheduleExecutionEngine, ScheduleStrategyInput, ScheduleTask, ScheduleTaskRepository, SourceModule,
};
use schedule_errors::{ScheduleError, ScheduleResult};
use schedule_strategies::ScheduleTaskFactory;

/// 单个实体同步的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created(Uuid),
    Updated(Uuid),
    Removed(Uuid),
    /// 实体无需调度且不存在任务
    Skipped,
}

/// 批量同步统计
#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub skipped: usize,
    /// 失败的来源实体及原因
    pub failed: Vec<(String, ScheduleError)>,
    pub engine_failures: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Created(_) => self.created += 1,
            SyncOutcome::Updated(_) => self.updated += 1,
            SyncOutcome::Removed(_) => self.removed += 1,
            SyncOutcome::Skipped => self.skipped += 1,
        }
    }
}

/// 持久化完成后需要通知执行引擎的变更
enum EngineNotification {
    Upsert(ScheduleTask),
    Remove(Uuid),
}

pub struct ScheduleSyncService {
    factory: Arc<ScheduleTaskFactory>,
    repository: Arc<dyn ScheduleTaskRepository>,
    engine: Arc<dyn ScheduleExecutionEngine>,
}

impl ScheduleSyncService {
    pub fn new(
        factory: Arc<ScheduleTaskFactory>,
        repository: Arc<dyn ScheduleTaskRepository>,
        engine: Arc<dyn ScheduleExecutionEngine>,
    ) -> Self {
        Self {
            factory,
            repository,
            engine,
        }
    }

    /// 实体创建或更新
    pub async fn on_entity_changed(&self, input: &ScheduleStrategyInput) -> ScheduleResult<SyncOutcome> {
        let (outcome, notification) = self.apply_change(input).await?;
        if let Some(notification) = notification {
            self.notify_engine(notification).await?;
        }
        Ok(outcome)
    }

    /// 实体删除
    pub async fn on_entity_deleted(
        &self,
        source_module: SourceModule,
        source_entity_id: &str,
    ) -> ScheduleResult<SyncOutcome> {
        let Some(task) = self
            .repository
            .find_by_source(source_module, source_entity_id)
            .await?
        else {
            debug!(source_module = %source_module, source_entity_id, "来源实体没有调度任务");
            return Ok(SyncOutcome::Skipped);
        };

        let task_uuid = self.remove(task, "来源实体已删除").await?;
        self.notify_engine(EngineNotification::Remove(task_uuid)).await?;
        Ok(SyncOutcome::Removed(task_uuid))
    }

    /// 批量同步：逐个持久化，单个失败不影响其它实体，执行引擎通知并发进行
    pub async fn sync_batch(&self, inputs: &[ScheduleStrategyInput]) -> SyncReport {
        let mut report = SyncReport::default();
        let mut notifications = Vec::new();

        for input in inputs {
            match self.apply_change(input).await {
                Ok((outcome, notification)) => {
                    report.record(outcome);
                    notifications.extend(notification);
                }
                Err(err) => {
                    warn!(
                        source_module = %input.source_module,
                        source_entity_id = %input.source_entity_id,
                        code = err.code(),
                        error = %err,
                        "同步调度任务失败"
                    );
                    report.failed.push((input.source_entity_id.clone(), err));
                }
            }
        }

        let results = join_all(
            notifications
                .into_iter()
                .map(|notification| self.notify_engine(notification)),
        )
        .await;
        for err in results.into_iter().filter_map(Result::err) {
            warn!(code = err.code(), error = %err, "通知执行引擎失败");
            report.engine_failures += 1;
        }

        info!(
            created = report.created,
            updated = report.updated,
            removed = report.removed,
            skipped = report.skipped,
            failed = report.failed.len(),
            "批量同步完成"
        );
        report
    }

    pub async fn pause(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        let mut task = self.load(task_uuid).await?;
        if task.pause() {
            self.persist(&mut task).await?;
        }
        self.engine.pause_task(task_uuid).await
    }

    pub async fn resume(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        let mut task = self.load(task_uuid).await?;
        if task.resume() {
            self.persist(&mut task).await?;
        }
        self.engine.resume_task(task_uuid).await
    }

    /// 忽略调度计划立即执行
    pub async fn run_now(&self, task_uuid: Uuid) -> ScheduleResult<()> {
        self.load(task_uuid).await?;
        self.engine.run_task(task_uuid).await
    }

    async fn apply_change(
        &self,
        input: &ScheduleStrategyInput,
    ) -> ScheduleResult<(SyncOutcome, Option<EngineNotification>)> {
        let existing = self
            .repository
            .find_by_source(input.source_module, &input.source_entity_id)
            .await?;

        match existing {
            None => match self.factory.create_from_source_entity(input) {
                Ok(mut task) => {
                    self.persist(&mut task).await?;
                    Ok((SyncOutcome::Created(task.uuid()), Some(EngineNotification::Upsert(task))))
                }
                Err(err) if err.is_expected() => {
                    debug!(source_entity_id = %input.source_entity_id, reason = %err, "实体无需调度");
                    Ok((SyncOutcome::Skipped, None))
                }
                Err(err) => Err(err),
            },
            Some(mut task) => match self.factory.update_from_source_entity(&mut task, input) {
                Ok(()) => {
                    self.persist(&mut task).await?;
                    Ok((SyncOutcome::Updated(task.uuid()), Some(EngineNotification::Upsert(task))))
                }
                Err(err) if err.is_expected() => {
                    let task_uuid = self.remove(task, "来源实体不再需要调度").await?;
                    Ok((SyncOutcome::Removed(task_uuid), Some(EngineNotification::Remove(task_uuid))))
                }
                Err(err) => Err(err),
            },
        }
    }

    async fn load(&self, task_uuid: Uuid) -> ScheduleResult<ScheduleTask> {
        self.repository
            .find_by_uuid(task_uuid)
            .await?
            .ok_or_else(|| ScheduleError::task_not_found(task_uuid.to_string()))
    }

    /// 保存任务并取出已随任务写入 outbox 的事件
    async fn persist(&self, task: &mut ScheduleTask) -> ScheduleResult<()> {
        self.repository.save(task).await?;
        for event in task.take_events() {
            debug!(
                event_id = %event.event_id(),
                event_type = event.event_type(),
                task_uuid = %event.aggregate_id(),
                "领域事件已提交"
            );
        }
        Ok(())
    }

    async fn remove(&self, mut task: ScheduleTask, reason: &str) -> ScheduleResult<Uuid> {
        let task_uuid = task.uuid();
        task.mark_removed(reason);

        let result = match self.persist(&mut task).await {
            Ok(()) => self.repository.delete(task_uuid).await,
            Err(err) => Err(err),
        };
        let deleted = result.map_err(|err| ScheduleError::task_deletion(task_uuid.to_string(), err))?;

        info!(task_uuid = %task_uuid, deleted, reason, "删除调度任务");
        Ok(task_uuid)
    }

    async fn notify_engine(&self, notification: EngineNotification) -> ScheduleResult<()> {
        match notification {
            EngineNotification::Upsert(task) => {
                let task_uuid = task.uuid();
                let enabled = task.is_enabled();
                self.engine.add_task(task).await?;
                if !enabled {
                    self.engine.pause_task(task_uuid).await?;
                }
                Ok(())
            }
            EngineNotification::Remove(task_uuid) => match self.engine.remove_task(task_uuid).await {
                Err(ScheduleError::TaskNotFound { .. }) => {
                    debug!(task_uuid = %task_uuid, "执行引擎中不存在该任务");
                    Ok(())
                }
                result => result,
            },
        }
    }
}
