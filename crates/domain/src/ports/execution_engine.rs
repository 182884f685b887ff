use async_trait::async_trait;
use uuid::Uuid;

use schedule_errors::ScheduleResult;

use crate::entities::ScheduleTask;

/// 执行引擎生命周期契约，由外部引擎实现
///
/// 引擎读取 `schedule.cron_expression` 与 `schedule.timezone` 计算真实触发时间，
/// 并通过 `metadata.payload` 还原业务上下文。
///
/// 不同任务的调用可以并发；同一任务的并发调用不保证顺序，实现可自行按任务串行化。
/// 所有操作的效果仅在返回的 future 完成后可见。
#[async_trait]
pub trait ScheduleExecutionEngine: Send + Sync {
    /// 启动引擎并装载初始任务
    async fn start(&self, initial_tasks: Vec<ScheduleTask>) -> ScheduleResult<()>;

    async fn stop(&self) -> ScheduleResult<()>;

    /// 加入任务；已存在同 uuid 的任务时替换
    async fn add_task(&self, task: ScheduleTask) -> ScheduleResult<()>;

    async fn remove_task(&self, task_uuid: Uuid) -> ScheduleResult<()>;

    async fn pause_task(&self, task_uuid: Uuid) -> ScheduleResult<()>;

    async fn resume_task(&self, task_uuid: Uuid) -> ScheduleResult<()>;

    /// 忽略调度计划立即执行一次
    async fn run_task(&self, task_uuid: Uuid) -> ScheduleResult<()>;

    async fn get_active_tasks(&self) -> ScheduleResult<Vec<ScheduleTask>>;

    async fn is_engine_running(&self) -> bool;
}
