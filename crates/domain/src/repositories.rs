//! 领域仓储抽象
//!
//! 定义数据访问的抽象接口，遵循依赖倒置原则

use async_trait::async_trait;
use uuid::Uuid;

use schedule_errors::ScheduleResult;

use crate::entities::{ScheduleTask, SourceModule};

/// 调度任务仓储抽象
///
/// 实现需保证每个 (source_module, source_entity_id) 至多一个任务：
/// 保存同一来源的不同 uuid 任务时返回 `InvalidScheduleConfig`。
#[async_trait]
pub trait ScheduleTaskRepository: Send + Sync {
    /// 新建或覆盖
    async fn save(&self, task: &ScheduleTask) -> ScheduleResult<()>;
    async fn find_by_uuid(&self, task_uuid: Uuid) -> ScheduleResult<Option<ScheduleTask>>;
    async fn find_by_source(
        &self,
        source_module: SourceModule,
        source_entity_id: &str,
    ) -> ScheduleResult<Option<ScheduleTask>>;
    async fn find_by_account(&self, account_uuid: &str) -> ScheduleResult<Vec<ScheduleTask>>;
    async fn delete(&self, task_uuid: Uuid) -> ScheduleResult<bool>;
}
