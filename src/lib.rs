//! 提醒类业务实体 → 统一调度任务
//!
//! 目标、重复工作项与提醒三类实体通过各自的调度策略翻译为 [`ScheduleTask`]，
//! 由外部执行引擎按 CRON 表达式触发。

pub mod common;
pub mod sync;

pub use common::{bootstrap, init_logging, load_config, StartupConfig};
pub use sync::{ScheduleSyncService, SyncOutcome, SyncReport};

pub use schedule_core::{AppConfig, CronBuilder, CronScheduler};
pub use schedule_domain::{
    DomainEvent, ExecutionInfo, ExecutionStatus, RetryPolicy, ScheduleConfig, ScheduleExecutionEngine,
    ScheduleStrategyInput, ScheduleStrategyOutput, ScheduleTask, ScheduleTaskEvent, ScheduleTaskRecord,
    ScheduleTaskRepository, SourceEntity, SourceModule, TaskMetadata, TaskPriority,
};
pub use schedule_errors::{ErrorSeverity, ScheduleError, ScheduleResult};
pub use schedule_strategies::{ScheduleStrategy, ScheduleStrategyFactory, ScheduleTaskFactory, StrategySettings};

/// 各子crate的完整API
pub mod domain {
    pub use schedule_domain::*;
}
