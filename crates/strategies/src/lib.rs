//! 调度策略
//!
//! 每个来源模块一个策略，把实体快照翻译为 CRON 表达式与任务元数据；
//! `ScheduleStrategyFactory` 按来源模块注册策略，`ScheduleTaskFactory` 负责编排与错误转换。

pub mod objective;
pub mod priority;
pub mod registry;
pub mod reminder;
pub mod strategy;
pub mod task_factory;
pub mod work_item;

pub use objective::ObjectiveScheduleStrategy;
pub use registry::ScheduleStrategyFactory;
pub use reminder::ReminderScheduleStrategy;
pub use strategy::{ScheduleStrategy, StrategySettings};
pub use task_factory::ScheduleTaskFactory;
pub use work_item::WorkItemScheduleStrategy;
