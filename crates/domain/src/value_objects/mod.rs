//! 值对象
//!
//! 所有值对象均为不可变记录：变更通过返回新实例的转换函数完成。

pub mod execution_info;
pub mod retry_policy;
pub mod schedule_config;
pub mod task_metadata;

pub use execution_info::{ExecutionInfo, ExecutionStatus};
pub use retry_policy::RetryPolicy;
pub use schedule_config::ScheduleConfig;
pub use task_metadata::{TaskMetadata, TaskPriority, MAX_PAYLOAD_KEYS};
