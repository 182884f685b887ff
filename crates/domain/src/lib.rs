//! 调度领域模型
//!
//! 值对象、调度任务聚合、领域事件、来源实体快照以及对外端口。

pub mod entities;
pub mod events;
pub mod models;
pub mod ports;
pub mod repositories;
pub mod sources;
pub mod value_objects;

pub use entities::*;
pub use events::*;
pub use models::*;
pub use ports::*;
pub use repositories::*;
pub use schedule_errors::{ScheduleError, ScheduleResult};
pub use sources::*;
pub use value_objects::*;
