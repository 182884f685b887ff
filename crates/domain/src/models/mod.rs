pub mod strategy_io;
pub mod task_record;

pub use strategy_io::{ScheduleStrategyInput, ScheduleStrategyOutput};
pub use task_record::ScheduleTaskRecord;
