pub mod execution_engine;

pub use execution_engine::ScheduleExecutionEngine;
