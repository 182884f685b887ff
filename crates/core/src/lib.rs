pub mod config;
pub mod cron_utils;

pub use config::*;
pub use cron_utils::{CronBuilder, CronScheduler};
pub use schedule_errors::{ErrorSeverity, ScheduleError, ScheduleResult};
