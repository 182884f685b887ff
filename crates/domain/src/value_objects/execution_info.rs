use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use schedule_errors::ScheduleError;

/// 单次执行的结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExecutionStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "SKIPPED")]
    Skipped,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Timeout => "TIMEOUT",
            ExecutionStatus::Skipped => "SKIPPED",
        }
    }

    /// FAILED 与 TIMEOUT 计入连续失败次数
    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionStatus::Failed | ExecutionStatus::Timeout)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(ExecutionStatus::Success),
            "FAILED" => Ok(ExecutionStatus::Failed),
            "TIMEOUT" => Ok(ExecutionStatus::Timeout),
            "SKIPPED" => Ok(ExecutionStatus::Skipped),
            _ => Err(ScheduleError::Serialization(format!(
                "Invalid execution status: {s}"
            ))),
        }
    }
}

/// 执行历史与健康度
///
/// 每次执行后通过 [`ExecutionInfo::after_execution`] 整体替换，不做原地修改。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub execution_count: u64,
    pub last_execution_status: Option<ExecutionStatus>,
    /// 最近一次执行耗时（毫秒）
    pub last_execution_duration: Option<u64>,
    pub consecutive_failures: u32,
}

impl ExecutionInfo {
    pub fn initial(next_run_at: Option<DateTime<Utc>>) -> Self {
        Self {
            next_run_at,
            ..Self::default()
        }
    }

    pub fn after_execution(
        &self,
        status: ExecutionStatus,
        duration_ms: u64,
        executed_at: DateTime<Utc>,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Self {
        let consecutive_failures = if status.is_failure() {
            self.consecutive_failures.saturating_add(1)
        } else {
            0
        };

        Self {
            next_run_at,
            last_run_at: Some(executed_at),
            execution_count: self.execution_count.saturating_add(1),
            last_execution_status: Some(status),
            last_execution_duration: Some(duration_ms),
            consecutive_failures,
        }
    }

    pub fn with_next_run_at(&self, next_run_at: Option<DateTime<Utc>>) -> Self {
        Self {
            next_run_at,
            ..self.clone()
        }
    }

    pub fn is_healthy(&self, max_consecutive_failures: u32) -> bool {
        self.consecutive_failures < max_consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_failures_increment_by_exactly_one() {
        let info = ExecutionInfo {
            consecutive_failures: 7,
            ..ExecutionInfo::default()
        };

        let failed = info.after_execution(ExecutionStatus::Failed, 120, at(9), None);
        assert_eq!(failed.consecutive_failures, 8);

        let timed_out = failed.after_execution(ExecutionStatus::Timeout, 30_000, at(10), None);
        assert_eq!(timed_out.consecutive_failures, 9);
    }

    #[test]
    fn test_non_failures_reset_counter() {
        let info = ExecutionInfo {
            consecutive_failures: 4,
            ..ExecutionInfo::default()
        };

        for status in [ExecutionStatus::Success, ExecutionStatus::Skipped] {
            let next = info.after_execution(status, 10, at(9), None);
            assert_eq!(next.consecutive_failures, 0, "status {status}");
        }
    }

    #[test]
    fn test_after_execution_records_run() {
        let next_run = at(20);
        let info = ExecutionInfo::initial(Some(at(9)));
        let updated = info.after_execution(ExecutionStatus::Success, 250, at(9), Some(next_run));

        assert_eq!(updated.execution_count, 1);
        assert_eq!(updated.last_run_at, Some(at(9)));
        assert_eq!(updated.next_run_at, Some(next_run));
        assert_eq!(updated.last_execution_status, Some(ExecutionStatus::Success));
        assert_eq!(updated.last_execution_duration, Some(250));
        // 原实例不变
        assert_eq!(info.execution_count, 0);
    }

    #[test]
    fn test_execution_count_is_monotonic() {
        let mut info = ExecutionInfo::default();
        for i in 0..5 {
            let status = if i % 2 == 0 {
                ExecutionStatus::Failed
            } else {
                ExecutionStatus::Success
            };
            let next = info.after_execution(status, 1, at(9) + Duration::hours(i), None);
            assert_eq!(next.execution_count, info.execution_count + 1);
            info = next;
        }
        assert_eq!(info.execution_count, 5);
    }

    #[test]
    fn test_is_healthy() {
        let info = ExecutionInfo {
            consecutive_failures: 3,
            ..ExecutionInfo::default()
        };
        assert!(!info.is_healthy(3));
        assert!(info.is_healthy(4));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("TIMEOUT".parse::<ExecutionStatus>().unwrap(), ExecutionStatus::Timeout);
        assert!("DONE".parse::<ExecutionStatus>().is_err());
    }
}
