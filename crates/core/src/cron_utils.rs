//! 六字段CRON表达式工具
//!
//! 表达式格式: `秒 分 时 日 月 周`，周字段 0=周日..6=周六，
//! 支持逗号列表（`0,30`）、范围（`1-5`）与步长（`0/15`、`*/5`）。

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use schedule_errors::{ScheduleError, ScheduleResult};

pub const FIELD_COUNT: usize = 6;

const FIELD_NAMES: [&str; FIELD_COUNT] = ["second", "minute", "hour", "day-of-month", "month", "day-of-week"];
const FIELD_RANGES: [(u32, u32); FIELD_COUNT] = [(0, 59), (0, 59), (0, 23), (1, 31), (1, 12), (0, 6)];
const DAY_OF_WEEK: usize = 5;

/// 校验单个字段的语法与取值范围
fn validate_field(expr: &str, index: usize, field: &str) -> ScheduleResult<()> {
    let (min, max) = FIELD_RANGES[index];
    let name = FIELD_NAMES[index];
    let invalid = |message: String| ScheduleError::invalid_cron(expr, format!("{name}: {message}"));

    let parse_value = |raw: &str| -> ScheduleResult<u32> {
        let value: u32 = raw
            .parse()
            .map_err(|_| invalid(format!("无法解析的取值 '{raw}'")))?;
        if value < min || value > max {
            return Err(invalid(format!("取值 {value} 超出范围 {min}-{max}")));
        }
        Ok(value)
    };

    for item in field.split(',') {
        if item.is_empty() {
            return Err(invalid("存在空的列表项".to_string()));
        }

        let (base, step) = match item.split_once('/') {
            Some((base, step)) => (base, Some(step)),
            None => (item, None),
        };

        if let Some(step) = step {
            let step: u32 = step
                .parse()
                .map_err(|_| invalid(format!("无法解析的步长 '{step}'")))?;
            if step == 0 {
                return Err(invalid("步长必须大于0".to_string()));
            }
        }

        if base == "*" {
            continue;
        }

        match base.split_once('-') {
            Some((start, end)) => {
                let start = parse_value(start)?;
                let end = parse_value(end)?;
                if start > end {
                    return Err(invalid(format!("范围起点 {start} 大于终点 {end}")));
                }
            }
            None => {
                parse_value(base)?;
            }
        }
    }

    Ok(())
}

/// 将周字段从 0..6 (周日起) 平移为 cron crate 使用的 1..7
fn shift_day_of_week(field: &str) -> String {
    let shift = |raw: &str| -> String {
        match raw.parse::<u32>() {
            Ok(value) => (value + 1).to_string(),
            Err(_) => raw.to_string(),
        }
    };

    field
        .split(',')
        .map(|item| {
            let (base, step) = match item.split_once('/') {
                Some((base, step)) => (base, Some(step)),
                None => (item, None),
            };
            let base = match base.split_once('-') {
                Some((start, end)) => format!("{}-{}", shift(start), shift(end)),
                None => shift(base),
            };
            match step {
                Some(step) => format!("{base}/{step}"),
                None => base,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// CRON表达式解析和调度工具
#[derive(Debug, Clone)]
pub struct CronScheduler {
    expression: String,
    schedule: Schedule,
}

impl CronScheduler {
    /// 创建新的CRON调度器
    pub fn new(cron_expr: &str) -> ScheduleResult<Self> {
        Self::validate_cron_expression(cron_expr)?;

        let mut fields: Vec<String> = cron_expr.split_whitespace().map(str::to_string).collect();
        fields[DAY_OF_WEEK] = shift_day_of_week(&fields[DAY_OF_WEEK]);
        let translated = fields.join(" ");

        let schedule = Schedule::from_str(&translated)
            .map_err(|e| ScheduleError::invalid_cron(cron_expr, e.to_string()))?;

        Ok(Self {
            expression: cron_expr.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// 获取下一次执行时间
    pub fn next_execution_time(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }

    /// 获取从指定时间开始的多个执行时间
    pub fn upcoming_times(&self, from: DateTime<Utc>, count: usize) -> Vec<DateTime<Utc>> {
        self.schedule.after(&from).take(count).collect()
    }

    /// 验证CRON表达式的结构是否合法（不做求值）
    pub fn validate_cron_expression(cron_expr: &str) -> ScheduleResult<()> {
        if cron_expr.trim().is_empty() {
            return Err(ScheduleError::invalid_cron(cron_expr, "表达式不能为空"));
        }

        let fields: Vec<&str> = cron_expr.split_whitespace().collect();
        if fields.len() != FIELD_COUNT {
            return Err(ScheduleError::invalid_cron(
                cron_expr,
                format!("需要{FIELD_COUNT}个字段，实际为{}个", fields.len()),
            ));
        }

        for (index, field) in fields.iter().enumerate() {
            validate_field(cron_expr, index, field)?;
        }

        Ok(())
    }
}

/// 六字段表达式构建器，未设置的字段为 `*`，秒固定为 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronBuilder {
    second: String,
    minute: String,
    hour: String,
    day_of_month: String,
    month: String,
    day_of_week: String,
}

impl Default for CronBuilder {
    fn default() -> Self {
        Self {
            second: "0".to_string(),
            minute: "*".to_string(),
            hour: "*".to_string(),
            day_of_month: "*".to_string(),
            month: "*".to_string(),
            day_of_week: "*".to_string(),
        }
    }
}

impl CronBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 每天固定的 时:分
    pub fn daily_at(hour: u32, minute: u32) -> Self {
        Self::new().minutes(&[minute]).hours(&[hour])
    }

    pub fn minutes(mut self, minutes: &[u32]) -> Self {
        self.minute = format_list(minutes);
        self
    }

    /// 分钟步长，如 `0/45`
    pub fn minute_step(mut self, start: u32, step: u32) -> Self {
        self.minute = format!("{start}/{step}");
        self
    }

    pub fn hours(mut self, hours: &[u32]) -> Self {
        self.hour = format_list(hours);
        self
    }

    pub fn day_of_month(mut self, day: u32) -> Self {
        self.day_of_month = day.to_string();
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = month.to_string();
        self
    }

    /// 周字段（0=周日..6=周六），空集合表示每天
    pub fn weekdays(mut self, days: &[u32]) -> Self {
        self.day_of_week = format_list(days);
        self
    }

    pub fn build(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.second, self.minute, self.hour, self.day_of_month, self.month, self.day_of_week
        )
    }
}

/// 排序去重后以逗号连接，空集合返回 `*`
pub fn format_list(values: &[u32]) -> String {
    let mut values = values.to_vec();
    values.sort_unstable();
    values.dedup();
    if values.is_empty() {
        return "*".to_string();
    }
    values
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
