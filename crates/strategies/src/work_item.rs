//! 重复工作项（WorkItem）调度策略

use serde_json::json;

use schedule_core::CronBuilder;
use schedule_domain::sources::{
    RecurrenceFrequency, RecurrenceRule, TimeOfDay, WorkItemKind, WorkItemReminderTrigger, WorkItemSnapshot,
};
use schedule_domain::{ScheduleConfig, ScheduleStrategyInput, ScheduleStrategyOutput, SourceEntity, SourceModule};
use schedule_errors::{ScheduleError, ScheduleResult};

use crate::priority::priority_from_importance_urgency;
use crate::strategy::{ineligible, with_entries, ScheduleStrategy, StrategySettings};

const DEFAULT_FIRE_MINUTE_OF_DAY: i64 = 9 * 60;
const DEFAULT_WEEKDAY: u32 = 1;

pub struct WorkItemScheduleStrategy {
    settings: StrategySettings,
}

impl WorkItemScheduleStrategy {
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }

    /// 计算触发时刻：只取第一个触发器
    ///
    /// ABSOLUTE 直接使用其时刻；RELATIVE 从工作项时间点（缺省 09:00）向前偏移，按一天取模。
    pub fn fire_time(work_item: &WorkItemSnapshot) -> TimeOfDay {
        let base = work_item
            .time_point
            .unwrap_or_else(|| TimeOfDay::from_minute_of_day(DEFAULT_FIRE_MINUTE_OF_DAY));

        let trigger = work_item
            .reminder_config
            .as_ref()
            .and_then(|config| config.triggers.first());

        match trigger {
            Some(WorkItemReminderTrigger::Absolute { time }) => *time,
            Some(WorkItemReminderTrigger::Relative { value, unit }) => {
                let offset = i64::from(*value) * i64::from(unit.to_minutes());
                TimeOfDay::from_minute_of_day(i64::from(base.minute_of_day()) - offset)
            }
            None => TimeOfDay::from_minute_of_day(DEFAULT_FIRE_MINUTE_OF_DAY),
        }
    }

    pub fn cron_expression(rule: &RecurrenceRule, time: TimeOfDay) -> ScheduleResult<String> {
        let builder = CronBuilder::daily_at(time.hour(), time.minute());

        let builder = match rule.frequency {
            RecurrenceFrequency::Daily => builder,
            RecurrenceFrequency::Weekly => {
                if let Some(day) = rule.days_of_week.iter().find(|day| **day > 6) {
                    return Err(ScheduleError::invalid_config(
                        "recurrenceRule.daysOfWeek",
                        format!("星期取值 {day} 超出范围 0-6"),
                    ));
                }
                if rule.days_of_week.is_empty() {
                    builder.weekdays(&[DEFAULT_WEEKDAY])
                } else {
                    builder.weekdays(&rule.days_of_week)
                }
            }
            RecurrenceFrequency::Monthly => builder.day_of_month(Self::anchor_day(rule)?),
            RecurrenceFrequency::Yearly => {
                let (day, month) = Self::anchor_date(rule)?;
                builder.day_of_month(day).month(month)
            }
        };

        Ok(builder.build())
    }

    fn anchor_day(rule: &RecurrenceRule) -> ScheduleResult<u32> {
        match rule.day_of_month {
            None => Ok(1),
            Some(day) if (1..=31).contains(&day) => Ok(day),
            Some(day) => Err(ScheduleError::invalid_config(
                "recurrenceRule.dayOfMonth",
                format!("日期取值 {day} 超出范围 1-31"),
            )),
        }
    }

    /// 每年触发的日期必须在该月真实存在（2月允许29日）
    fn anchor_date(rule: &RecurrenceRule) -> ScheduleResult<(u32, u32)> {
        let (day, month) = (Self::anchor_day(rule)?, Self::anchor_month(rule)?);
        let max_day = match month {
            2 => 29,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        };
        if day > max_day {
            return Err(ScheduleError::invalid_config(
                "recurrenceRule.dayOfMonth",
                format!("{month}月没有{day}日"),
            ));
        }
        Ok((day, month))
    }

    fn anchor_month(rule: &RecurrenceRule) -> ScheduleResult<u32> {
        match rule.month {
            None => Ok(1),
            Some(month) if (1..=12).contains(&month) => Ok(month),
            Some(month) => Err(ScheduleError::invalid_config(
                "recurrenceRule.month",
                format!("月份取值 {month} 超出范围 1-12"),
            )),
        }
    }
}

impl Default for WorkItemScheduleStrategy {
    fn default() -> Self {
        Self::new(StrategySettings::default())
    }
}

impl ScheduleStrategy for WorkItemScheduleStrategy {
    fn name(&self) -> &str {
        "WorkItemScheduleStrategy"
    }

    fn source_module(&self) -> SourceModule {
        SourceModule::WorkItem
    }

    fn should_create_schedule(&self, entity: &SourceEntity) -> bool {
        let SourceEntity::WorkItem(work_item) = entity else {
            return false;
        };
        work_item.kind == WorkItemKind::Recurring
            && work_item.recurrence_rule.is_some()
            && work_item
                .reminder_config
                .as_ref()
                .is_some_and(|config| config.enabled && !config.triggers.is_empty())
    }

    fn create_schedule(&self, input: &ScheduleStrategyInput) -> ScheduleResult<ScheduleStrategyOutput> {
        let (work_item, rule) = match &input.source_entity {
            SourceEntity::WorkItem(work_item) if self.should_create_schedule(&input.source_entity) => {
                match work_item.recurrence_rule.as_ref() {
                    Some(rule) => (work_item, rule),
                    None => return Err(ineligible(input, "工作项没有重复规则")),
                }
            }
            _ => return Err(ineligible(input, "工作项不是重复类型或未启用提醒")),
        };

        let fire_time = Self::fire_time(work_item);
        let schedule_config = ScheduleConfig::new(
            Self::cron_expression(rule, fire_time)?,
            self.settings.timezone_for(input),
        )?
        .with_window(work_item.start_date, work_item.end_date)?
        .with_max_executions(rule.occurrences)?;

        let priority = priority_from_importance_urgency(work_item.importance, work_item.urgency);
        let frequency_tag = match rule.frequency {
            RecurrenceFrequency::Daily => "daily",
            RecurrenceFrequency::Weekly => "weekly",
            RecurrenceFrequency::Monthly => "monthly",
            RecurrenceFrequency::Yearly => "yearly",
        };
        let metadata = self
            .settings
            .base_metadata(input, priority)?
            .add_tag(frequency_tag);
        let metadata = with_entries(
            metadata,
            [
                ("title", json!(work_item.title)),
                ("importance", json!(work_item.importance)),
                ("urgency", json!(work_item.urgency)),
                ("timePoint", json!(work_item.time_point)),
                ("fireTime", json!(fire_time)),
                ("frequency", json!(rule.frequency)),
                ("interval", json!(rule.interval)),
                (
                    "triggers",
                    json!(work_item.reminder_config.as_ref().map(|config| &config.triggers)),
                ),
            ],
        )?;

        Ok(ScheduleStrategyOutput {
            name: format!("工作项提醒: {}", work_item.title),
            description: work_item.description.clone(),
            schedule_config,
            metadata,
            enabled: true,
        })
    }
}
