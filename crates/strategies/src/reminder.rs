//! 提醒（Reminder）调度策略

use serde_json::json;

use schedule_core::CronBuilder;
use schedule_domain::sources::{ReminderRecurrence, ReminderSnapshot, ReminderStatus, ReminderTrigger, ReminderType};
use schedule_domain::{ScheduleConfig, ScheduleStrategyInput, ScheduleStrategyOutput, SourceEntity, SourceModule};
use schedule_errors::{ScheduleError, ScheduleResult};

use crate::priority::priority_from_importance;
use crate::strategy::{ineligible, with_entries, ScheduleStrategy, StrategySettings};

const MINUTES_PER_HOUR: u32 = 60;

pub struct ReminderScheduleStrategy {
    settings: StrategySettings,
}

impl ReminderScheduleStrategy {
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }

    /// 周字段取值；一次性提醒或未设置重复规则时为空（每天）
    fn weekdays(reminder: &ReminderSnapshot) -> Vec<u32> {
        if reminder.reminder_type == ReminderType::OneTime {
            return Vec::new();
        }
        reminder
            .recurrence
            .as_ref()
            .map(|recurrence| recurrence.weekdays().iter().map(|day| day.cron_index()).collect())
            .unwrap_or_default()
    }

    pub fn cron_expression(reminder: &ReminderSnapshot, trigger: &ReminderTrigger) -> ScheduleResult<String> {
        let weekdays = Self::weekdays(reminder);

        let builder = match trigger {
            ReminderTrigger::FixedTime { time } => CronBuilder::daily_at(time.hour(), time.minute()),
            ReminderTrigger::Interval { minutes: 0 } => {
                return Err(ScheduleError::invalid_config("trigger.minutes", "间隔分钟数必须大于0"));
            }
            ReminderTrigger::Interval { minutes } if *minutes >= MINUTES_PER_HOUR => {
                CronBuilder::new().minutes(&[0])
            }
            ReminderTrigger::Interval { minutes } if MINUTES_PER_HOUR % minutes == 0 => {
                let exact: Vec<u32> = (0..MINUTES_PER_HOUR).step_by(*minutes as usize).collect();
                CronBuilder::new().minutes(&exact)
            }
            ReminderTrigger::Interval { minutes } => CronBuilder::new().minute_step(0, *minutes),
        };

        Ok(builder.weekdays(&weekdays).build())
    }

    fn recurrence_label(reminder: &ReminderSnapshot) -> &'static str {
        match (&reminder.reminder_type, &reminder.recurrence) {
            (ReminderType::OneTime, _) => "one-time",
            (ReminderType::Recurring, None | Some(ReminderRecurrence::Daily)) => "daily",
            (ReminderType::Recurring, Some(ReminderRecurrence::Weekly { .. })) => "weekly",
            (ReminderType::Recurring, Some(ReminderRecurrence::CustomDays { .. })) => "custom-days",
        }
    }
}

impl Default for ReminderScheduleStrategy {
    fn default() -> Self {
        Self::new(StrategySettings::default())
    }
}

impl ScheduleStrategy for ReminderScheduleStrategy {
    fn name(&self) -> &str {
        "ReminderScheduleStrategy"
    }

    fn source_module(&self) -> SourceModule {
        SourceModule::Reminder
    }

    fn should_create_schedule(&self, entity: &SourceEntity) -> bool {
        match entity {
            SourceEntity::Reminder(reminder) => {
                reminder.self_enabled && reminder.status == ReminderStatus::Active && reminder.trigger.is_some()
            }
            _ => false,
        }
    }

    fn create_schedule(&self, input: &ScheduleStrategyInput) -> ScheduleResult<ScheduleStrategyOutput> {
        let (reminder, trigger) = match &input.source_entity {
            SourceEntity::Reminder(reminder) if self.should_create_schedule(&input.source_entity) => {
                match reminder.trigger.as_ref() {
                    Some(trigger) => (reminder, trigger),
                    None => return Err(ineligible(input, "提醒未配置触发器")),
                }
            }
            _ => return Err(ineligible(input, "提醒未启用、状态非ACTIVE或未配置触发器")),
        };

        // 一次性提醒：表达式每天重复，由执行次数上限限制只触发一次
        let max_executions = match reminder.reminder_type {
            ReminderType::OneTime => Some(1),
            ReminderType::Recurring => None,
        };
        let schedule_config = ScheduleConfig::new(
            Self::cron_expression(reminder, trigger)?,
            self.settings.timezone_for(input),
        )?
        .with_window(reminder.start_date, reminder.end_date)?
        .with_max_executions(max_executions)?;

        let trigger_tag = match trigger {
            ReminderTrigger::FixedTime { .. } => "fixed-time",
            ReminderTrigger::Interval { .. } => "interval",
        };
        let metadata = self
            .settings
            .base_metadata(input, priority_from_importance(reminder.importance))?
            .add_tag(Self::recurrence_label(reminder))
            .add_tag(trigger_tag);
        let metadata = with_entries(
            metadata,
            [
                ("title", json!(reminder.title)),
                ("reminderType", json!(reminder.reminder_type)),
                ("importance", json!(reminder.importance)),
                ("trigger", json!(trigger)),
                ("recurrence", json!(reminder.recurrence)),
            ],
        )?;

        Ok(ScheduleStrategyOutput {
            name: format!("提醒: {}", reminder.title),
            description: reminder.description.clone(),
            schedule_config,
            metadata,
            enabled: true,
        })
    }
}
