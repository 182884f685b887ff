//! 目标（Objective）调度策略
//!
//! 按目标总时长选择提醒频率：短期目标高频跟进，长期目标低频提醒。

use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use tracing::debug;

use schedule_core::CronBuilder;
use schedule_domain::sources::{ObjectiveReminderTrigger, ObjectiveSnapshot, ObjectiveTriggerKind};
use schedule_domain::{ScheduleConfig, ScheduleStrategyInput, ScheduleStrategyOutput, SourceEntity, SourceModule};
use schedule_errors::ScheduleResult;

use crate::priority::priority_from_importance_urgency;
use crate::strategy::{ineligible, with_entries, ScheduleStrategy, StrategySettings};

const MORNING_HOUR: u32 = 9;
const EVENING_HOUR: u32 = 20;
const SHORT_TERM_DAYS: i64 = 30;
const LONG_TERM_DAYS: i64 = 180;

/// 提醒频率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveCadence {
    TwiceDaily,
    Daily,
    Weekly,
}

impl ObjectiveCadence {
    pub fn for_duration(duration_days: Option<i64>) -> Self {
        match duration_days {
            Some(days) if days < SHORT_TERM_DAYS => ObjectiveCadence::TwiceDaily,
            Some(days) if days <= LONG_TERM_DAYS => ObjectiveCadence::Daily,
            _ => ObjectiveCadence::Weekly,
        }
    }

    pub fn cron_expression(&self) -> String {
        match self {
            ObjectiveCadence::TwiceDaily => CronBuilder::new()
                .minutes(&[0])
                .hours(&[MORNING_HOUR, EVENING_HOUR])
                .build(),
            ObjectiveCadence::Daily => CronBuilder::daily_at(MORNING_HOUR, 0).build(),
            // 周一
            ObjectiveCadence::Weekly => CronBuilder::daily_at(MORNING_HOUR, 0).weekdays(&[1]).build(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            ObjectiveCadence::TwiceDaily => "twice-daily",
            ObjectiveCadence::Daily => "daily",
            ObjectiveCadence::Weekly => "weekly",
        }
    }
}

pub struct ObjectiveScheduleStrategy {
    settings: StrategySettings,
}

impl ObjectiveScheduleStrategy {
    pub fn new(settings: StrategySettings) -> Self {
        Self { settings }
    }

    fn objective<'a>(&self, input: &'a ScheduleStrategyInput) -> Option<&'a ObjectiveSnapshot> {
        match &input.source_entity {
            SourceEntity::Objective(objective) if self.should_create_schedule(&input.source_entity) => {
                Some(objective)
            }
            _ => None,
        }
    }

    /// 预先计算每个启用触发器的绝对触发时间，丢弃早于 `now` 的
    fn trigger_instants(objective: &ObjectiveSnapshot, now: DateTime<Utc>) -> Vec<Value> {
        objective
            .enabled_triggers()
            .filter_map(|trigger| {
                let Some(fire_at) = Self::fire_at(objective, trigger) else {
                    debug!(
                        objective_uuid = %objective.uuid,
                        kind = ?trigger.kind,
                        value = trigger.value,
                        "触发时间无法计算，忽略该触发器"
                    );
                    return None;
                };
                (fire_at >= now).then(|| {
                    json!({
                        "kind": trigger.kind,
                        "value": trigger.value,
                        "fireAt": fire_at.to_rfc3339(),
                    })
                })
            })
            .collect()
    }

    /// 缺少日期或超出可表示的时间范围时返回 `None`
    fn fire_at(objective: &ObjectiveSnapshot, trigger: &ObjectiveReminderTrigger) -> Option<DateTime<Utc>> {
        match trigger.kind {
            ObjectiveTriggerKind::TimeProgressPercentage => {
                let (start, target) = (objective.start_date?, objective.target_date?);
                let offset_ms = (target - start)
                    .num_milliseconds()
                    .checked_mul(i64::from(trigger.value))?
                    / 100;
                start.checked_add_signed(Duration::try_milliseconds(offset_ms)?)
            }
            ObjectiveTriggerKind::RemainingDays => objective
                .target_date?
                .checked_sub_signed(Duration::try_days(i64::from(trigger.value))?),
        }
    }
}

impl Default for ObjectiveScheduleStrategy {
    fn default() -> Self {
        Self::new(StrategySettings::default())
    }
}

impl ScheduleStrategy for ObjectiveScheduleStrategy {
    fn name(&self) -> &str {
        "ObjectiveScheduleStrategy"
    }

    fn source_module(&self) -> SourceModule {
        SourceModule::Objective
    }

    fn should_create_schedule(&self, entity: &SourceEntity) -> bool {
        match entity {
            SourceEntity::Objective(objective) => objective.enabled_triggers().next().is_some(),
            _ => false,
        }
    }

    fn create_schedule(&self, input: &ScheduleStrategyInput) -> ScheduleResult<ScheduleStrategyOutput> {
        let objective = self
            .objective(input)
            .ok_or_else(|| ineligible(input, "目标未启用提醒或没有启用的触发器"))?;

        let duration_days = objective.duration_days();
        let cadence = ObjectiveCadence::for_duration(duration_days);
        let window_end = objective.target_date.filter(|target| *target > input.evaluated_at);
        let schedule_config = ScheduleConfig::new(cadence.cron_expression(), self.settings.timezone_for(input))?
            .with_window(None, window_end)?;

        let priority = priority_from_importance_urgency(objective.importance, objective.urgency);
        let metadata = self
            .settings
            .base_metadata(input, priority)?
            .add_tag(cadence.tag());
        let metadata = with_entries(
            metadata,
            [
                ("title", json!(objective.title)),
                ("importance", json!(objective.importance)),
                ("urgency", json!(objective.urgency)),
                ("startDate", json!(objective.start_date.map(|d| d.to_rfc3339()))),
                ("targetDate", json!(objective.target_date.map(|d| d.to_rfc3339()))),
                ("durationDays", json!(duration_days)),
                ("triggers", Value::Array(Self::trigger_instants(objective, input.evaluated_at))),
            ],
        )?;

        Ok(ScheduleStrategyOutput {
            name: format!("目标提醒: {}", objective.title),
            description: objective.description.clone(),
            schedule_config,
            metadata,
            enabled: true,
        })
    }
}
