//! Test data builders for creating source entity snapshots
//!
//! Every builder starts from an eligible entity with sensible defaults;
//! tests only override what they care about.

use chrono::{DateTime, Duration, Utc};
use schedule_domain::sources::{
    DayOfWeek, ImportanceLevel, ObjectiveReminderConfig, ObjectiveReminderTrigger, ObjectiveSnapshot,
    ObjectiveTriggerKind, OffsetUnit, RecurrenceFrequency, RecurrenceRule, ReminderRecurrence, ReminderSnapshot,
    ReminderStatus, ReminderTrigger, ReminderType, SourceEntity, TimeOfDay, UrgencyLevel,
    WorkItemKind, WorkItemReminderConfig, WorkItemReminderTrigger, WorkItemSnapshot,
};
use schedule_domain::ScheduleStrategyInput;

use crate::helpers::test_now;

pub const TEST_ACCOUNT: &str = "acc-test";

/// Build a strategy input for the test account evaluated at [`test_now`]
pub fn input_for(entity: impl Into<SourceEntity>) -> ScheduleStrategyInput {
    ScheduleStrategyInput::new(TEST_ACCOUNT, entity.into()).at(test_now())
}

/// Builder for creating test objective snapshots
pub struct ObjectiveSnapshotBuilder {
    objective: ObjectiveSnapshot,
}

impl ObjectiveSnapshotBuilder {
    /// Eligible objective spanning 60 days from [`test_now`] with one 50% trigger
    pub fn new(uuid: &str) -> Self {
        let start = test_now();
        Self {
            objective: ObjectiveSnapshot {
                uuid: uuid.to_string(),
                title: "test_objective".to_string(),
                description: None,
                importance: ImportanceLevel::Moderate,
                urgency: UrgencyLevel::Medium,
                start_date: Some(start),
                target_date: Some(start + Duration::days(60)),
                reminder_config: Some(ObjectiveReminderConfig {
                    enabled: true,
                    triggers: vec![ObjectiveReminderTrigger {
                        kind: ObjectiveTriggerKind::TimeProgressPercentage,
                        value: 50,
                        enabled: true,
                    }],
                }),
            },
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.objective.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.objective.description = Some(description.to_string());
        self
    }

    pub fn with_importance(mut self, importance: ImportanceLevel) -> Self {
        self.objective.importance = importance;
        self
    }

    pub fn with_urgency(mut self, urgency: UrgencyLevel) -> Self {
        self.objective.urgency = urgency;
        self
    }

    pub fn with_dates(mut self, start: Option<DateTime<Utc>>, target: Option<DateTime<Utc>>) -> Self {
        self.objective.start_date = start;
        self.objective.target_date = target;
        self
    }

    /// Start at `start`, target `days` later
    pub fn with_duration_days(self, start: DateTime<Utc>, days: i64) -> Self {
        self.with_dates(Some(start), Some(start + Duration::days(days)))
    }

    pub fn with_triggers(mut self, triggers: Vec<(ObjectiveTriggerKind, u32)>) -> Self {
        let config = self.objective.reminder_config.get_or_insert(ObjectiveReminderConfig {
            enabled: true,
            triggers: Vec::new(),
        });
        config.triggers = triggers
            .into_iter()
            .map(|(kind, value)| ObjectiveReminderTrigger {
                kind,
                value,
                enabled: true,
            })
            .collect();
        self
    }

    pub fn with_disabled_trigger(mut self, kind: ObjectiveTriggerKind, value: u32) -> Self {
        if let Some(config) = self.objective.reminder_config.as_mut() {
            config.triggers.push(ObjectiveReminderTrigger {
                kind,
                value,
                enabled: false,
            });
        }
        self
    }

    pub fn with_reminders_disabled(mut self) -> Self {
        if let Some(config) = self.objective.reminder_config.as_mut() {
            config.enabled = false;
        }
        self
    }

    pub fn without_reminder_config(mut self) -> Self {
        self.objective.reminder_config = None;
        self
    }

    pub fn build(self) -> ObjectiveSnapshot {
        self.objective
    }

    pub fn into_entity(self) -> SourceEntity {
        SourceEntity::Objective(self.objective)
    }
}

/// Builder for creating test work item snapshots
pub struct WorkItemSnapshotBuilder {
    work_item: WorkItemSnapshot,
}

impl WorkItemSnapshotBuilder {
    /// Eligible recurring daily work item at 10:00 with a 30 minute relative trigger
    pub fn new(uuid: &str) -> Self {
        Self {
            work_item: WorkItemSnapshot {
                uuid: uuid.to_string(),
                title: "test_work_item".to_string(),
                description: None,
                kind: WorkItemKind::Recurring,
                importance: ImportanceLevel::Important,
                urgency: UrgencyLevel::Medium,
                time_point: Some(TimeOfDay::from_minute_of_day(10 * 60)),
                start_date: None,
                end_date: None,
                recurrence_rule: Some(RecurrenceRule::new(RecurrenceFrequency::Daily)),
                reminder_config: Some(WorkItemReminderConfig {
                    enabled: true,
                    triggers: vec![WorkItemReminderTrigger::Relative {
                        value: 30,
                        unit: OffsetUnit::Minutes,
                    }],
                }),
            },
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.work_item.title = title.to_string();
        self
    }

    pub fn with_priority(mut self, importance: ImportanceLevel, urgency: UrgencyLevel) -> Self {
        self.work_item.importance = importance;
        self.work_item.urgency = urgency;
        self
    }

    pub fn one_time(mut self) -> Self {
        self.work_item.kind = WorkItemKind::OneTime;
        self
    }

    pub fn with_time_point(mut self, time_point: Option<TimeOfDay>) -> Self {
        self.work_item.time_point = time_point;
        self
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.work_item.recurrence_rule = Some(rule);
        self
    }

    pub fn without_recurrence(mut self) -> Self {
        self.work_item.recurrence_rule = None;
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<WorkItemReminderTrigger>) -> Self {
        let config = self.work_item.reminder_config.get_or_insert(WorkItemReminderConfig {
            enabled: true,
            triggers: Vec::new(),
        });
        config.triggers = triggers;
        self
    }

    pub fn with_reminders_disabled(mut self) -> Self {
        if let Some(config) = self.work_item.reminder_config.as_mut() {
            config.enabled = false;
        }
        self
    }

    pub fn with_dates(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.work_item.start_date = start;
        self.work_item.end_date = end;
        self
    }

    pub fn build(self) -> WorkItemSnapshot {
        self.work_item
    }

    pub fn into_entity(self) -> SourceEntity {
        SourceEntity::WorkItem(self.work_item)
    }
}

/// Builder for creating test reminder snapshots
pub struct ReminderSnapshotBuilder {
    reminder: ReminderSnapshot,
}

impl ReminderSnapshotBuilder {
    /// Eligible active recurring reminder, fixed time 08:00, daily
    pub fn new(uuid: &str) -> Self {
        Self {
            reminder: ReminderSnapshot {
                uuid: uuid.to_string(),
                title: "test_reminder".to_string(),
                description: None,
                reminder_type: ReminderType::Recurring,
                status: ReminderStatus::Active,
                self_enabled: true,
                importance: ImportanceLevel::Moderate,
                trigger: Some(ReminderTrigger::FixedTime {
                    time: TimeOfDay::from_minute_of_day(8 * 60),
                }),
                recurrence: Some(ReminderRecurrence::Daily),
                start_date: None,
                end_date: None,
            },
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.reminder.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.reminder.description = Some(description.to_string());
        self
    }

    pub fn one_time(mut self) -> Self {
        self.reminder.reminder_type = ReminderType::OneTime;
        self
    }

    pub fn fixed_time(mut self, hour: u32, minute: u32) -> Self {
        self.reminder.trigger = Some(ReminderTrigger::FixedTime {
            time: TimeOfDay::from_minute_of_day(i64::from(hour * 60 + minute)),
        });
        self
    }

    pub fn interval(mut self, minutes: u32) -> Self {
        self.reminder.trigger = Some(ReminderTrigger::Interval { minutes });
        self
    }

    pub fn without_trigger(mut self) -> Self {
        self.reminder.trigger = None;
        self
    }

    pub fn with_recurrence(mut self, recurrence: Option<ReminderRecurrence>) -> Self {
        self.reminder.recurrence = recurrence;
        self
    }

    pub fn weekly(self, weekdays: Vec<DayOfWeek>) -> Self {
        self.with_recurrence(Some(ReminderRecurrence::Weekly { weekdays }))
    }

    pub fn with_status(mut self, status: ReminderStatus) -> Self {
        self.reminder.status = status;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.reminder.self_enabled = false;
        self
    }

    pub fn with_importance(mut self, importance: ImportanceLevel) -> Self {
        self.reminder.importance = importance;
        self
    }

    pub fn with_dates(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.reminder.start_date = start;
        self.reminder.end_date = end;
        self
    }

    pub fn build(self) -> ReminderSnapshot {
        self.reminder
    }

    pub fn into_entity(self) -> SourceEntity {
        SourceEntity::Reminder(self.reminder)
    }
}
