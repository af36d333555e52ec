//! Chores: one-off or recurring tasks with a due date.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{HomestockError, Result};
use crate::recurrence::{next_due_date, Recurrence};
use crate::types::{deserialize_flexible, deserialize_flexible_opt, CategoryId, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// One entry in a task's completion log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub category_id: CategoryId,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    /// `None` for one-off tasks.
    pub recurring: Option<Recurrence>,
    /// Always false at rest for recurring tasks.
    pub completed: bool,
    pub completed_on: Option<DateTime<Utc>>,
    pub last_completed_on: Option<DateTime<Utc>>,
    pub completion_history: Vec<CompletionRecord>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Complete (or un-complete) the task.
    ///
    /// Recurring tasks advance to their next due date and stay incomplete.
    /// One-off tasks flip `completed`; un-completing clears `completed_on`
    /// but keeps `last_completed_on` and the history.
    ///
    /// Fails, leaving the task as it was, when the next due date cannot be
    /// represented.
    pub fn toggle(mut self, now: DateTime<Utc>) -> Result<Self> {
        match self.recurring {
            Some(rule) => {
                self.due_date = next_due_date(self.due_date, &rule)?;
                self.completed = false;
                self.record_completion(now);
            }
            None => {
                self.completed = !self.completed;
                if self.completed {
                    self.record_completion(now);
                } else {
                    self.completed_on = None;
                }
            }
        }
        self.updated_at = now;
        Ok(self)
    }

    fn record_completion(&mut self, now: DateTime<Utc>) {
        self.completed_on = Some(now);
        self.last_completed_on = Some(now);
        self.completion_history.push(CompletionRecord {
            date: now,
            notes: None,
        });
    }

    pub fn apply_update(mut self, patch: TaskUpdate, now: DateTime<Utc>) -> Result<Self> {
        if let Some(title) = patch.title {
            self.title = require_title(&title)?;
        }
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(due) = patch.due_date {
            self.due_date = due;
        }
        if let Some(recurring) = patch.recurring {
            if let Some(rule) = &recurring {
                rule.validate()?;
            }
            self.recurring = recurring;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        // A task that just became recurring cannot rest completed.
        if self.recurring.is_some() {
            self.completed = false;
        }
        self.updated_at = now;
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub category_id: CategoryId,
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_flexible")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub recurring: Option<Recurrence>,
    #[serde(default)]
    pub priority: Priority,
}

impl NewTask {
    pub fn new(title: impl Into<String>, category_id: CategoryId, due_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            category_id,
            description: None,
            due_date,
            recurring: None,
            priority: Priority::default(),
        }
    }

    pub fn into_task(self, now: DateTime<Utc>) -> Result<Task> {
        let title = require_title(&self.title)?;
        if let Some(rule) = &self.recurring {
            rule.validate()?;
        }
        Ok(Task {
            id: TaskId::new(),
            title,
            category_id: self.category_id,
            description: self.description.map(|d| d.trim().to_string()),
            due_date: self.due_date,
            recurring: self.recurring,
            completed: false,
            completed_on: None,
            last_completed_on: None,
            completion_history: Vec::new(),
            priority: self.priority,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update. `recurring: null` turns recurrence off; omitting the
/// field leaves it unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub category_id: Option<CategoryId>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flexible_opt")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub recurring: Option<Option<Recurrence>>,
    pub priority: Option<Priority>,
    pub completed: Option<bool>,
}

/// Distinguishes an explicit `null` (Some(None)) from an absent field (None).
fn present_or_null<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn require_title(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(HomestockError::validation("title is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrence::WeekdaySet;
    use chrono::{TimeZone, Weekday};

    fn due() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 18, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 7, 15, 0).unwrap()
    }

    fn task(recurring: Option<Recurrence>) -> Task {
        NewTask {
            recurring,
            ..NewTask::new("Water plants", CategoryId::from("home"), due())
        }
        .into_task(due())
        .unwrap()
    }

    #[test]
    fn one_off_toggle_flips_and_records() {
        let done = task(None).toggle(now()).unwrap();
        assert!(done.completed);
        assert_eq!(done.completed_on, Some(now()));
        assert_eq!(done.last_completed_on, Some(now()));
        assert_eq!(done.completion_history.len(), 1);
        assert_eq!(done.due_date, due());

        let undone = done.toggle(now()).unwrap();
        assert!(!undone.completed);
        assert_eq!(undone.completed_on, None);
        assert_eq!(undone.last_completed_on, Some(now()));
    }

    #[test]
    fn recurring_toggle_advances_and_stays_open() {
        let t = task(Some(Recurrence::Weekly { interval: 1 })).toggle(now()).unwrap();
        assert!(!t.completed);
        assert_eq!(t.due_date, Utc.with_ymd_and_hms(2024, 1, 8, 18, 0, 0).unwrap());
        assert_eq!(t.completed_on, Some(now()));
        assert_eq!(t.completion_history.len(), 1);

        let t = t.toggle(now()).unwrap();
        assert_eq!(t.due_date, Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap());
        assert!(!t.completed);
        assert_eq!(t.completion_history.len(), 2);
    }

    #[test]
    fn recurring_custom_advance_uses_current_due_weekday() {
        // due() is a Monday; next Saturday is five days out
        let rule = Recurrence::Custom {
            days: [Weekday::Sat].into_iter().collect::<WeekdaySet>(),
        };
        let t = task(Some(rule)).toggle(now()).unwrap();
        assert_eq!(t.due_date, Utc.with_ymd_and_hms(2024, 1, 6, 18, 0, 0).unwrap());
    }

    #[test]
    fn toggle_past_the_calendar_end_is_rejected() {
        let mut t = task(Some(Recurrence::Daily { interval: 1 }));
        t.due_date = Utc.with_ymd_and_hms(9999, 12, 31, 18, 0, 0).unwrap();
        let err = t.toggle(now()).unwrap_err();
        assert!(matches!(err, HomestockError::Validation(_)));
    }

    #[test]
    fn oversized_interval_is_rejected_on_create() {
        let new = NewTask {
            recurring: Some(Recurrence::Daily { interval: 4_000_000_000 }),
            ..NewTask::new("Descale kettle", CategoryId::from("home"), due())
        };
        assert!(new.into_task(now()).is_err());
    }

    #[test]
    fn new_task_accepts_bare_date_and_defaults() {
        let json = r#"{"title":"Mow","categoryId":"yard","dueDate":"2024-05-04"}"#;
        let t = serde_json::from_str::<NewTask>(json)
            .unwrap()
            .into_task(now())
            .unwrap();
        assert_eq!(t.due_date, Utc.with_ymd_and_hms(2024, 5, 4, 0, 0, 0).unwrap());
        assert_eq!(t.priority, Priority::Medium);
        assert!(t.recurring.is_none());
        assert!(!t.completed);
    }

    #[test]
    fn zero_interval_rule_is_rejected_on_create() {
        let new = NewTask {
            recurring: Some(Recurrence::Daily { interval: 0 }),
            ..NewTask::new("Feed cat", CategoryId::from("home"), due())
        };
        assert!(new.into_task(now()).is_err());
    }

    #[test]
    fn update_null_recurring_disables_it() {
        let t = task(Some(Recurrence::Daily { interval: 1 }));
        let patch: TaskUpdate = serde_json::from_str(r#"{"recurring":null}"#).unwrap();
        let t = t.apply_update(patch, now()).unwrap();
        assert!(t.recurring.is_none());

        let patch: TaskUpdate = serde_json::from_str(r#"{"priority":"high"}"#).unwrap();
        assert!(patch.recurring.is_none());
        let t = t.apply_update(patch, now()).unwrap();
        assert_eq!(t.priority, Priority::High);
    }

    #[test]
    fn making_a_completed_task_recurring_reopens_it() {
        let done = task(None).toggle(now()).unwrap();
        let patch = TaskUpdate {
            recurring: Some(Some(Recurrence::Monthly { interval: 1 })),
            ..Default::default()
        };
        let t = done.apply_update(patch, now()).unwrap();
        assert!(!t.completed);
    }

    #[test]
    fn task_json_is_camel_case() {
        let v = serde_json::to_value(task(Some(Recurrence::Daily { interval: 2 }))).unwrap();
        assert_eq!(v["recurring"]["frequency"], "daily");
        assert_eq!(v["recurring"]["interval"], 2);
        assert!(v.get("dueDate").is_some());
        assert!(v.get("completionHistory").is_some());
        assert_eq!(v["priority"], "medium");
    }
}
