use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::metric::TaskStatus;

/// `(year, month)` key of one monthly slot, month ∈ [1,12].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    /// Previous slot of the year-scoped month carousel: January wraps to
    /// December of the same year, the year never changes.
    pub fn prev_slot(self) -> Self {
        Self {
            year: self.year,
            month: if self.month == 1 { 12 } else { self.month - 1 },
        }
    }

    /// Next slot of the year-scoped month carousel: December wraps to
    /// January of the same year.
    pub fn next_slot(self) -> Self {
        Self {
            year: self.year,
            month: if self.month == 12 { 1 } else { self.month + 1 },
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

/// One persisted monthly entry for a task. At most one exists per
/// `(taskId, year, month)`; absence means "not yet entered". Created
/// implicitly on first save, updated on every later save for the same month,
/// never deleted through this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyActivityRecord {
    pub task_id: String,
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub activity_content: Option<String>,
    #[serde(default)]
    pub actual_value: Option<f64>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Server-assigned identity; `None` until the first successful save.
    #[serde(default)]
    pub activity_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MonthlyActivityRecord {
    pub fn key(&self) -> MonthKey {
        MonthKey::new(self.year, self.month)
    }
}

/// Form state submitted by `save` and snapshotted into the edit cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityForm {
    pub activity_content: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub actual_value: Option<f64>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_id: String,
    pub file_name: String,
}

/// Server acknowledgement of a successful save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub activity_id: i64,
    pub saved_at: DateTime<Utc>,
}

/// One of the twelve server-apportioned target/actual tuples for a task
/// year. Read-only here; per-month targets are computed upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YearlyGoal {
    pub month: u32,
    pub target_value: f64,
    pub actual_value: f64,
    pub achievement_rate: f64,
}

impl YearlyGoal {
    /// Fallback set substituted when the yearly-goal fetch fails: twelve
    /// zero-filled tuples keep the summary view renderable.
    pub fn zeroed_year() -> Vec<YearlyGoal> {
        (1..=12)
            .map(|month| YearlyGoal {
                month,
                target_value: 0.0,
                actual_value: 0.0,
                achievement_rate: 0.0,
            })
            .collect()
    }
}
