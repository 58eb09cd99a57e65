use serde::{Deserialize, Serialize};
use tracing::warn;

/// Unit a task's performance is measured in. Only meaningful for
/// quantitative tasks; qualitative tasks carry the `Percent` default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Count,
    Amount,
    Percent,
}

/// Progress state of a task or of one monthly activity snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    InProgress,
    Completed,
    Delayed,
    Stopped,
}

impl Metric {
    /// Total normalization over whatever label an upstream producer sends.
    /// The APIs feeding this dashboard emit Korean display labels and English
    /// codes interchangeably; unknown or missing input falls soft to
    /// `Percent` rather than erroring, to tolerate upstream label drift.
    pub fn normalize(raw: Option<&str>) -> Self {
        let label = match raw {
            Some(value) => value.trim(),
            None => return Metric::Percent,
        };
        match label {
            "count" | "cnt" | "CNT" | "COUNT" | "건수" | "횟수" | "건" => Metric::Count,
            "amount" | "amt" | "AMT" | "AMOUNT" | "금액" | "원" => Metric::Amount,
            "percent" | "pct" | "PCT" | "PERCENT" | "rate" | "비율" | "퍼센트" | "%" => {
                Metric::Percent
            }
            _ => Metric::Percent,
        }
    }

    /// Display unit suffix for actual/target values.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Count => "건",
            Metric::Amount => "원",
            Metric::Percent => "%",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Count => "건수",
            Metric::Amount => "금액",
            Metric::Percent => "비율",
        }
    }

    /// Percent entries are snapshots; count and amount entries accumulate
    /// across months.
    pub fn is_cumulative(&self) -> bool {
        matches!(self, Metric::Count | Metric::Amount)
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Percent
    }
}

impl TaskStatus {
    /// Total normalization; unknown labels default to `InProgress` and emit
    /// a diagnostic only, with no behavioral impact.
    pub fn normalize(raw: Option<&str>) -> Self {
        let label = match raw {
            Some(value) => value.trim(),
            None => return TaskStatus::InProgress,
        };
        match label {
            "inProgress" | "in_progress" | "progress" | "ING" | "진행중" | "진행" => {
                TaskStatus::InProgress
            }
            "completed" | "complete" | "done" | "END" | "완료" => TaskStatus::Completed,
            "delayed" | "delay" | "DELAY" | "지연" => TaskStatus::Delayed,
            "stopped" | "stop" | "STOP" | "중단" | "보류" => TaskStatus::Stopped,
            other => {
                warn!(target: "oiboard::normalize", label = %other, "unrecognized status label, defaulting to inProgress");
                TaskStatus::InProgress
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::InProgress => "inProgress",
            TaskStatus::Completed => "completed",
            TaskStatus::Delayed => "delayed",
            TaskStatus::Stopped => "stopped",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::InProgress
    }
}
