use serde::{Deserialize, Serialize};

use crate::models::metric::{Metric, TaskStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PerformanceClass {
    Financial,
    NonFinancial,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EvaluationType {
    Quantitative,
    Qualitative,
}

/// An OI or key-focus task as delivered by the task-management API.
/// Read-mostly here: the ledger needs the metric semantics, target value,
/// reverse flag and the manager list; everything else is carried for the
/// rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub category: String,
    pub sub_category: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: TaskStatus,
    pub performance_class: PerformanceClass,
    pub evaluation_type: EvaluationType,
    /// Only meaningful when `evaluation_type` is quantitative.
    pub metric: Metric,
    /// 0 means "no target set".
    pub target_value: f64,
    /// Reverse scoring: achievement increases as actual falls below target.
    pub reverse_yn: bool,
    pub managers: Vec<TaskManager>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskManager {
    pub user_id: String,
    pub department: String,
    pub top_department: String,
}

impl TaskRecord {
    pub fn is_quantitative(&self) -> bool {
        self.evaluation_type == EvaluationType::Quantitative
    }

    pub fn is_managed_by(&self, user_id: &str) -> bool {
        self.managers.iter().any(|m| m.user_id == user_id)
    }
}
