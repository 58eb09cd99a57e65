use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::activity::{ActivityForm, MonthlyActivityRecord, SaveReceipt, YearlyGoal};

pub mod http;

pub use http::{ApiConfig, HttpActivityApi};

/// Abstract contract against the task-management API. Persistence is fully
/// delegated to the server; this crate only reconciles and computes.
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// `Ok(None)` means no entry exists yet for that month.
    async fn get_monthly_record(
        &self,
        task_id: &str,
        year: i32,
        month: u32,
    ) -> AppResult<Option<MonthlyActivityRecord>>;

    /// Creates the record on first save for a month, updates it afterwards.
    async fn save_monthly_record(
        &self,
        task_id: &str,
        year: i32,
        month: u32,
        form: &ActivityForm,
    ) -> AppResult<SaveReceipt>;

    async fn get_yearly_goals(&self, task_id: &str, year: i32) -> AppResult<Vec<YearlyGoal>>;

    /// Most-recent-first list of past entries for reference display.
    async fn get_previous_activities(
        &self,
        task_id: &str,
        limit: usize,
    ) -> AppResult<Vec<MonthlyActivityRecord>>;
}
