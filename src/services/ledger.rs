use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::ActivityApi;
use crate::error::{AppError, AppResult};
use crate::models::activity::{
    ActivityForm, MonthKey, MonthlyActivityRecord, SaveReceipt, YearlyGoal,
};
use crate::models::metric::Metric;
use crate::models::task::TaskRecord;
use crate::services::achievement::{
    color_for_achievement, AchievementCalculator, MonthActual, Rgb,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerMode {
    Editable,
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerPhase {
    Loading,
    Ready,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Prev,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved,
    /// Forward navigation past the real-world current month, refused in
    /// editable mode. You cannot log activity for a month that has not
    /// happened.
    Blocked,
}

/// Result of applying a completed fetch against the session's request token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer navigation superseded this fetch while it was in flight; its
    /// result was discarded (last navigation wins).
    Superseded,
}

/// Unsaved form state shadowing one month slot. Server data wins over a
/// cached entry only when their `activity_id`s differ, meaning something
/// else persisted a newer record for that month.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedEntry {
    pub activity_content: String,
    pub status: crate::models::metric::TaskStatus,
    pub actual_value: Option<f64>,
    pub activity_id: Option<i64>,
}

/// Ticket handed out by `begin_load`; `apply_load` honors it only while it
/// is still the newest one.
#[derive(Debug, Clone, Copy)]
pub struct LoadTicket {
    token: u64,
    key: MonthKey,
}

/// Everything the rendering layer consumes, recomputed after every state
/// transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadModel {
    pub actual_value: f64,
    pub achievement_rate: f64,
    pub color: Rgb,
    pub can_navigate_forward: bool,
    pub selected_month: MonthKey,
    pub is_editable: bool,
}

/// One open task-editing session: which month is displayed, the server
/// truth last fetched for it, and the cache of unsaved edits that survives
/// month navigation. Scoped to a single task year; discarded wholesale on
/// close, never shared across sessions.
pub struct MonthlyLedger {
    api: Arc<dyn ActivityApi>,
    calculator: AchievementCalculator,
    task: TaskRecord,
    mode: LedgerMode,
    phase: LedgerPhase,
    year: i32,
    selected_month: u32,
    /// Injected reference "now"; never read from a global clock so the
    /// forward-navigation block is deterministic under test.
    today: MonthKey,
    cache: HashMap<MonthKey, CachedEntry>,
    loaded_record: Option<MonthlyActivityRecord>,
    form: ActivityForm,
    goals: Vec<YearlyGoal>,
    previous_activities: Vec<MonthlyActivityRecord>,
    /// Actual value the previously displayed month resolved to, for the
    /// percent-metric continuity default. Forward-chaining only.
    last_resolved: Option<(u32, f64)>,
    load_seq: u64,
}

impl MonthlyLedger {
    /// Opens an editing session for `task` in `year`. Editable iff the
    /// acting user is one of the task's managers and the caller did not
    /// force read-only. Yearly goals and the previous-activity list degrade
    /// silently on fetch failure; the initial month load runs before this
    /// returns.
    pub async fn open(
        api: Arc<dyn ActivityApi>,
        task: TaskRecord,
        acting_user_id: &str,
        year: i32,
        today: MonthKey,
        force_read_only: bool,
    ) -> AppResult<Self> {
        let mode = if !force_read_only && task.is_managed_by(acting_user_id) {
            LedgerMode::Editable
        } else {
            LedgerMode::ReadOnly
        };

        let selected_month = if year == today.year { today.month } else { 12 };

        let goals = match api.get_yearly_goals(&task.id, year).await {
            Ok(goals) if goals.len() == 12 => goals,
            Ok(goals) => {
                warn!(
                    target: "oiboard::ledger",
                    task_id = %task.id,
                    months = goals.len(),
                    "yearly goals came back incomplete, substituting zeroed year"
                );
                YearlyGoal::zeroed_year()
            }
            Err(err) => {
                warn!(
                    target: "oiboard::ledger",
                    task_id = %task.id,
                    error = %err,
                    "yearly goals fetch failed, substituting zeroed year"
                );
                YearlyGoal::zeroed_year()
            }
        };

        let previous_activities = match api.get_previous_activities(&task.id, 5).await {
            Ok(list) => list,
            Err(err) => {
                warn!(
                    target: "oiboard::ledger",
                    task_id = %task.id,
                    error = %err,
                    "previous activities fetch failed, showing none"
                );
                Vec::new()
            }
        };

        let mut ledger = Self {
            api,
            calculator: AchievementCalculator::default(),
            task,
            mode,
            phase: LedgerPhase::Loading,
            year,
            selected_month,
            today,
            cache: HashMap::new(),
            loaded_record: None,
            form: ActivityForm::default(),
            goals,
            previous_activities,
            last_resolved: None,
            load_seq: 0,
        };

        ledger.load_month().await?;
        Ok(ledger)
    }

    pub fn mode(&self) -> LedgerMode {
        self.mode
    }

    pub fn phase(&self) -> LedgerPhase {
        self.phase
    }

    pub fn selected(&self) -> MonthKey {
        MonthKey::new(self.year, self.selected_month)
    }

    pub fn form(&self) -> &ActivityForm {
        &self.form
    }

    /// The UI edits through here; there is exactly one authoritative copy of
    /// the in-progress form.
    pub fn form_mut(&mut self) -> &mut ActivityForm {
        &mut self.form
    }

    pub fn loaded_record(&self) -> Option<&MonthlyActivityRecord> {
        self.loaded_record.as_ref()
    }

    pub fn yearly_goals(&self) -> &[YearlyGoal] {
        &self.goals
    }

    pub fn previous_activities(&self) -> &[MonthlyActivityRecord] {
        &self.previous_activities
    }

    pub fn cached_entry(&self, month: u32) -> Option<&CachedEntry> {
        self.cache.get(&MonthKey::new(self.year, month))
    }

    fn can_navigate_forward(&self) -> bool {
        match self.mode {
            LedgerMode::ReadOnly => true,
            LedgerMode::Editable => {
                !(self.year == self.today.year && self.selected_month == self.today.month)
            }
        }
    }

    /// A month the injected "today" has not reached yet. The backward wrap
    /// may display such a month, but nothing can be written to it.
    fn is_future_month(&self) -> bool {
        self.year > self.today.year
            || (self.year == self.today.year && self.selected_month > self.today.month)
    }

    /// Moves the displayed month by one and loads it. In editable mode the
    /// in-memory form is snapshotted into the edit cache first, so unsaved
    /// input survives the detour; forward navigation past the injected
    /// "today" is refused as a no-op.
    pub async fn select_month(&mut self, direction: NavDirection) -> AppResult<NavOutcome> {
        if self.phase == LedgerPhase::Closed {
            return Err(AppError::validation("session is closed"));
        }

        if direction == NavDirection::Next && !self.can_navigate_forward() {
            debug!(
                target: "oiboard::ledger",
                month = self.selected_month,
                "forward navigation blocked at current month"
            );
            return Ok(NavOutcome::Blocked);
        }

        if self.mode == LedgerMode::Editable {
            self.snapshot_form();
        }

        self.selected_month = match direction {
            NavDirection::Prev => self.selected().prev_slot().month,
            NavDirection::Next => self.selected().next_slot().month,
        };

        self.load_month().await?;
        Ok(NavOutcome::Moved)
    }

    fn snapshot_form(&mut self) {
        let entry = CachedEntry {
            activity_content: self.form.activity_content.clone(),
            status: self.form.status,
            actual_value: self.form.actual_value,
            activity_id: self.loaded_record.as_ref().and_then(|r| r.activity_id),
        };
        self.cache.insert(self.selected(), entry);
    }

    /// Stamps a new request token and flips the session into `Loading`.
    /// Any fetch still in flight for an older token will be discarded when
    /// its result arrives.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.phase = LedgerPhase::Loading;
        self.load_seq += 1;
        LoadTicket {
            token: self.load_seq,
            key: self.selected(),
        }
    }

    /// Reconciles a completed fetch into the session, unless a newer load
    /// superseded it. Precedence: a cached entry wins while its
    /// `activity_id` is unset or matches the server's; a differing server
    /// `activity_id` means someone else persisted a newer record, so the
    /// server wins and the stale cache entry is dropped. With neither
    /// present, defaults are synthesized: percent carries the previous
    /// month's value forward (`chained_prev_actual`), count and amount
    /// start each month at zero.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        fetched: Option<MonthlyActivityRecord>,
        chained_prev_actual: Option<f64>,
    ) -> LoadOutcome {
        if ticket.token != self.load_seq {
            debug!(
                target: "oiboard::ledger",
                stale_token = ticket.token,
                current_token = self.load_seq,
                month = %ticket.key,
                "discarding out-of-order load result"
            );
            return LoadOutcome::Superseded;
        }

        let cached = self.cache.get(&ticket.key).cloned();

        match (cached, fetched) {
            (Some(entry), fetched) => {
                let server_id = fetched.as_ref().and_then(|r| r.activity_id);
                match fetched {
                    Some(record)
                        if entry.activity_id.is_some() && entry.activity_id != server_id =>
                    {
                        debug!(
                            target: "oiboard::ledger",
                            month = %ticket.key,
                            "server record superseded cached draft, dropping cache entry"
                        );
                        self.cache.remove(&ticket.key);
                        self.form = form_from_record(&record);
                        self.loaded_record = Some(record);
                    }
                    fetched => {
                        self.form = ActivityForm {
                            activity_content: entry.activity_content,
                            status: entry.status,
                            actual_value: entry.actual_value,
                            attachments: Vec::new(),
                        };
                        self.loaded_record = fetched;
                    }
                }
            }
            (None, Some(record)) => {
                self.form = form_from_record(&record);
                self.loaded_record = Some(record);
            }
            (None, None) => {
                let default_actual = match self.task.metric {
                    // percent is a snapshot, so a fresh month starts from
                    // wherever it last was
                    Metric::Percent => Some(chained_prev_actual.unwrap_or(0.0)),
                    Metric::Count | Metric::Amount => Some(0.0),
                };
                self.form = ActivityForm {
                    activity_content: String::new(),
                    status: self.task.status,
                    actual_value: default_actual,
                    attachments: Vec::new(),
                };
                self.loaded_record = None;
            }
        }

        self.last_resolved = Some((
            ticket.key.month,
            self.form.actual_value.unwrap_or(0.0),
        ));
        self.phase = LedgerPhase::Ready;
        LoadOutcome::Applied
    }

    /// Fetches the selected month and reconciles it. A failed fetch is not
    /// surfaced: it degrades to the same default-synthesis path as an
    /// absent record, keeping the session usable.
    pub async fn load_month(&mut self) -> AppResult<LoadOutcome> {
        let ticket = self.begin_load();

        let fetched = match self
            .api
            .get_monthly_record(&self.task.id, ticket.key.year, ticket.key.month)
            .await
        {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    target: "oiboard::ledger",
                    month = %ticket.key,
                    error = %err,
                    "month fetch failed, degrading to defaults"
                );
                None
            }
        };

        let chained = if fetched.is_none()
            && !self.cache.contains_key(&ticket.key)
            && self.task.metric == Metric::Percent
        {
            self.chained_prev_actual(ticket.key).await
        } else {
            None
        };

        Ok(self.apply_load(ticket, fetched, chained))
    }

    /// Continuity source for the percent default: the value the immediately
    /// preceding month resolved to in this session, falling back to that
    /// month's persisted record. Forward-chaining only; paging backward
    /// does not rewrite months already shown.
    async fn chained_prev_actual(&self, key: MonthKey) -> Option<f64> {
        let prev_month = key.prev_slot().month;

        if let Some((month, actual)) = self.last_resolved {
            if month == prev_month {
                return Some(actual);
            }
        }

        self.api
            .get_monthly_record(&self.task.id, key.year, prev_month)
            .await
            .ok()
            .flatten()
            .and_then(|record| record.actual_value)
    }

    /// Persists the current month's form. Validation is fully local and
    /// happens before any network call; a transport failure leaves every
    /// piece of session state untouched and is never retried here. Months
    /// after the injected "today" reject the save outright, even though the
    /// backward wrap can display them.
    pub async fn save(&mut self, form: ActivityForm) -> AppResult<SaveReceipt> {
        if self.mode != LedgerMode::Editable {
            return Err(AppError::validation("session is read-only"));
        }
        if self.is_future_month() {
            return Err(AppError::validation(
                "cannot log activity for a month that has not happened",
            ));
        }
        if form.activity_content.trim().is_empty() {
            return Err(AppError::validation("activity content must not be empty"));
        }

        let mut submitted = form;
        if !self.task.is_quantitative() {
            submitted.actual_value = None;
        }

        let key = self.selected();
        let receipt = self
            .api
            .save_monthly_record(&self.task.id, key.year, key.month, &submitted)
            .await?;

        let record = MonthlyActivityRecord {
            task_id: self.task.id.clone(),
            year: key.year,
            month: key.month,
            activity_content: Some(submitted.activity_content.clone()),
            actual_value: submitted.actual_value,
            status: submitted.status,
            activity_id: Some(receipt.activity_id),
            created_at: self
                .loaded_record
                .as_ref()
                .and_then(|r| r.created_at)
                .or(Some(receipt.saved_at)),
            updated_at: Some(receipt.saved_at),
        };

        // refresh the cache slot with the persisted values so navigating
        // away and back shows saved data, not a stale draft
        self.cache.insert(
            key,
            CachedEntry {
                activity_content: submitted.activity_content.clone(),
                status: submitted.status,
                actual_value: submitted.actual_value,
                activity_id: Some(receipt.activity_id),
            },
        );
        self.last_resolved = Some((key.month, submitted.actual_value.unwrap_or(0.0)));
        self.loaded_record = Some(record);
        self.form = submitted;

        if let Ok(goals) = self.api.get_yearly_goals(&self.task.id, self.year).await {
            if goals.len() == 12 {
                self.goals = goals;
            }
        }

        Ok(receipt)
    }

    /// Read model for the rendering layer. Other-month actuals come from
    /// the server-apportioned yearly goal set, with the month under edit
    /// excluded so the live input supersedes its recorded value.
    pub fn read_model(&self) -> ReadModel {
        let others: Vec<MonthActual> = self
            .goals
            .iter()
            .filter(|g| g.month != self.selected_month)
            .map(|g| MonthActual {
                month: g.month,
                actual_value: g.actual_value,
            })
            .collect();

        let outcome = self.calculator.evaluate(
            self.task.metric,
            self.task.target_value,
            self.form.actual_value,
            &others,
            self.task.reverse_yn,
        );

        ReadModel {
            actual_value: outcome.actual_value,
            achievement_rate: outcome.achievement_rate,
            color: color_for_achievement(outcome.achievement_rate),
            can_navigate_forward: self.can_navigate_forward(),
            selected_month: self.selected(),
            is_editable: self.mode == LedgerMode::Editable,
        }
    }

    /// Session teardown: the edit cache and all loaded state never outlive
    /// one open session.
    pub fn close(&mut self) {
        self.cache.clear();
        self.loaded_record = None;
        self.form = ActivityForm::default();
        self.goals.clear();
        self.previous_activities.clear();
        self.last_resolved = None;
        self.phase = LedgerPhase::Closed;
    }
}

fn form_from_record(record: &MonthlyActivityRecord) -> ActivityForm {
    ActivityForm {
        activity_content: record.activity_content.clone().unwrap_or_default(),
        status: record.status,
        actual_value: record.actual_value,
        attachments: Vec::new(),
    }
}
