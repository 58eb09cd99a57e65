use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use oiboard_core::api::ActivityApi;
use oiboard_core::error::{AppError, AppResult};
use oiboard_core::models::activity::{
    ActivityForm, MonthKey, MonthlyActivityRecord, SaveReceipt, YearlyGoal,
};
use oiboard_core::models::metric::{Metric, TaskStatus};
use oiboard_core::models::task::{
    EvaluationType, PerformanceClass, TaskManager, TaskRecord,
};
use oiboard_core::services::ledger::{
    LedgerMode, LoadOutcome, MonthlyLedger, NavDirection, NavOutcome,
};

struct ScriptedApi {
    records: Mutex<HashMap<(i32, u32), MonthlyActivityRecord>>,
    goals: Mutex<Vec<YearlyGoal>>,
    fail_goals: AtomicBool,
    fail_save: AtomicBool,
    next_activity_id: Mutex<i64>,
}

impl ScriptedApi {
    fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            goals: Mutex::new(YearlyGoal::zeroed_year()),
            fail_goals: AtomicBool::new(false),
            fail_save: AtomicBool::new(false),
            next_activity_id: Mutex::new(0),
        }
    }

    fn put_record(
        &self,
        year: i32,
        month: u32,
        content: &str,
        actual: Option<f64>,
        activity_id: i64,
    ) {
        self.records.lock().unwrap().insert(
            (year, month),
            MonthlyActivityRecord {
                task_id: "task-77".into(),
                year,
                month,
                activity_content: Some(content.to_string()),
                actual_value: actual,
                status: TaskStatus::InProgress,
                activity_id: Some(activity_id),
                created_at: Some(Utc::now()),
                updated_at: Some(Utc::now()),
            },
        );
    }

    fn set_goal_actual(&self, month: u32, target: f64, actual: f64) {
        let mut goals = self.goals.lock().unwrap();
        if let Some(goal) = goals.iter_mut().find(|g| g.month == month) {
            goal.target_value = target;
            goal.actual_value = actual;
        }
    }
}

#[async_trait]
impl ActivityApi for ScriptedApi {
    async fn get_monthly_record(
        &self,
        _task_id: &str,
        year: i32,
        month: u32,
    ) -> AppResult<Option<MonthlyActivityRecord>> {
        Ok(self.records.lock().unwrap().get(&(year, month)).cloned())
    }

    async fn save_monthly_record(
        &self,
        task_id: &str,
        year: i32,
        month: u32,
        form: &ActivityForm,
    ) -> AppResult<SaveReceipt> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(AppError::persistence("server unavailable", None));
        }
        let activity_id = {
            let records = self.records.lock().unwrap();
            records.get(&(year, month)).and_then(|r| r.activity_id)
        };
        let activity_id = match activity_id {
            Some(id) => id,
            None => {
                let mut next = self.next_activity_id.lock().unwrap();
                *next += 1;
                *next + 1000
            }
        };
        let saved_at = Utc::now();
        self.records.lock().unwrap().insert(
            (year, month),
            MonthlyActivityRecord {
                task_id: task_id.to_string(),
                year,
                month,
                activity_content: Some(form.activity_content.clone()),
                actual_value: form.actual_value,
                status: form.status,
                activity_id: Some(activity_id),
                created_at: Some(saved_at),
                updated_at: Some(saved_at),
            },
        );
        Ok(SaveReceipt {
            activity_id,
            saved_at,
        })
    }

    async fn get_yearly_goals(&self, _task_id: &str, _year: i32) -> AppResult<Vec<YearlyGoal>> {
        if self.fail_goals.load(Ordering::SeqCst) {
            return Err(AppError::fetch("goals endpoint down", None));
        }
        Ok(self.goals.lock().unwrap().clone())
    }

    async fn get_previous_activities(
        &self,
        _task_id: &str,
        _limit: usize,
    ) -> AppResult<Vec<MonthlyActivityRecord>> {
        Ok(Vec::new())
    }
}

fn amount_task(target: f64) -> TaskRecord {
    TaskRecord {
        id: "task-77".into(),
        category: "OI".into(),
        sub_category: "원가 절감".into(),
        name: "구매비용 효율화".into(),
        description: Some("연간 구매비용 절감 활동".into()),
        start_date: Some("2026-01-01".into()),
        end_date: Some("2026-12-31".into()),
        status: TaskStatus::InProgress,
        performance_class: PerformanceClass::Financial,
        evaluation_type: EvaluationType::Quantitative,
        metric: Metric::Amount,
        target_value: target,
        reverse_yn: false,
        managers: vec![TaskManager {
            user_id: "kim.cs".into(),
            department: "구매팀".into(),
            top_department: "경영지원본부".into(),
        }],
    }
}

async fn open_november(api: Arc<ScriptedApi>, task: TaskRecord) -> MonthlyLedger {
    MonthlyLedger::open(api, task, "kim.cs", 2026, MonthKey::new(2026, 11), false)
        .await
        .expect("open ledger")
}

#[tokio::test]
async fn amount_task_end_to_end_scenario() {
    let api = Arc::new(ScriptedApi::new());
    // October saved: 300,000 of a 1,000,000 yearly target
    api.put_record(2026, 10, "10월 절감 활동", Some(300_000.0), 51);
    api.set_goal_actual(10, 0.0, 300_000.0);

    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;
    assert_eq!(ledger.mode(), LedgerMode::Editable);

    // user types November's 200,000
    ledger.form_mut().activity_content = "11월 절감 활동".into();
    ledger.form_mut().actual_value = Some(200_000.0);

    let model = ledger.read_model();
    assert_eq!(model.actual_value, 500_000.0);
    assert_eq!(model.achievement_rate, 50.0);

    // detour to October without saving November
    let outcome = ledger.select_month(NavDirection::Prev).await.unwrap();
    assert_eq!(outcome, NavOutcome::Moved);
    assert_eq!(ledger.form().activity_content, "10월 절감 활동");
    assert_eq!(ledger.form().actual_value, Some(300_000.0));

    // the unsaved November input is parked in the cache slot
    let cached = ledger.cached_entry(11).expect("november cache entry");
    assert_eq!(cached.actual_value, Some(200_000.0));
    assert!(cached.activity_id.is_none());

    // and restored on the way back
    ledger.select_month(NavDirection::Next).await.unwrap();
    assert_eq!(ledger.form().activity_content, "11월 절감 활동");
    assert_eq!(ledger.form().actual_value, Some(200_000.0));
}

#[tokio::test]
async fn unpersisted_draft_wins_over_server_record() {
    let api = Arc::new(ScriptedApi::new());
    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;

    ledger.form_mut().activity_content = "작성 중 초안".into();
    ledger.form_mut().actual_value = Some(5_000.0);
    ledger.select_month(NavDirection::Prev).await.unwrap();

    // someone persists a November record while the user looks at October
    api.put_record(2026, 11, "다른 사용자의 기록", Some(99_000.0), 42);

    ledger.select_month(NavDirection::Next).await.unwrap();

    // draft had no activityId yet, so it still shadows the server record
    assert_eq!(ledger.form().activity_content, "작성 중 초안");
    assert_eq!(ledger.form().actual_value, Some(5_000.0));
    assert_eq!(
        ledger.loaded_record().and_then(|r| r.activity_id),
        Some(42)
    );
}

#[tokio::test]
async fn newer_server_record_drops_stale_cache_entry() {
    let api = Arc::new(ScriptedApi::new());
    api.put_record(2026, 11, "원본 기록", Some(1_000.0), 42);

    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;
    assert_eq!(ledger.form().activity_content, "원본 기록");

    // edit the loaded record, then step away (cache entry carries id 42)
    ledger.form_mut().activity_content = "수정 중".into();
    ledger.select_month(NavDirection::Prev).await.unwrap();

    // another session replaces the record; the server now knows id 43
    api.put_record(2026, 11, "새로 저장된 기록", Some(2_000.0), 43);

    ledger.select_month(NavDirection::Next).await.unwrap();
    assert_eq!(ledger.form().activity_content, "새로 저장된 기록");
    assert!(ledger.cached_entry(11).is_none());
}

#[tokio::test]
async fn save_then_navigate_round_trip_keeps_saved_data() {
    let api = Arc::new(ScriptedApi::new());
    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;

    let form = ActivityForm {
        activity_content: "11월 실적 확정".into(),
        status: TaskStatus::InProgress,
        actual_value: Some(250_000.0),
        attachments: Vec::new(),
    };
    let receipt = ledger.save(form).await.expect("save");
    assert!(receipt.activity_id > 0);
    assert_eq!(
        ledger.loaded_record().and_then(|r| r.activity_id),
        Some(receipt.activity_id)
    );

    ledger.select_month(NavDirection::Prev).await.unwrap();
    ledger.select_month(NavDirection::Next).await.unwrap();

    assert_eq!(ledger.form().activity_content, "11월 실적 확정");
    assert_eq!(ledger.form().actual_value, Some(250_000.0));
}

#[tokio::test]
async fn save_rejects_empty_activity_text_before_any_network_call() {
    let api = Arc::new(ScriptedApi::new());
    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;

    let form = ActivityForm {
        activity_content: "   ".into(),
        ..Default::default()
    };
    let err = ledger.save(form).await.expect_err("must fail validation");
    assert!(matches!(err, AppError::Validation { .. }));
    assert!(api.records.lock().unwrap().get(&(2026, 11)).is_none());
}

#[tokio::test]
async fn save_failure_leaves_state_unchanged() {
    let api = Arc::new(ScriptedApi::new());
    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;
    api.fail_save.store(true, Ordering::SeqCst);

    let form = ActivityForm {
        activity_content: "저장 시도".into(),
        status: TaskStatus::InProgress,
        actual_value: Some(10_000.0),
        attachments: Vec::new(),
    };
    let err = ledger.save(form).await.expect_err("save must fail");
    assert!(matches!(err, AppError::Persistence { .. }));
    assert!(ledger.loaded_record().is_none());
    assert!(ledger.cached_entry(11).is_none());
}

#[tokio::test]
async fn backward_wrap_into_future_month_cannot_be_saved() {
    let api = Arc::new(ScriptedApi::new());
    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;

    // page back from November through January; the wrap lands on December,
    // a month that has not happened yet
    for _ in 0..11 {
        let outcome = ledger.select_month(NavDirection::Prev).await.unwrap();
        assert_eq!(outcome, NavOutcome::Moved);
    }
    assert_eq!(ledger.selected().month, 12);

    let form = ActivityForm {
        activity_content: "12월 실적".into(),
        status: TaskStatus::InProgress,
        actual_value: Some(1_000.0),
        attachments: Vec::new(),
    };
    let err = ledger
        .save(form)
        .await
        .expect_err("future month must reject writes");
    assert!(matches!(err, AppError::Validation { .. }));
    assert!(api.records.lock().unwrap().get(&(2026, 12)).is_none());
}

#[tokio::test]
async fn out_of_order_fetch_completion_is_discarded() {
    let api = Arc::new(ScriptedApi::new());
    api.put_record(2026, 10, "이전 기록", Some(3_000.0), 40);
    api.put_record(2026, 11, "최신 기록", Some(7_000.0), 70);

    let mut ledger = open_november(api.clone(), amount_task(1_000_000.0)).await;

    // two loads overlap: the first is still in flight when the second is
    // issued, and both responses arrive together
    let stale = ledger.begin_load();
    let current = ledger.begin_load();
    let (stale_fetch, current_fetch) = futures::join!(
        api.get_monthly_record("task-77", 2026, 10),
        api.get_monthly_record("task-77", 2026, 11)
    );

    assert_eq!(
        ledger.apply_load(current, current_fetch.unwrap(), None),
        LoadOutcome::Applied
    );
    assert_eq!(
        ledger.apply_load(stale, stale_fetch.unwrap(), None),
        LoadOutcome::Superseded
    );
    assert_eq!(ledger.form().activity_content, "최신 기록");
    assert_eq!(ledger.form().actual_value, Some(7_000.0));
}

#[tokio::test]
async fn read_only_session_rejects_save() {
    let api = Arc::new(ScriptedApi::new());
    let mut ledger = MonthlyLedger::open(
        api,
        amount_task(1_000_000.0),
        "kim.cs",
        2026,
        MonthKey::new(2026, 11),
        true,
    )
    .await
    .expect("open ledger");
    assert_eq!(ledger.mode(), LedgerMode::ReadOnly);

    let form = ActivityForm {
        activity_content: "읽기 전용".into(),
        ..Default::default()
    };
    assert!(matches!(
        ledger.save(form).await,
        Err(AppError::Validation { .. })
    ));
}

#[tokio::test]
async fn yearly_goal_failure_degrades_to_zeroed_year() {
    let api = Arc::new(ScriptedApi::new());
    api.fail_goals.store(true, Ordering::SeqCst);

    let ledger = open_november(api, amount_task(1_000_000.0)).await;
    let goals = ledger.yearly_goals();
    assert_eq!(goals.len(), 12);
    assert!(goals.iter().all(|g| g.actual_value == 0.0));
    // session stays usable
    assert_eq!(ledger.read_model().achievement_rate, 0.0);
}
