use axum::{
    Router,
    extract::{Json, Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::core::{
    AccountKind, AccountSummary, BudgetContext, FieldError, PlanState,
    Recommendation, ScenarioLetter, ScenarioProjection, ScenarioUpdate, recommend,
    recommend_from_budget, sanitize_numeric,
};
use crate::store::{FileStore, PersistedState, SaveScheduler, StateStore, load_plan};

mod cli;

pub use cli::{Cli, Command, ProjectArgs, ServeArgs, run_project};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub state_dir: PathBuf,
}

/// Shared server state. The plan lock is never held across an `.await`.
pub struct AppState {
    plan: Mutex<PlanState>,
    budget: Mutex<Option<BudgetContext>>,
    saver: SaveScheduler,
}

impl AppState {
    pub fn new(plan: PlanState, saver: SaveScheduler) -> Self {
        Self {
            plan: Mutex::new(plan),
            budget: Mutex::new(None),
            saver,
        }
    }

    /// Starts from the saved plan when one is readable, defaults otherwise.
    pub fn load(store: Arc<dyn StateStore>) -> Self {
        let plan = match load_plan(store.as_ref()) {
            Some(saved) => {
                info!(saved_at = %saved.timestamp, "restored saved retirement plan");
                saved.to_plan()
            }
            None => PlanState::new(),
        };
        Self::new(plan, SaveScheduler::new(store))
    }

    pub fn plan_snapshot(&self) -> PlanState {
        self.lock_plan().clone()
    }

    pub fn flush(&self) {
        let snapshot = PersistedState::capture(&self.lock_plan());
        if let Err(e) = self.saver.flush(&snapshot) {
            warn!(error = %e, "failed to save retirement plan on shutdown");
        }
    }

    fn lock_plan(&self) -> MutexGuard<'_, PlanState> {
        self.plan.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_budget(&self) -> MutexGuard<'_, Option<BudgetContext>> {
        self.budget.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mutates the plan and, when anything changed, schedules a debounced
    /// save. Scheduling happens under the plan lock so saves queue in edit
    /// order.
    fn edit_plan<T>(&self, edit: impl FnOnce(&mut PlanState) -> T) -> T {
        let mut plan = self.lock_plan();
        let before = plan.clone();
        let result = edit(&mut plan);
        if *plan != before {
            self.saver.schedule(PersistedState::capture(&plan));
        }
        result
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    projections: Vec<ScenarioProjection>,
    monthly_payments: BTreeMap<String, f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEntry {
    account: AccountKind,
    scenario: ScenarioLetter,
    summary: AccountSummary,
}

#[derive(Debug, Serialize)]
struct SummaryResponse {
    summaries: Vec<SummaryEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    projection: ScenarioProjection,
    field_errors: Vec<FieldError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PreviewQuery {
    monthly_income: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run_http_server(config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::new(config.bind, config.port);
    let store: Arc<dyn StateStore> = Arc::new(FileStore::new(&config.state_dir));
    let state = Arc::new(AppState::load(store));
    let app = router(Arc::clone(&state));

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, state_dir = %config.state_dir.display(), "retirement planner API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    state.flush();
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/plan", get(plan_handler))
        .route("/api/plan/summary", get(summary_handler))
        .route("/api/plan/reset", post(reset_all_handler))
        .route(
            "/api/plan/:account/:scenario",
            get(projection_handler).post(update_handler),
        )
        .route("/api/plan/:account/:scenario/reset", post(reset_handler))
        .route("/api/budget", get(budget_get_handler).put(budget_put_handler))
        .route("/api/recommendations", get(recommendations_handler))
        .route("/api/recommendations/preview", get(preview_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn plan_handler(State(state): State<Arc<AppState>>) -> Response {
    let plan = state.plan_snapshot();
    json_response(StatusCode::OK, build_plan_response(&plan))
}

async fn summary_handler(State(state): State<Arc<AppState>>) -> Response {
    let plan = state.plan_snapshot();
    json_response(StatusCode::OK, build_summary_response(&plan))
}

async fn projection_handler(
    State(state): State<Arc<AppState>>,
    Path((account, scenario)): Path<(String, String)>,
) -> Response {
    let (account, scenario) = match parse_target(&account, &scenario) {
        Ok(target) => target,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let parameters = *state.lock_plan().get(account, scenario);
    json_response(
        StatusCode::OK,
        crate::core::project_scenario(account, scenario, &parameters),
    )
}

async fn update_handler(
    State(state): State<Arc<AppState>>,
    Path((account, scenario)): Path<(String, String)>,
    update: Result<Json<ScenarioUpdate>, JsonRejection>,
) -> Response {
    let (account, scenario) = match parse_target(&account, &scenario) {
        Ok(target) => target,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let Json(update) = match update {
        Ok(update) => update,
        Err(rejection) => return rejection_response(rejection),
    };

    let (field_errors, parameters) = state.edit_plan(|plan| {
        let errors = plan.apply_update(account, scenario, &update);
        (errors, *plan.get(account, scenario))
    });
    if !field_errors.is_empty() {
        debug!(
            account = account.key(),
            scenario = scenario.key(),
            rejected = field_errors.len(),
            "scenario update had invalid fields"
        );
    }

    json_response(
        StatusCode::OK,
        UpdateResponse {
            projection: crate::core::project_scenario(account, scenario, &parameters),
            field_errors,
        },
    )
}

async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path((account, scenario)): Path<(String, String)>,
) -> Response {
    let (account, scenario) = match parse_target(&account, &scenario) {
        Ok(target) => target,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    let parameters = state.edit_plan(|plan| {
        plan.reset(account, scenario);
        *plan.get(account, scenario)
    });
    json_response(
        StatusCode::OK,
        crate::core::project_scenario(account, scenario, &parameters),
    )
}

async fn reset_all_handler(State(state): State<Arc<AppState>>) -> Response {
    let plan = state.edit_plan(|plan| {
        plan.reset_all();
        plan.clone()
    });
    json_response(StatusCode::OK, build_plan_response(&plan))
}

async fn budget_get_handler(State(state): State<Arc<AppState>>) -> Response {
    match *state.lock_budget() {
        Some(budget) => json_response(StatusCode::OK, budget),
        None => error_response(StatusCode::NOT_FOUND, "No budget figures have been provided"),
    }
}

async fn budget_put_handler(
    State(state): State<Arc<AppState>>,
    budget: Result<Json<BudgetContext>, JsonRejection>,
) -> Response {
    let Json(budget) = match budget {
        Ok(budget) => budget,
        Err(rejection) => return rejection_response(rejection),
    };
    *state.lock_budget() = Some(budget);
    json_response(StatusCode::OK, recommend_from_budget(&budget))
}

async fn recommendations_handler(State(state): State<Arc<AppState>>) -> Response {
    let budget = *state.lock_budget();
    match budget {
        Some(budget) => json_response(StatusCode::OK, recommend_from_budget(&budget)),
        None => error_response(StatusCode::NOT_FOUND, "No budget figures have been provided"),
    }
}

async fn preview_handler(Query(query): Query<PreviewQuery>) -> Response {
    match preview_recommendation(&query) {
        Ok(recommendation) => json_response(StatusCode::OK, recommendation),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

fn rejection_response(rejection: JsonRejection) -> Response {
    debug!(error = %rejection.body_text(), "rejected request body");
    error_response(StatusCode::BAD_REQUEST, &rejection.body_text())
}

fn parse_target(account: &str, scenario: &str) -> Result<(AccountKind, ScenarioLetter), String> {
    let account = AccountKind::from_key(account).ok_or_else(|| {
        format!(
            "unknown account '{account}'; expected one of traditional401k, roth401k, traditionalIra, rothIra"
        )
    })?;
    let scenario = ScenarioLetter::from_key(scenario)
        .ok_or_else(|| format!("unknown scenario '{scenario}'; expected A, B or C"))?;
    Ok((account, scenario))
}

fn preview_recommendation(query: &PreviewQuery) -> Result<Recommendation, String> {
    let raw = query
        .monthly_income
        .as_deref()
        .ok_or_else(|| "monthlyIncome is required".to_string())?;
    let income =
        sanitize_numeric(raw).ok_or_else(|| "monthlyIncome must be a number".to_string())?;
    Ok(recommend(income))
}

fn build_plan_response(plan: &PlanState) -> PlanResponse {
    PlanResponse {
        projections: plan.project_all(),
        monthly_payments: plan.monthly_payments(),
    }
}

fn build_summary_response(plan: &PlanState) -> SummaryResponse {
    SummaryResponse {
        summaries: plan
            .project_all()
            .into_iter()
            .map(|projection| SummaryEntry {
                account: projection.account,
                scenario: projection.scenario,
                summary: projection.summary,
            })
            .collect(),
    }
}
