mod engine;
mod input;
mod plan;
mod recommend;
mod types;

pub use engine::{
    present_value, present_value_at, project_plan, project_scenario, round_to_cents,
    simulate_accumulation, simulate_withdrawals, simulate_withdrawals_to_horizon, summarize,
};
pub use input::{
    FieldError, FieldValue, ScenarioField, ScenarioUpdate, apply_update, sanitize_numeric,
    validate,
};
pub use plan::{PlanState, monthly_payment_key, parse_monthly_payment_key};
pub use recommend::{
    BudgetContext, BudgetContributions, BudgetRecommendation, ContributionGap, IncomeBasis,
    Recommendation, SummaryCalculations, TopInputs, recommend, recommend_from_budget,
};
pub use types::{
    AccountKind, AccountSummary, AccumulationRow, DISCOUNT_RATE, MONTHLY_401K_LIMIT,
    MONTHLY_IRA_LIMIT, REQUIRED_DISTRIBUTION_AGE, ScenarioLetter, ScenarioParameters,
    ScenarioProjection, WITHDRAWAL_HORIZON_AGE, WithdrawalRow,
};
