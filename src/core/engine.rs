use super::plan::PlanState;
use super::types::{
    AccountKind, AccountSummary, AccumulationRow, DISCOUNT_RATE, MAX_RETIREMENT_AGE, ScenarioLetter,
    ScenarioParameters, ScenarioProjection, WITHDRAWAL_HORIZON_AGE, WithdrawalRow,
};

/// Rounds to whole cents, half away from zero.
pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn present_value(future_value: f64, years_from_now: u32) -> f64 {
    present_value_at(future_value, years_from_now, DISCOUNT_RATE)
}

pub fn present_value_at(future_value: f64, years_from_now: u32, discount_rate: f64) -> f64 {
    let years = i32::try_from(years_from_now).unwrap_or(i32::MAX);
    (future_value / (1.0 + discount_rate).powi(years)).abs()
}

/// Year-by-year balances for a flat monthly contribution. The first year's
/// contribution is booked without growth; every later year compounds the
/// previous cents-rounded balance and then adds the contribution. Rows stop
/// at `MAX_RETIREMENT_AGE`.
pub fn simulate_accumulation(
    start_age: u32,
    end_age: u32,
    monthly_payment: f64,
    employer_match_pct: f64,
    return_rate_pct: f64,
) -> Vec<AccumulationRow> {
    let end_age = end_age.min(MAX_RETIREMENT_AGE);
    if end_age < start_age {
        return Vec::new();
    }

    let annual_contribution = monthly_payment * 12.0;
    let employer_match = annual_contribution * employer_match_pct / 100.0;
    let total_contribution = annual_contribution + employer_match;
    let growth = 1.0 + return_rate_pct / 100.0;

    let mut rows = Vec::with_capacity((end_age - start_age) as usize + 1);
    let mut balance = 0.0;
    for (offset, age) in (start_age..=end_age).enumerate() {
        balance = if offset == 0 {
            round_to_cents(total_contribution)
        } else {
            round_to_cents(balance * growth + total_contribution)
        };
        rows.push(AccumulationRow {
            age,
            year: offset as u32 + 1,
            annual_contribution,
            employer_match,
            total_contribution,
            balance,
        });
    }
    rows
}

pub fn simulate_withdrawals_to_horizon(
    opening_balance: f64,
    withdrawal_start_age: u32,
    withdrawal_rate_pct: f64,
    return_rate_pct: f64,
) -> Vec<WithdrawalRow> {
    simulate_withdrawals(
        opening_balance,
        withdrawal_start_age,
        withdrawal_rate_pct,
        return_rate_pct,
        WITHDRAWAL_HORIZON_AGE,
    )
}

/// Percentage drawdown from `withdrawal_start_age` through `max_age`.
///
/// The first year's withdrawal is not floored, so a negative opening balance
/// flows through as a negative withdrawal. Later withdrawals are floored at
/// zero. The run stops early only when the next balance is exactly `0.0`.
pub fn simulate_withdrawals(
    opening_balance: f64,
    withdrawal_start_age: u32,
    withdrawal_rate_pct: f64,
    return_rate_pct: f64,
    max_age: u32,
) -> Vec<WithdrawalRow> {
    let rate = withdrawal_rate_pct / 100.0;
    let growth = 1.0 + return_rate_pct / 100.0;

    let mut rows = Vec::new();
    let mut balance = round_to_cents(opening_balance);
    let mut year = 0_u32;
    for age in withdrawal_start_age..=max_age {
        let withdrawal = if year == 0 {
            round_to_cents(balance * rate)
        } else {
            round_to_cents((balance * rate).max(0.0))
        };
        rows.push(WithdrawalRow {
            age,
            year,
            starting_balance: balance,
            withdrawal,
        });

        let next_balance = round_to_cents((balance - withdrawal) * growth);
        if next_balance == 0.0 {
            break;
        }
        balance = next_balance;
        year += 1;
    }
    rows
}

/// Runs the accumulation then the withdrawal phase for one account x scenario.
pub fn project_scenario(
    account: AccountKind,
    scenario: ScenarioLetter,
    parameters: &ScenarioParameters,
) -> ScenarioProjection {
    let employer_match_pct = if account.accepts_employer_match() {
        parameters.employer_match_pct
    } else {
        0.0
    };

    let accumulation = simulate_accumulation(
        parameters.contribution_start_age,
        parameters.retirement_age,
        parameters.monthly_contribution,
        employer_match_pct,
        parameters.return_rate_pct,
    );
    let opening_balance = opening_balance_for(&accumulation, parameters.withdrawal_start_age);
    let withdrawals = simulate_withdrawals_to_horizon(
        opening_balance,
        parameters.withdrawal_start_age,
        parameters.withdrawal_rate_pct,
        parameters.return_rate_pct,
    );
    let summary = summarize(parameters, &accumulation, &withdrawals);

    ScenarioProjection {
        account,
        scenario,
        parameters: *parameters,
        accumulation,
        withdrawals,
        summary,
    }
}

/// All twelve projections, account-major then scenario letter.
pub fn project_plan(plan: &PlanState) -> Vec<ScenarioProjection> {
    plan.iter()
        .map(|(account, scenario, parameters)| project_scenario(account, scenario, parameters))
        .collect()
}

pub fn summarize(
    parameters: &ScenarioParameters,
    accumulation: &[AccumulationRow],
    withdrawals: &[WithdrawalRow],
) -> AccountSummary {
    let final_balance = accumulation.last().map(|row| row.balance).unwrap_or(0.0);
    let first_withdrawal = withdrawals.first().map(|row| row.withdrawal).unwrap_or(0.0);
    let years_to_retirement = parameters
        .retirement_age
        .saturating_sub(parameters.contribution_start_age);
    let years_to_first_withdrawal = parameters
        .withdrawal_start_age
        .saturating_sub(parameters.contribution_start_age);

    AccountSummary {
        final_balance,
        present_value_of_final_balance: round_to_cents(present_value(
            final_balance,
            years_to_retirement,
        )),
        first_withdrawal,
        present_value_of_first_withdrawal: round_to_cents(present_value(
            first_withdrawal,
            years_to_first_withdrawal,
        )),
    }
}

fn opening_balance_for(accumulation: &[AccumulationRow], withdrawal_start_age: u32) -> f64 {
    accumulation
        .iter()
        .find(|row| row.age == withdrawal_start_age)
        .or_else(|| accumulation.last())
        .map(|row| row.balance)
        .unwrap_or(0.0)
}
