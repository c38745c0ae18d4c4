use serde::{Deserialize, Serialize};

use super::types::{
    AccountKind, MAX_CONTRIBUTION_START_AGE, MAX_RETIREMENT_AGE, MAX_RETURN_RATE_PCT,
    MIN_CONTRIBUTION_START_AGE, MIN_WITHDRAWAL_START_AGE, ScenarioParameters,
};

/// A form value as it arrives from a client: either already numeric or the
/// raw text of a currency/percentage field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) if v.is_finite() => Some(*v),
            FieldValue::Number(_) => None,
            FieldValue::Text(text) => sanitize_numeric(text),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

/// Strips `$`, `,`, `%` and whitespace, then parses what is left.
pub fn sanitize_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioField {
    MonthlyContribution,
    EmployerMatchPct,
    ReturnRatePct,
    ContributionStartAge,
    RetirementAge,
    WithdrawalStartAge,
    WithdrawalRatePct,
}

impl ScenarioField {
    pub fn label(self) -> &'static str {
        match self {
            ScenarioField::MonthlyContribution => "Monthly contribution",
            ScenarioField::EmployerMatchPct => "Employer match",
            ScenarioField::ReturnRatePct => "Annual return rate",
            ScenarioField::ContributionStartAge => "Contribution start age",
            ScenarioField::RetirementAge => "Retirement age",
            ScenarioField::WithdrawalStartAge => "Withdrawal start age",
            ScenarioField::WithdrawalRatePct => "Withdrawal rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: ScenarioField,
    pub message: String,
}

impl FieldError {
    fn new(field: ScenarioField, message: String) -> Self {
        Self { field, message }
    }

    fn not_a_number(field: ScenarioField) -> Self {
        Self::new(field, format!("{} must be a number", field.label()))
    }

    fn out_of_range(field: ScenarioField, min: f64, max: f64) -> Self {
        Self::new(
            field,
            format!(
                "{} must be between {} and {}",
                field.label(),
                format_bound(min),
                format_bound(max)
            ),
        )
    }
}

/// Partial edit of one scenario. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScenarioUpdate {
    pub monthly_contribution: Option<FieldValue>,
    pub employer_match_pct: Option<FieldValue>,
    pub return_rate_pct: Option<FieldValue>,
    pub contribution_start_age: Option<FieldValue>,
    pub retirement_age: Option<FieldValue>,
    pub withdrawal_start_age: Option<FieldValue>,
    pub withdrawal_rate_pct: Option<FieldValue>,
}

impl ScenarioUpdate {
    pub fn is_empty(&self) -> bool {
        self.monthly_contribution.is_none()
            && self.employer_match_pct.is_none()
            && self.return_rate_pct.is_none()
            && self.contribution_start_age.is_none()
            && self.retirement_age.is_none()
            && self.withdrawal_start_age.is_none()
            && self.withdrawal_rate_pct.is_none()
    }
}

impl From<&ScenarioParameters> for ScenarioUpdate {
    fn from(params: &ScenarioParameters) -> Self {
        let number = |v: f64| Some(FieldValue::Number(v));
        Self {
            monthly_contribution: number(params.monthly_contribution),
            employer_match_pct: number(params.employer_match_pct),
            return_rate_pct: number(params.return_rate_pct),
            contribution_start_age: number(params.contribution_start_age as f64),
            retirement_age: number(params.retirement_age as f64),
            withdrawal_start_age: number(params.withdrawal_start_age as f64),
            withdrawal_rate_pct: number(params.withdrawal_rate_pct),
        }
    }
}

/// Checks a complete parameter set against the same rules as an edit.
pub fn validate(account: AccountKind, params: &ScenarioParameters) -> Vec<FieldError> {
    apply_update(account, params, &ScenarioUpdate::from(params)).1
}

/// Applies every valid field of `update` to a copy of `current`. Fields that
/// fail validation keep their current value and produce a `FieldError`.
pub fn apply_update(
    account: AccountKind,
    current: &ScenarioParameters,
    update: &ScenarioUpdate,
) -> (ScenarioParameters, Vec<FieldError>) {
    let mut next = *current;
    let mut errors = Vec::new();

    if let Some(value) = &update.monthly_contribution {
        let limit = account.monthly_contribution_limit();
        match checked_amount(ScenarioField::MonthlyContribution, value, 0.0, limit) {
            Ok(v) => next.monthly_contribution = v,
            Err(e) => errors.push(e),
        }
    }

    if let Some(value) = &update.employer_match_pct {
        if account.accepts_employer_match() {
            match checked_amount(ScenarioField::EmployerMatchPct, value, 0.0, 100.0) {
                Ok(v) => next.employer_match_pct = v,
                Err(e) => errors.push(e),
            }
        } else if value.as_number().is_some_and(|v| v != 0.0) {
            errors.push(FieldError::new(
                ScenarioField::EmployerMatchPct,
                format!("{} accounts do not accept an employer match", account.label()),
            ));
        }
    }

    if let Some(value) = &update.return_rate_pct {
        match checked_amount(ScenarioField::ReturnRatePct, value, 0.0, MAX_RETURN_RATE_PCT) {
            Ok(v) => next.return_rate_pct = v,
            Err(e) => errors.push(e),
        }
    }

    if let Some(value) = &update.withdrawal_rate_pct {
        match checked_amount(ScenarioField::WithdrawalRatePct, value, 0.0, 100.0) {
            Ok(v) => next.withdrawal_rate_pct = v,
            Err(e) => errors.push(e),
        }
    }

    let mut start_age = next.contribution_start_age;
    if let Some(value) = &update.contribution_start_age {
        match checked_age(
            ScenarioField::ContributionStartAge,
            value,
            MIN_CONTRIBUTION_START_AGE,
            MAX_CONTRIBUTION_START_AGE,
        ) {
            Ok(v) => start_age = v,
            Err(e) => errors.push(e),
        }
    }

    let mut retirement_age = next.retirement_age;
    if let Some(value) = &update.retirement_age {
        match checked_age(
            ScenarioField::RetirementAge,
            value,
            start_age.saturating_add(1),
            MAX_RETIREMENT_AGE,
        ) {
            Ok(v) => retirement_age = v,
            Err(e) => errors.push(e),
        }
    }

    // A valid retirement age is always above the candidate start age, so
    // this only fails for a start age at or past the current retirement age.
    if start_age < retirement_age {
        next.contribution_start_age = start_age;
        next.retirement_age = retirement_age;
    } else {
        errors.push(FieldError::out_of_range(
            ScenarioField::ContributionStartAge,
            MIN_CONTRIBUTION_START_AGE as f64,
            retirement_age.saturating_sub(1).min(MAX_CONTRIBUTION_START_AGE) as f64,
        ));
    }

    if let Some(value) = &update.withdrawal_start_age {
        match checked_age(
            ScenarioField::WithdrawalStartAge,
            value,
            MIN_WITHDRAWAL_START_AGE,
            account.required_distribution_age(),
        ) {
            Ok(v) => next.withdrawal_start_age = v,
            Err(e) => errors.push(e),
        }
    }

    (next, errors)
}

fn checked_amount(
    field: ScenarioField,
    value: &FieldValue,
    min: f64,
    max: f64,
) -> Result<f64, FieldError> {
    let Some(v) = value.as_number() else {
        return Err(FieldError::not_a_number(field));
    };
    if !(min..=max).contains(&v) {
        return Err(FieldError::out_of_range(field, min, max));
    }
    Ok(v)
}

fn checked_age(field: ScenarioField, value: &FieldValue, min: u32, max: u32) -> Result<u32, FieldError> {
    let Some(v) = value.as_number() else {
        return Err(FieldError::not_a_number(field));
    };
    if v.fract() != 0.0 {
        return Err(FieldError::new(
            field,
            format!("{} must be a whole number", field.label()),
        ));
    }
    if v < min as f64 || v > max as f64 {
        return Err(FieldError::out_of_range(field, min as f64, max as f64));
    }
    Ok(v as u32)
}

fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
