use serde::{Deserialize, Serialize};

/// Annual discount rate used for every present-value figure.
pub const DISCOUNT_RATE: f64 = 0.035;
/// Last age simulated in the withdrawal phase.
pub const WITHDRAWAL_HORIZON_AGE: u32 = 109;
/// Latest permissible withdrawal start age for every account kind.
pub const REQUIRED_DISTRIBUTION_AGE: u32 = 75;
pub const MIN_WITHDRAWAL_START_AGE: u32 = 31;
pub const MIN_CONTRIBUTION_START_AGE: u32 = 18;
pub const MAX_CONTRIBUTION_START_AGE: u32 = 74;
pub const MAX_RETIREMENT_AGE: u32 = 100;
pub const MAX_RETURN_RATE_PCT: f64 = 20.0;

pub const ANNUAL_401K_LIMIT: f64 = 23_500.0;
pub const ANNUAL_IRA_LIMIT: f64 = 7_000.0;
pub const MONTHLY_401K_LIMIT: f64 = 1_958.33;
pub const MONTHLY_IRA_LIMIT: f64 = 583.33;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccountKind {
    #[serde(alias = "traditional-401k", alias = "traditional_401k")]
    Traditional401k,
    #[serde(alias = "roth-401k", alias = "roth_401k")]
    Roth401k,
    #[serde(alias = "traditional-ira", alias = "traditional_ira")]
    TraditionalIra,
    #[serde(alias = "roth-ira", alias = "roth_ira")]
    RothIra,
}

impl AccountKind {
    pub const ALL: [AccountKind; 4] = [
        AccountKind::Traditional401k,
        AccountKind::Roth401k,
        AccountKind::TraditionalIra,
        AccountKind::RothIra,
    ];

    pub fn key(self) -> &'static str {
        match self {
            AccountKind::Traditional401k => "traditional401k",
            AccountKind::Roth401k => "roth401k",
            AccountKind::TraditionalIra => "traditionalIra",
            AccountKind::RothIra => "rothIra",
        }
    }

    /// Accepts the camelCase key as well as kebab and snake spellings.
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized = key.to_ascii_lowercase().replace(['-', '_'], "");
        match normalized.as_str() {
            "traditional401k" => Some(AccountKind::Traditional401k),
            "roth401k" => Some(AccountKind::Roth401k),
            "traditionalira" => Some(AccountKind::TraditionalIra),
            "rothira" => Some(AccountKind::RothIra),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccountKind::Traditional401k => "Traditional 401(k)",
            AccountKind::Roth401k => "Roth 401(k)",
            AccountKind::TraditionalIra => "Traditional IRA",
            AccountKind::RothIra => "Roth IRA",
        }
    }

    pub fn accepts_employer_match(self) -> bool {
        matches!(self, AccountKind::Traditional401k | AccountKind::Roth401k)
    }

    pub fn monthly_contribution_limit(self) -> f64 {
        if self.accepts_employer_match() {
            MONTHLY_401K_LIMIT
        } else {
            MONTHLY_IRA_LIMIT
        }
    }

    pub fn required_distribution_age(self) -> u32 {
        REQUIRED_DISTRIBUTION_AGE
    }

    pub(crate) fn index(self) -> usize {
        match self {
            AccountKind::Traditional401k => 0,
            AccountKind::Roth401k => 1,
            AccountKind::TraditionalIra => 2,
            AccountKind::RothIra => 3,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum ScenarioLetter {
    #[serde(alias = "a")]
    A,
    #[serde(alias = "b")]
    B,
    #[serde(alias = "c")]
    C,
}

impl ScenarioLetter {
    pub const ALL: [ScenarioLetter; 3] = [ScenarioLetter::A, ScenarioLetter::B, ScenarioLetter::C];

    pub fn key(self) -> &'static str {
        match self {
            ScenarioLetter::A => "A",
            ScenarioLetter::B => "B",
            ScenarioLetter::C => "C",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "A" | "a" => Some(ScenarioLetter::A),
            "B" | "b" => Some(ScenarioLetter::B),
            "C" | "c" => Some(ScenarioLetter::C),
            _ => None,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            ScenarioLetter::A => 0,
            ScenarioLetter::B => 1,
            ScenarioLetter::C => 2,
        }
    }
}

/// Inputs for one account x scenario projection. Percentages are in percent
/// units, so `7.0` means 7%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioParameters {
    pub monthly_contribution: f64,
    pub employer_match_pct: f64,
    pub return_rate_pct: f64,
    pub contribution_start_age: u32,
    pub retirement_age: u32,
    pub withdrawal_start_age: u32,
    pub withdrawal_rate_pct: f64,
}

impl ScenarioParameters {
    pub fn defaults_for(account: AccountKind, scenario: ScenarioLetter) -> Self {
        let is_401k = account.accepts_employer_match();
        let (start, retire, withdraw_at, return_rate, withdrawal_rate) = match scenario {
            ScenarioLetter::A => (22, 65, 65, 7.0, 4.0),
            ScenarioLetter::B => (25, 67, 67, 6.0, 4.0),
            ScenarioLetter::C => (30, 70, 72, 5.0, 5.0),
        };
        let (monthly_401k, monthly_ira, match_pct) = match scenario {
            ScenarioLetter::A => (500.0, 250.0, 3.0),
            ScenarioLetter::B => (750.0, 400.0, 4.0),
            ScenarioLetter::C => (1_000.0, MONTHLY_IRA_LIMIT, 5.0),
        };

        Self {
            monthly_contribution: if is_401k { monthly_401k } else { monthly_ira },
            employer_match_pct: if is_401k { match_pct } else { 0.0 },
            return_rate_pct: return_rate,
            contribution_start_age: start,
            retirement_age: retire,
            withdrawal_start_age: withdraw_at,
            withdrawal_rate_pct: withdrawal_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationRow {
    pub age: u32,
    pub year: u32,
    pub annual_contribution: f64,
    pub employer_match: f64,
    pub total_contribution: f64,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRow {
    pub age: u32,
    pub year: u32,
    pub starting_balance: f64,
    pub withdrawal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub final_balance: f64,
    pub present_value_of_final_balance: f64,
    pub first_withdrawal: f64,
    pub present_value_of_first_withdrawal: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProjection {
    pub account: AccountKind,
    pub scenario: ScenarioLetter,
    pub parameters: ScenarioParameters,
    pub accumulation: Vec<AccumulationRow>,
    pub withdrawals: Vec<WithdrawalRow>,
    pub summary: AccountSummary,
}
