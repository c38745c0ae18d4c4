use serde::{Deserialize, Serialize};

use super::engine::round_to_cents;
use super::types::{AccountKind, MONTHLY_401K_LIMIT, MONTHLY_IRA_LIMIT};

/// Share of monthly after-tax income suggested for retirement saving.
pub const RECOMMENDED_SAVINGS_RATE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub monthly_after_tax_income: f64,
    pub roth_401k: f64,
    pub roth_ira: f64,
}

impl Recommendation {
    pub fn roth_401k_is_capped(&self) -> bool {
        self.roth_401k >= MONTHLY_401K_LIMIT
    }
}

/// Fills the Roth 401(k) up to its monthly cap before any money is suggested
/// for the Roth IRA.
pub fn recommend(monthly_after_tax_income: f64) -> Recommendation {
    if !monthly_after_tax_income.is_finite() || monthly_after_tax_income <= 0.0 {
        return Recommendation {
            monthly_after_tax_income: 0.0,
            roth_401k: 0.0,
            roth_ira: 0.0,
        };
    }

    let budget = monthly_after_tax_income * RECOMMENDED_SAVINGS_RATE;
    let roth_401k = round_to_cents(budget.min(MONTHLY_401K_LIMIT));
    let roth_ira = if roth_401k >= MONTHLY_401K_LIMIT {
        round_to_cents((budget - MONTHLY_401K_LIMIT).clamp(0.0, MONTHLY_IRA_LIMIT))
    } else {
        0.0
    };

    Recommendation {
        monthly_after_tax_income,
        roth_401k,
        roth_ira,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TopInputs {
    pub pre_tax_income: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SummaryCalculations {
    pub user_after_tax_income: f64,
    pub suggested_after_tax_income: f64,
}

/// Monthly amounts the learner entered in the budget module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetContributions {
    pub retirement_traditional_401k: f64,
    pub retirement_roth_401k: f64,
    pub retirement_traditional_ira: f64,
    pub retirement_roth_ira: f64,
}

impl BudgetContributions {
    pub fn for_account(&self, account: AccountKind) -> f64 {
        match account {
            AccountKind::Traditional401k => self.retirement_traditional_401k,
            AccountKind::Roth401k => self.retirement_roth_401k,
            AccountKind::TraditionalIra => self.retirement_traditional_ira,
            AccountKind::RothIra => self.retirement_roth_ira,
        }
    }
}

/// Read-only view of the budget module's figures. Incomes are annual.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BudgetContext {
    pub top_inputs: TopInputs,
    pub summary_calculations: SummaryCalculations,
    pub contributions: BudgetContributions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IncomeBasis {
    Suggested,
    User,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionGap {
    pub account: AccountKind,
    pub recommended: f64,
    pub budgeted: f64,
    pub shortfall: f64,
}

impl ContributionGap {
    fn new(account: AccountKind, recommended: f64, budgeted: f64) -> Self {
        Self {
            account,
            recommended,
            budgeted,
            shortfall: round_to_cents((recommended - budgeted).max(0.0)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecommendation {
    pub income_basis: IncomeBasis,
    pub pre_tax_income: f64,
    pub recommendation: Recommendation,
    pub gaps: Vec<ContributionGap>,
}

/// Recommends from the suggested after-tax income, falling back to the
/// learner's own after-tax income when no suggestion is available.
pub fn recommend_from_budget(budget: &BudgetContext) -> BudgetRecommendation {
    let summary = budget.summary_calculations;
    let (income_basis, annual_income) = if summary.suggested_after_tax_income > 0.0 {
        (IncomeBasis::Suggested, summary.suggested_after_tax_income)
    } else if summary.user_after_tax_income > 0.0 {
        (IncomeBasis::User, summary.user_after_tax_income)
    } else {
        (IncomeBasis::None, 0.0)
    };

    let recommendation = recommend(annual_income / 12.0);
    let gaps = vec![
        ContributionGap::new(
            AccountKind::Roth401k,
            recommendation.roth_401k,
            budget.contributions.for_account(AccountKind::Roth401k),
        ),
        ContributionGap::new(
            AccountKind::RothIra,
            recommendation.roth_ira,
            budget.contributions.for_account(AccountKind::RothIra),
        ),
    ];

    BudgetRecommendation {
        income_basis,
        pre_tax_income: budget.top_inputs.pre_tax_income,
        recommendation,
        gaps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    #[test]
    fn capped_401k_spills_remainder_into_ira() {
        let rec = recommend(50_000.0);
        assert_eq!(rec.roth_401k, 1_958.33);
        assert!(rec.roth_401k_is_capped());
        assert_eq!(rec.roth_ira, 541.67);
    }

    #[test]
    fn ira_recommendation_is_capped() {
        let rec = recommend(100_000.0);
        assert_eq!(rec.roth_401k, MONTHLY_401K_LIMIT);
        assert_eq!(rec.roth_ira, MONTHLY_IRA_LIMIT);
    }

    #[test]
    fn uncapped_401k_leaves_ira_at_zero() {
        let rec = recommend(6_000.0);
        assert_eq!(rec.roth_401k, 300.0);
        assert!(!rec.roth_401k_is_capped());
        assert_eq!(rec.roth_ira, 0.0);
    }

    #[test]
    fn non_positive_income_recommends_nothing() {
        for income in [0.0, -1_000.0, f64::NAN] {
            let rec = recommend(income);
            assert_eq!(rec.roth_401k, 0.0);
            assert_eq!(rec.roth_ira, 0.0);
        }
    }

    #[test]
    fn budget_prefers_suggested_income() {
        let budget: BudgetContext = serde_json::from_str(
            r#"{
              "topInputs": { "preTaxIncome": 90000 },
              "summaryCalculations": {
                "userAfterTaxIncome": 60000,
                "suggestedAfterTaxIncome": 72000
              },
              "contributions": { "retirement_roth_401k": 100 }
            }"#,
        )
        .expect("budget should parse");

        let result = recommend_from_budget(&budget);
        assert_eq!(result.income_basis, IncomeBasis::Suggested);
        assert_eq!(result.pre_tax_income, 90_000.0);
        assert_eq!(result.recommendation.monthly_after_tax_income, 6_000.0);
        assert_eq!(result.recommendation.roth_401k, 300.0);
        assert_eq!(result.gaps[0].account, AccountKind::Roth401k);
        assert_eq!(result.gaps[0].budgeted, 100.0);
        assert_eq!(result.gaps[0].shortfall, 200.0);
        assert_eq!(result.gaps[1].shortfall, 0.0);
    }

    #[test]
    fn budget_falls_back_to_user_income() {
        let budget = BudgetContext {
            summary_calculations: SummaryCalculations {
                user_after_tax_income: 48_000.0,
                suggested_after_tax_income: 0.0,
            },
            ..BudgetContext::default()
        };
        let result = recommend_from_budget(&budget);
        assert_eq!(result.income_basis, IncomeBasis::User);
        assert_eq!(result.recommendation.roth_401k, 200.0);
    }

    #[test]
    fn empty_budget_recommends_nothing() {
        let result = recommend_from_budget(&BudgetContext::default());
        assert_eq!(result.income_basis, IncomeBasis::None);
        assert_eq!(result.recommendation.roth_401k, 0.0);
        assert_eq!(result.recommendation.roth_ira, 0.0);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_ira_is_zero_unless_401k_is_capped(income_cents in 1u64..2_000_000_000) {
            let rec = recommend(income_cents as f64 / 100.0);
            prop_assert!(rec.roth_401k <= MONTHLY_401K_LIMIT);
            prop_assert!(rec.roth_ira <= MONTHLY_IRA_LIMIT);
            prop_assert!(rec.roth_ira >= 0.0);
            if !rec.roth_401k_is_capped() {
                prop_assert!(rec.roth_ira == 0.0);
            }
        }
    }
}
