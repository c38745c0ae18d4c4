use std::collections::BTreeMap;

use super::engine::{project_plan, project_scenario};
use super::input::{FieldError, ScenarioUpdate, apply_update};
use super::types::{AccountKind, ScenarioLetter, ScenarioParameters, ScenarioProjection};

/// The twelve scenario parameter sets, one per account kind and letter.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanState {
    scenarios: [[ScenarioParameters; 3]; 4],
}

impl Default for PlanState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanState {
    pub fn new() -> Self {
        let scenarios = AccountKind::ALL.map(|account| {
            ScenarioLetter::ALL.map(|scenario| ScenarioParameters::defaults_for(account, scenario))
        });
        Self { scenarios }
    }

    pub fn get(&self, account: AccountKind, scenario: ScenarioLetter) -> &ScenarioParameters {
        &self.scenarios[account.index()][scenario.index()]
    }

    pub fn get_mut(
        &mut self,
        account: AccountKind,
        scenario: ScenarioLetter,
    ) -> &mut ScenarioParameters {
        &mut self.scenarios[account.index()][scenario.index()]
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (AccountKind, ScenarioLetter, &ScenarioParameters)> + '_ {
        AccountKind::ALL.into_iter().flat_map(move |account| {
            ScenarioLetter::ALL
                .into_iter()
                .map(move |scenario| (account, scenario, self.get(account, scenario)))
        })
    }

    /// Applies the valid parts of `update` and returns the rejected fields.
    pub fn apply_update(
        &mut self,
        account: AccountKind,
        scenario: ScenarioLetter,
        update: &ScenarioUpdate,
    ) -> Vec<FieldError> {
        let (next, errors) = apply_update(account, self.get(account, scenario), update);
        *self.get_mut(account, scenario) = next;
        errors
    }

    pub fn reset(&mut self, account: AccountKind, scenario: ScenarioLetter) {
        *self.get_mut(account, scenario) = ScenarioParameters::defaults_for(account, scenario);
    }

    pub fn reset_all(&mut self) {
        *self = Self::new();
    }

    pub fn project(&self, account: AccountKind, scenario: ScenarioLetter) -> ScenarioProjection {
        project_scenario(account, scenario, self.get(account, scenario))
    }

    pub fn project_all(&self) -> Vec<ScenarioProjection> {
        project_plan(self)
    }

    /// Monthly contribution per `<accountKey>_<letter>`.
    pub fn monthly_payments(&self) -> BTreeMap<String, f64> {
        self.iter()
            .map(|(account, scenario, params)| {
                (
                    monthly_payment_key(account, scenario),
                    params.monthly_contribution,
                )
            })
            .collect()
    }
}

pub fn monthly_payment_key(account: AccountKind, scenario: ScenarioLetter) -> String {
    format!("{}_{}", account.key(), scenario.key())
}

pub fn parse_monthly_payment_key(key: &str) -> Option<(AccountKind, ScenarioLetter)> {
    let (account, scenario) = key.rsplit_once('_')?;
    Some((AccountKind::from_key(account)?, ScenarioLetter::from_key(scenario)?))
}
