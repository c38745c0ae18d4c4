//! Persistence of the retirement plan inputs.
//!
//! The whole plan is written as one JSON blob under [`STATE_KEY`]. Reads never
//! fail loudly: a missing, unreadable or malformed blob is treated as "no
//! saved data" and the caller keeps its defaults.

mod debounce;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::{
    AccountKind, PlanState, ScenarioLetter, ScenarioParameters, parse_monthly_payment_key,
    validate,
};

pub use debounce::{SAVE_DEBOUNCE, SaveScheduler};

pub const STATE_KEY: &str = "retirementPlanningData";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed for {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize plan state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string key/value store, the shape of browser local storage.
pub trait StateStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl StateStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, self.path_for(key)).map_err(io_err)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Snapshot of every scenario's inputs plus the monthly payment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub retirement_planning_inputs: BTreeMap<String, BTreeMap<String, ScenarioParameters>>,
    #[serde(default)]
    pub monthly_payments: BTreeMap<String, f64>,
    pub timestamp: DateTime<Utc>,
}

impl PersistedState {
    pub fn capture(plan: &PlanState) -> Self {
        Self::capture_at(plan, Utc::now())
    }

    pub fn capture_at(plan: &PlanState, timestamp: DateTime<Utc>) -> Self {
        let mut inputs: BTreeMap<String, BTreeMap<String, ScenarioParameters>> = BTreeMap::new();
        for (account, scenario, params) in plan.iter() {
            inputs
                .entry(account.key().to_string())
                .or_default()
                .insert(scenario.key().to_string(), *params);
        }
        Self {
            retirement_planning_inputs: inputs,
            monthly_payments: plan.monthly_payments(),
            timestamp,
        }
    }

    /// Copies every recognised scenario into `plan`, then applies the monthly
    /// payment fields on top. Unknown keys are skipped, and a scenario or
    /// payment that fails validation keeps its current value.
    pub fn restore_into(&self, plan: &mut PlanState) {
        for (account_key, scenarios) in &self.retirement_planning_inputs {
            let Some(account) = AccountKind::from_key(account_key) else {
                debug!(account = %account_key, "skipping unknown account in saved state");
                continue;
            };
            for (letter, params) in scenarios {
                let Some(scenario) = ScenarioLetter::from_key(letter) else {
                    debug!(scenario = %letter, "skipping unknown scenario in saved state");
                    continue;
                };
                let mut params = *params;
                if !account.accepts_employer_match() {
                    params.employer_match_pct = 0.0;
                }
                let errors = validate(account, &params);
                if let Some(first) = errors.first() {
                    warn!(
                        account = account.key(),
                        scenario = scenario.key(),
                        rejected = errors.len(),
                        reason = %first.message,
                        "ignoring invalid saved scenario"
                    );
                    continue;
                }
                *plan.get_mut(account, scenario) = params;
            }
        }

        for (key, amount) in &self.monthly_payments {
            let Some((account, scenario)) = parse_monthly_payment_key(key) else {
                continue;
            };
            if (0.0..=account.monthly_contribution_limit()).contains(amount) {
                plan.get_mut(account, scenario).monthly_contribution = *amount;
            } else {
                warn!(key = %key, amount, "ignoring out-of-range saved monthly payment");
            }
        }
    }

    pub fn to_plan(&self) -> PlanState {
        let mut plan = PlanState::new();
        self.restore_into(&mut plan);
        plan
    }
}

/// Returns the saved state, or `None` when nothing usable is stored.
pub fn load_plan(store: &dyn StateStore) -> Option<PersistedState> {
    let raw = match store.read(STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "failed to read saved retirement plan");
            return None;
        }
    };

    match serde_json::from_str::<PersistedState>(&raw) {
        Ok(state) => Some(state),
        Err(e) => {
            warn!(error = %e, "ignoring malformed saved retirement plan");
            None
        }
    }
}

pub fn save_plan(store: &dyn StateStore, plan: &PlanState) -> Result<(), StoreError> {
    save_snapshot(store, &PersistedState::capture(plan))
}

pub fn save_snapshot(store: &dyn StateStore, snapshot: &PersistedState) -> Result<(), StoreError> {
    let json = serde_json::to_string(snapshot)?;
    store.write(STATE_KEY, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FieldValue, ScenarioUpdate};
    use chrono::TimeZone;

    fn edited_plan() -> PlanState {
        let mut plan = PlanState::new();
        let update = ScenarioUpdate {
            monthly_contribution: Some(FieldValue::Number(1_250.0)),
            withdrawal_start_age: Some(FieldValue::Number(70.0)),
            ..ScenarioUpdate::default()
        };
        let errors = plan.apply_update(AccountKind::Traditional401k, ScenarioLetter::C, &update);
        assert!(errors.is_empty());
        plan
    }

    #[test]
    fn saved_plan_loads_back_identically() {
        let store = MemoryStore::new();
        let plan = edited_plan();
        save_plan(&store, &plan).expect("save should succeed");

        let loaded = load_plan(&store).expect("state should load");
        assert_eq!(loaded.to_plan(), plan);
    }

    #[test]
    fn persisted_json_uses_the_shared_shape() {
        let timestamp = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let snapshot = PersistedState::capture_at(&PlanState::new(), timestamp);
        let json = serde_json::to_value(&snapshot).expect("snapshot should serialize");

        assert_eq!(json["timestamp"], "2025-01-02T03:04:05Z");
        assert_eq!(json["monthlyPayments"]["roth401k_A"], 500.0);
        assert_eq!(
            json["retirementPlanningInputs"]["traditionalIra"]["B"]["withdrawalStartAge"],
            67
        );
    }

    #[test]
    fn missing_state_loads_as_none() {
        let store = MemoryStore::new();
        assert!(load_plan(&store).is_none());
    }

    #[test]
    fn malformed_state_loads_as_none() {
        let store = MemoryStore::new();
        store
            .write(STATE_KEY, "{ not json")
            .expect("memory write succeeds");
        assert!(load_plan(&store).is_none());
    }

    #[test]
    fn monthly_payments_override_saved_parameters() {
        let mut snapshot = PersistedState::capture(&PlanState::new());
        snapshot
            .monthly_payments
            .insert("rothIra_A".to_string(), 321.0);
        snapshot
            .monthly_payments
            .insert("unknown_A".to_string(), 999.0);

        let plan = snapshot.to_plan();
        assert_eq!(
            plan.get(AccountKind::RothIra, ScenarioLetter::A)
                .monthly_contribution,
            321.0
        );
    }

    #[test]
    fn partial_state_keeps_defaults_for_missing_scenarios() {
        let json = r#"{
          "retirementPlanningInputs": {
            "roth401k": {
              "B": {
                "monthlyContribution": 900,
                "employerMatchPct": 2,
                "returnRatePct": 6,
                "contributionStartAge": 30,
                "retirementAge": 60,
                "withdrawalStartAge": 62,
                "withdrawalRatePct": 3.5
              }
            },
            "hsa": {}
          },
          "timestamp": "2025-03-01T12:00:00Z"
        }"#;
        let snapshot: PersistedState = serde_json::from_str(json).expect("state should parse");
        let plan = snapshot.to_plan();

        let edited = plan.get(AccountKind::Roth401k, ScenarioLetter::B);
        assert_eq!(edited.monthly_contribution, 900.0);
        assert_eq!(edited.retirement_age, 60);
        assert_eq!(
            plan.get(AccountKind::Roth401k, ScenarioLetter::A),
            PlanState::new().get(AccountKind::Roth401k, ScenarioLetter::A)
        );
    }

    #[test]
    fn restored_iras_drop_employer_match() {
        let mut snapshot = PersistedState::capture(&PlanState::new());
        if let Some(params) = snapshot
            .retirement_planning_inputs
            .get_mut("rothIra")
            .and_then(|scenarios| scenarios.get_mut("A"))
        {
            params.employer_match_pct = 6.0;
        }
        let plan = snapshot.to_plan();
        assert_eq!(
            plan.get(AccountKind::RothIra, ScenarioLetter::A)
                .employer_match_pct,
            0.0
        );
    }

    #[test]
    fn file_store_round_trips_and_reports_missing_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = FileStore::new(dir.path().join("nested"));
        assert!(store.read(STATE_KEY).expect("read succeeds").is_none());

        let plan = edited_plan();
        save_plan(&store, &plan).expect("save should succeed");
        assert!(store.path_for(STATE_KEY).exists());

        let loaded = load_plan(&store).expect("state should load");
        assert_eq!(loaded.to_plan(), plan);
    }

    #[test]
    fn invalid_saved_scenarios_keep_their_defaults() {
        let json = r#"{
          "retirementPlanningInputs": {
            "traditional401k": {
              "A": {
                "monthlyContribution": -5000,
                "employerMatchPct": 900,
                "returnRatePct": 7,
                "contributionStartAge": 70,
                "retirementAge": 20,
                "withdrawalStartAge": 10,
                "withdrawalRatePct": 400
              },
              "B": {
                "monthlyContribution": 1200,
                "employerMatchPct": 4,
                "returnRatePct": 6,
                "contributionStartAge": 25,
                "retirementAge": 67,
                "withdrawalStartAge": 67,
                "withdrawalRatePct": 4
              }
            }
          },
          "timestamp": "2025-03-01T12:00:00Z"
        }"#;
        let store = MemoryStore::new();
        store.write(STATE_KEY, json).expect("memory write succeeds");

        let plan = load_plan(&store).expect("state should load").to_plan();
        let restored = plan.get(AccountKind::Traditional401k, ScenarioLetter::A);
        assert_eq!(restored, PlanState::new().get(AccountKind::Traditional401k, ScenarioLetter::A));
        assert!(restored.contribution_start_age < restored.retirement_age);
        assert_eq!(
            plan.get(AccountKind::Traditional401k, ScenarioLetter::B)
                .monthly_contribution,
            1_200.0
        );

        let projection = plan.project(AccountKind::Traditional401k, ScenarioLetter::A);
        assert!(!projection.accumulation.is_empty());
        assert_eq!(
            projection.withdrawals.first().map(|row| row.age),
            Some(restored.withdrawal_start_age)
        );
    }

    #[test]
    fn out_of_range_monthly_payments_are_ignored() {
        let mut snapshot = PersistedState::capture(&PlanState::new());
        snapshot
            .monthly_payments
            .insert("rothIra_B".to_string(), 5_000.0);
        snapshot
            .monthly_payments
            .insert("roth401k_C".to_string(), -1.0);

        let plan = snapshot.to_plan();
        let defaults = PlanState::new();
        assert_eq!(
            plan.get(AccountKind::RothIra, ScenarioLetter::B),
            defaults.get(AccountKind::RothIra, ScenarioLetter::B)
        );
        assert_eq!(
            plan.get(AccountKind::Roth401k, ScenarioLetter::C),
            defaults.get(AccountKind::Roth401k, ScenarioLetter::C)
        );
    }
}
