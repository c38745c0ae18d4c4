use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;

use super::ServerConfig;
use crate::core::{
    AccountKind, FieldError, FieldValue, PlanState, ScenarioLetter, ScenarioProjection,
    ScenarioUpdate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliAccountKind {
    #[value(name = "traditional-401k", alias = "traditional401k")]
    Traditional401k,
    #[value(name = "roth-401k", alias = "roth401k")]
    Roth401k,
    #[value(name = "traditional-ira", alias = "traditionalIra")]
    TraditionalIra,
    #[value(name = "roth-ira", alias = "rothIra")]
    RothIra,
}

impl From<CliAccountKind> for AccountKind {
    fn from(value: CliAccountKind) -> Self {
        match value {
            CliAccountKind::Traditional401k => AccountKind::Traditional401k,
            CliAccountKind::Roth401k => AccountKind::Roth401k,
            CliAccountKind::TraditionalIra => AccountKind::TraditionalIra,
            CliAccountKind::RothIra => AccountKind::RothIra,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliScenario {
    #[value(name = "a", alias = "A")]
    A,
    #[value(name = "b", alias = "B")]
    B,
    #[value(name = "c", alias = "C")]
    C,
}

impl From<CliScenario> for ScenarioLetter {
    fn from(value: CliScenario) -> Self {
        match value {
            CliScenario::A => ScenarioLetter::A,
            CliScenario::B => ScenarioLetter::B,
            CliScenario::C => ScenarioLetter::C,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "retire",
    about = "Retirement account projections: 401(k)/IRA accumulation, withdrawals and present values"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over a persisted plan
    Serve(ServeArgs),
    /// Print one account/scenario projection as JSON
    Project(ProjectArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
    #[arg(
        long,
        default_value = ".retire",
        help = "Directory holding the saved plan JSON"
    )]
    pub state_dir: PathBuf,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            bind: args.bind,
            port: args.port,
            state_dir: args.state_dir,
        }
    }
}

/// Overrides accept formatted text such as `$1,200` or `6.5%`.
#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[arg(long, value_enum)]
    pub account: CliAccountKind,
    #[arg(long, value_enum, default_value_t = CliScenario::A)]
    pub scenario: CliScenario,
    #[arg(long, help = "Monthly contribution, e.g. $500")]
    pub monthly: Option<String>,
    #[arg(long = "match", help = "Employer match in percent (401(k) only)")]
    pub employer_match: Option<String>,
    #[arg(long, help = "Expected annual return in percent, e.g. 7")]
    pub return_rate: Option<String>,
    #[arg(long)]
    pub start_age: Option<String>,
    #[arg(long)]
    pub retirement_age: Option<String>,
    #[arg(long, help = "Age withdrawals begin (31 to 75)")]
    pub withdrawal_age: Option<String>,
    #[arg(long, help = "Annual withdrawal rate in percent, e.g. 4")]
    pub withdrawal_rate: Option<String>,
}

impl ProjectArgs {
    fn to_update(&self) -> ScenarioUpdate {
        let text = |value: &Option<String>| value.as_deref().map(FieldValue::from);
        ScenarioUpdate {
            monthly_contribution: text(&self.monthly),
            employer_match_pct: text(&self.employer_match),
            return_rate_pct: text(&self.return_rate),
            contribution_start_age: text(&self.start_age),
            retirement_age: text(&self.retirement_age),
            withdrawal_start_age: text(&self.withdrawal_age),
            withdrawal_rate_pct: text(&self.withdrawal_rate),
        }
    }
}

/// Projects one scenario starting from its defaults. Any rejected override
/// fails the whole run.
pub fn run_project(args: &ProjectArgs) -> Result<ScenarioProjection, Vec<FieldError>> {
    let account = AccountKind::from(args.account);
    let scenario = ScenarioLetter::from(args.scenario);
    let mut plan = PlanState::new();

    let errors = plan.apply_update(account, scenario, &args.to_update());
    if !errors.is_empty() {
        return Err(errors);
    }
    Ok(plan.project(account, scenario))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn serve_defaults() {
        let cli = parse(&["retire", "serve"]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        let config = ServerConfig::from(args);
        assert_eq!(config.port, 8080);
        assert_eq!(config.state_dir, PathBuf::from(".retire"));
    }

    #[test]
    fn project_applies_formatted_overrides() {
        let cli = parse(&[
            "retire",
            "project",
            "--account",
            "traditional-401k",
            "--monthly",
            "$1,000",
            "--match",
            "3%",
            "--start-age",
            "22",
            "--retirement-age",
            "65",
        ]);
        let Command::Project(args) = cli.command else {
            panic!("expected project command");
        };
        assert_eq!(args.scenario, CliScenario::A);

        let projection = run_project(&args).expect("overrides are valid");
        assert_eq!(projection.accumulation.len(), 44);
        assert!((projection.summary.final_balance - 3_289_253.75).abs() <= 0.01);
    }

    #[test]
    fn project_reports_invalid_overrides() {
        let cli = parse(&[
            "retire",
            "project",
            "--account",
            "roth-ira",
            "--scenario",
            "b",
            "--withdrawal-rate",
            "120%",
        ]);
        let Command::Project(args) = cli.command else {
            panic!("expected project command");
        };
        let errors = run_project(&args).expect_err("rate above 100 is rejected");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Withdrawal rate must be between 0 and 100");
    }

    #[test]
    fn account_names_are_kebab_case_with_camel_aliases() {
        let names: Vec<String> = CliAccountKind::value_variants()
            .iter()
            .filter_map(|kind| kind.to_possible_value())
            .map(|value| value.get_name().to_string())
            .collect();
        assert_eq!(
            names,
            ["traditional-401k", "roth-401k", "traditional-ira", "roth-ira"]
        );

        for (spelling, expected) in [
            ("roth401k", CliAccountKind::Roth401k),
            ("traditionalIra", CliAccountKind::TraditionalIra),
        ] {
            let cli = parse(&["retire", "project", "--account", spelling]);
            let Command::Project(args) = cli.command else {
                panic!("expected project command");
            };
            assert_eq!(args.account, expected);
        }
    }
}
