use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use clap::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    AccountCategory, Balances, ContributionCategory, Contributions, EvaluationConfig,
    EvaluationReport, Inputs, MonteCarloConfig, StrategyPolicy, evaluate,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct EvaluatePayload {
    current_age: Option<u32>,
    target_retire_age: Option<u32>,
    current_yearly_expenses: Option<f64>,
    desired_retirement_expenses: Option<f64>,
    gross_annual_income: Option<f64>,

    traditional_401k_balance: Option<f64>,
    traditional_ira_balance: Option<f64>,
    roth_ira_balance: Option<f64>,
    hsa_balance: Option<f64>,
    taxable_balance: Option<f64>,
    cash_balance: Option<f64>,

    pre_tax_401k_contribution: Option<f64>,
    roth_401k_contribution: Option<f64>,
    roth_ira_contribution: Option<f64>,
    hsa_contribution: Option<f64>,
    taxable_contribution: Option<f64>,
    cash_contribution: Option<f64>,
    employer_match: Option<f64>,

    real_return: Option<f64>,
    safe_withdrawal_rate: Option<f64>,
    inflation_rate: Option<f64>,
    taxable_bridge_years: Option<u32>,
    safety_margin: Option<f64>,

    trials: Option<u32>,
    horizon_years: Option<u32>,
    return_volatility: Option<f64>,
    sepp_divisor: Option<f64>,
    drawdown_bridge_years: Option<f64>,
    seed: Option<u64>,
}

#[derive(Parser, Debug)]
#[command(
    name = "fire-bridge",
    about = "Early-retirement projection and bridge strategy comparison (Roth ladder, 72(t), taxable drawdown)"
)]
struct Cli {
    #[arg(long, default_value_t = 30)]
    current_age: u32,
    #[arg(long, default_value_t = 50)]
    target_retire_age: u32,
    #[arg(
        long,
        default_value_t = 30_000.0,
        help = "Current annual expenses (informational)"
    )]
    current_yearly_expenses: f64,
    #[arg(
        long,
        default_value_t = 60_000.0,
        help = "Annual retirement expenses in today's money"
    )]
    desired_retirement_expenses: f64,
    #[arg(
        long,
        default_value_t = 100_000.0,
        help = "Gross annual income (informational)"
    )]
    gross_annual_income: f64,

    #[arg(long, default_value_t = 100_000.0)]
    traditional_401k_balance: f64,
    #[arg(long, default_value_t = 69_000.0)]
    traditional_ira_balance: f64,
    #[arg(long, default_value_t = 69_000.0)]
    roth_ira_balance: f64,
    #[arg(long, default_value_t = 20_000.0)]
    hsa_balance: f64,
    #[arg(long, default_value_t = 50_000.0)]
    taxable_balance: f64,
    #[arg(long, default_value_t = 20_000.0, help = "Cash / emergency fund balance")]
    cash_balance: f64,

    #[arg(long, default_value_t = 23_500.0)]
    pre_tax_401k_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    roth_401k_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    roth_ira_contribution: f64,
    #[arg(long, default_value_t = 0.0)]
    hsa_contribution: f64,
    #[arg(long, default_value_t = 10_000.0)]
    taxable_contribution: f64,
    #[arg(long, default_value_t = 20_000.0)]
    cash_contribution: f64,
    #[arg(long, default_value_t = 4_000.0, help = "Annual employer 401(k) match")]
    employer_match: f64,

    #[arg(
        long,
        default_value_t = 5.0,
        help = "Expected annual real return in percent"
    )]
    real_return: f64,
    #[arg(long, default_value_t = 3.5, help = "Safe withdrawal rate in percent")]
    safe_withdrawal_rate: f64,
    #[arg(
        long,
        default_value_t = 3.0,
        help = "Expected annual inflation in percent"
    )]
    inflation_rate: f64,
    #[arg(
        long,
        default_value_t = 3,
        help = "Years of spending the Roth ladder bridge must cover"
    )]
    taxable_bridge_years: u32,
    #[arg(
        long,
        default_value_t = 90.0,
        help = "Share of the required nest egg that counts as on track, in percent"
    )]
    safety_margin: f64,

    #[arg(long, default_value_t = 500)]
    trials: u32,
    #[arg(
        long,
        default_value_t = 40,
        help = "Years simulated after retirement"
    )]
    horizon_years: u32,
    #[arg(
        long,
        default_value_t = 12.0,
        help = "Annual return volatility in percent"
    )]
    return_volatility: f64,
    #[arg(
        long,
        default_value_t = 30.0,
        help = "Years the 72(t) payment is spread over"
    )]
    sepp_divisor: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Years a taxable drawdown must last before penalty-free access"
    )]
    drawdown_bridge_years: f64,
    #[arg(long, help = "Seed for reproducible Monte Carlo runs")]
    seed: Option<u64>,
}

#[derive(Debug)]
struct ApiRequest {
    inputs: Inputs,
    config: EvaluationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateResponse {
    config: EvaluationConfig,
    #[serde(flatten)]
    report: EvaluationReport,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    if cli.target_retire_age < cli.current_age {
        // A past target age is projected as "retire now".
        warn!(
            current_age = cli.current_age,
            target_retire_age = cli.target_retire_age,
            "target retirement age already passed"
        );
    }

    if !cli.desired_retirement_expenses.is_finite() || cli.desired_retirement_expenses <= 0.0 {
        return Err("--desired-retirement-expenses must be > 0".to_string());
    }

    for (name, amount) in [
        ("--current-yearly-expenses", cli.current_yearly_expenses),
        ("--gross-annual-income", cli.gross_annual_income),
        ("--traditional-401k-balance", cli.traditional_401k_balance),
        ("--traditional-ira-balance", cli.traditional_ira_balance),
        ("--roth-ira-balance", cli.roth_ira_balance),
        ("--hsa-balance", cli.hsa_balance),
        ("--taxable-balance", cli.taxable_balance),
        ("--cash-balance", cli.cash_balance),
        ("--pre-tax-401k-contribution", cli.pre_tax_401k_contribution),
        ("--roth-401k-contribution", cli.roth_401k_contribution),
        ("--roth-ira-contribution", cli.roth_ira_contribution),
        ("--hsa-contribution", cli.hsa_contribution),
        ("--taxable-contribution", cli.taxable_contribution),
        ("--cash-contribution", cli.cash_contribution),
        ("--employer-match", cli.employer_match),
    ] {
        if !amount.is_finite() || amount < 0.0 {
            return Err(format!("{name} must be >= 0"));
        }
    }

    for (name, rate) in [
        ("--real-return", cli.real_return),
        ("--inflation-rate", cli.inflation_rate),
    ] {
        if !(0.0..100.0).contains(&rate) {
            return Err(format!("{name} must be between 0 and 100"));
        }
    }

    if !(cli.safe_withdrawal_rate > 0.0 && cli.safe_withdrawal_rate < 100.0) {
        return Err("--safe-withdrawal-rate must be > 0 and < 100".to_string());
    }

    if !(cli.safety_margin > 0.0 && cli.safety_margin <= 100.0) {
        return Err("--safety-margin must be > 0 and <= 100".to_string());
    }

    if cli.trials == 0 {
        return Err("--trials must be > 0".to_string());
    }

    if !(0.0..=100.0).contains(&cli.return_volatility) {
        return Err("--return-volatility must be between 0 and 100".to_string());
    }

    if !cli.sepp_divisor.is_finite() || cli.sepp_divisor <= 0.0 {
        return Err("--sepp-divisor must be > 0".to_string());
    }

    if !cli.drawdown_bridge_years.is_finite() || cli.drawdown_bridge_years < 0.0 {
        return Err("--drawdown-bridge-years must be >= 0".to_string());
    }

    let balances = Balances::default()
        .with(AccountCategory::Traditional401k, cli.traditional_401k_balance)
        .with(AccountCategory::TraditionalIra, cli.traditional_ira_balance)
        .with(AccountCategory::RothIra, cli.roth_ira_balance)
        .with(AccountCategory::Hsa, cli.hsa_balance)
        .with(AccountCategory::TaxableInvestments, cli.taxable_balance)
        .with(AccountCategory::CashEmergency, cli.cash_balance);
    let contributions = Contributions::default()
        .with(ContributionCategory::PreTax401k, cli.pre_tax_401k_contribution)
        .with(ContributionCategory::Roth401k, cli.roth_401k_contribution)
        .with(ContributionCategory::RothIra, cli.roth_ira_contribution)
        .with(ContributionCategory::Hsa, cli.hsa_contribution)
        .with(ContributionCategory::TaxableInvestments, cli.taxable_contribution)
        .with(ContributionCategory::CashSavings, cli.cash_contribution)
        .with(ContributionCategory::EmployerMatch, cli.employer_match);

    let inputs = Inputs {
        current_age: cli.current_age,
        target_retire_age: cli.target_retire_age,
        current_yearly_expenses: cli.current_yearly_expenses,
        gross_annual_income: cli.gross_annual_income,
        desired_retirement_expenses: cli.desired_retirement_expenses,
        inflation_rate: cli.inflation_rate / 100.0,
        real_return: cli.real_return / 100.0,
        safe_withdrawal_rate: cli.safe_withdrawal_rate / 100.0,
        safety_margin: cli.safety_margin / 100.0,
        taxable_bridge_years_required: cli.taxable_bridge_years,
        balances,
        contributions,
    };

    let config = EvaluationConfig {
        monte_carlo: MonteCarloConfig {
            trials: cli.trials,
            horizon_years: cli.horizon_years,
            return_volatility: cli.return_volatility / 100.0,
            seed: cli.seed,
        },
        policy: StrategyPolicy {
            sepp_divisor: cli.sepp_divisor,
            drawdown_bridge_years: cli.drawdown_bridge_years,
        },
    };

    Ok(ApiRequest { inputs, config })
}

fn run_request(request: &ApiRequest) -> Result<EvaluateResponse, String> {
    let report = evaluate(&request.inputs, &request.config).map_err(|e| e.to_string())?;
    Ok(EvaluateResponse {
        config: request.config,
        report,
    })
}

/// Parses `evaluate` flags and returns the report as pretty JSON.
pub fn run_cli<I, T>(args: I) -> Result<String, String>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => return Err(e.to_string()),
    };
    let request = build_request(cli)?;
    let response = run_request(&request)?;
    serde_json::to_string_pretty(&response).map_err(|e| format!("Failed to encode report: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/evaluate",
            get(evaluate_get_handler).post(evaluate_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "fire-bridge HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/api/evaluate");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn evaluate_get_handler(Query(payload): Query<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload).await
}

async fn evaluate_post_handler(Json(payload): Json<EvaluatePayload>) -> Response {
    evaluate_handler_impl(payload).await
}

async fn evaluate_handler_impl(payload: EvaluatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(%msg, "rejected evaluate request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    match run_request(&request) {
        Ok(response) => {
            info!(
                trials = request.config.monte_carlo.trials,
                seed = response.report.seed,
                success_rate = response.report.monte_carlo_success_rate,
                "evaluation served"
            );
            json_response(StatusCode::OK, response)
        }
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

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<EvaluatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: EvaluatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    macro_rules! apply {
        ($($field:ident),* $(,)?) => {
            $(if let Some(v) = payload.$field {
                cli.$field = v;
            })*
        };
    }

    apply!(
        current_age,
        target_retire_age,
        current_yearly_expenses,
        desired_retirement_expenses,
        gross_annual_income,
        traditional_401k_balance,
        traditional_ira_balance,
        roth_ira_balance,
        hsa_balance,
        taxable_balance,
        cash_balance,
        pre_tax_401k_contribution,
        roth_401k_contribution,
        roth_ira_contribution,
        hsa_contribution,
        taxable_contribution,
        cash_contribution,
        employer_match,
        real_return,
        safe_withdrawal_rate,
        inflation_rate,
        taxable_bridge_years,
        safety_margin,
        trials,
        horizon_years,
        return_volatility,
        sepp_divisor,
        drawdown_bridge_years,
    );
    if payload.seed.is_some() {
        cli.seed = payload.seed;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        current_age: 30,
        target_retire_age: 50,
        current_yearly_expenses: 30_000.0,
        desired_retirement_expenses: 60_000.0,
        gross_annual_income: 100_000.0,
        traditional_401k_balance: 100_000.0,
        traditional_ira_balance: 69_000.0,
        roth_ira_balance: 69_000.0,
        hsa_balance: 20_000.0,
        taxable_balance: 50_000.0,
        cash_balance: 20_000.0,
        pre_tax_401k_contribution: 23_500.0,
        roth_401k_contribution: 0.0,
        roth_ira_contribution: 0.0,
        hsa_contribution: 0.0,
        taxable_contribution: 10_000.0,
        cash_contribution: 20_000.0,
        employer_match: 4_000.0,
        real_return: 5.0,
        safe_withdrawal_rate: 3.5,
        inflation_rate: 3.0,
        taxable_bridge_years: 3,
        safety_margin: 90.0,
        trials: 500,
        horizon_years: 40,
        return_volatility: 12.0,
        sepp_divisor: 30.0,
        drawdown_bridge_years: 5.0,
        seed: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StrategyStatus;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_cli() -> Cli {
        default_cli_for_api()
    }

    #[test]
    fn clap_defaults_match_api_defaults() {
        let parsed = Cli::try_parse_from(["fire-bridge"]).expect("defaults parse");
        let defaults = default_cli_for_api();

        assert_eq!(parsed.current_age, defaults.current_age);
        assert_eq!(parsed.target_retire_age, defaults.target_retire_age);
        assert_approx(parsed.traditional_ira_balance, defaults.traditional_ira_balance);
        assert_approx(parsed.employer_match, defaults.employer_match);
        assert_approx(parsed.safety_margin, defaults.safety_margin);
        assert_eq!(parsed.trials, defaults.trials);
        assert_eq!(parsed.seed, None);
    }

    #[test]
    fn build_request_converts_percent_flags() {
        let request = build_request(sample_cli()).expect("valid defaults");
        let inputs = &request.inputs;

        assert_approx(inputs.real_return, 0.05);
        assert_approx(inputs.safe_withdrawal_rate, 0.035);
        assert_approx(inputs.inflation_rate, 0.03);
        assert_approx(inputs.safety_margin, 0.9);
        assert_approx(request.config.monte_carlo.return_volatility, 0.12);
        assert_approx(inputs.balances.total(), 328_000.0);
        assert_approx(inputs.contributions.total(), 57_500.0);
    }

    #[test]
    fn build_request_rejects_zero_swr() {
        let mut cli = sample_cli();
        cli.safe_withdrawal_rate = 0.0;
        let err = build_request(cli).expect_err("must reject zero swr");
        assert!(err.contains("--safe-withdrawal-rate"));
    }

    #[test]
    fn build_request_rejects_zero_trials() {
        let mut cli = sample_cli();
        cli.trials = 0;
        let err = build_request(cli).expect_err("must reject zero trials");
        assert!(err.contains("--trials"));
    }

    #[test]
    fn build_request_rejects_out_of_range_safety_margin() {
        let mut cli = sample_cli();
        cli.safety_margin = 120.0;
        let err = build_request(cli).expect_err("must reject margin above 100");
        assert!(err.contains("--safety-margin"));
    }

    #[test]
    fn build_request_rejects_negative_balance() {
        let mut cli = sample_cli();
        cli.hsa_balance = -1.0;
        let err = build_request(cli).expect_err("must reject negative balance");
        assert!(err.contains("--hsa-balance"));
    }

    #[test]
    fn build_request_allows_past_target_age() {
        let mut cli = sample_cli();
        cli.current_age = 55;
        cli.target_retire_age = 50;
        let request = build_request(cli).expect("past target age is clamped, not rejected");
        let report = evaluate(&request.inputs, &request.config).expect("valid");
        assert_eq!(report.projection.horizon, 0);
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "currentAge": 35,
          "targetRetireAge": 50,
          "desiredRetirementExpenses": 40000,
          "inflationRate": 2,
          "safeWithdrawalRate": 3.5,
          "realReturn": 5,
          "traditional401kBalance": 50000,
          "cashBalance": 10000,
          "preTax401kContribution": 23000,
          "employerMatch": 3000,
          "taxableBridgeYears": 0,
          "trials": 200,
          "horizonYears": 30,
          "returnVolatility": 15,
          "seppDivisor": 35,
          "seed": 7
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let inputs = &request.inputs;

        assert_eq!(inputs.current_age, 35);
        assert_eq!(inputs.target_retire_age, 50);
        assert_approx(inputs.desired_retirement_expenses, 40_000.0);
        assert_approx(inputs.inflation_rate, 0.02);
        assert_approx(inputs.safe_withdrawal_rate, 0.035);
        assert_approx(
            inputs.balances.get(AccountCategory::Traditional401k),
            50_000.0,
        );
        assert_approx(inputs.balances.get(AccountCategory::CashEmergency), 10_000.0);
        assert_approx(
            inputs.contributions.get(ContributionCategory::PreTax401k),
            23_000.0,
        );
        assert_approx(
            inputs.contributions.get(ContributionCategory::EmployerMatch),
            3_000.0,
        );
        assert_eq!(inputs.taxable_bridge_years_required, 0);
        assert_eq!(request.config.monte_carlo.trials, 200);
        assert_eq!(request.config.monte_carlo.horizon_years, 30);
        assert_approx(request.config.monte_carlo.return_volatility, 0.15);
        assert_eq!(request.config.monte_carlo.seed, Some(7));
        assert_approx(request.config.policy.sepp_divisor, 35.0);
    }

    #[test]
    fn api_request_from_json_rejects_unparseable_payload() {
        let err = api_request_from_json(r#"{"currentAge": "old"}"#).expect_err("bad type");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn evaluate_response_serialization_contains_expected_fields() {
        let request =
            api_request_from_json(r#"{"seed": 3, "trials": 50, "taxableBridgeYears": 0}"#)
                .expect("json should parse");
        let response = run_request(&request).expect("valid request");
        assert_eq!(response.report.strategies[0].status, StrategyStatus::Ok);

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"config\""));
        assert!(json.contains("\"projection\""));
        assert!(json.contains("\"nestEgg\""));
        assert!(json.contains("\"requiredNestEgg\""));
        assert!(json.contains("\"overallStatus\""));
        assert!(json.contains("\"monteCarloSuccessRate\""));
        assert!(json.contains("\"strategyMetrics\""));
        assert!(json.contains("\"coverageFraction\""));
        assert!(json.contains("\"Roth Conversion Ladder\""));
        assert!(json.contains("\"traditional_401k\""));
        assert!(json.contains("\"seed\":3"));
    }

    #[test]
    fn run_cli_returns_parse_errors_instead_of_exiting() {
        let unknown = run_cli(["fire-bridge", "--no-such-flag"]).expect_err("unknown flag");
        assert!(unknown.contains("--no-such-flag"), "{unknown}");

        let malformed = run_cli(["fire-bridge", "--trials", "many"]).expect_err("bad number");
        assert!(malformed.contains("--trials"), "{malformed}");
    }

    #[test]
    fn run_cli_prints_seeded_report() {
        let json = run_cli([
            "fire-bridge",
            "--current-age",
            "35",
            "--trials",
            "25",
            "--seed",
            "11",
        ])
        .expect("cli run");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");

        assert_eq!(value["seed"], 11);
        assert_eq!(value["projection"]["horizon"], 15);
        assert_eq!(value["strategies"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["strategies"][1]["name"], "72(t) SEPP");
    }
}
