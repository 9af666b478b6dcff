use serde::Serialize;
use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::monte_carlo::{MonteCarloConfig, simulate_seeded};
use super::projection::project;
use super::requirement::{on_track_threshold, overall_status, required};
use super::strategies::{StrategyPolicy, evaluate_strategies};
use super::types::{
    CategoryAmount, EvaluationReport, Inputs, StrategyMetric, StrategyMetricPoint, StrategyResult,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationConfig {
    pub monte_carlo: MonteCarloConfig,
    pub policy: StrategyPolicy,
}

pub fn evaluate(inputs: &Inputs, config: &EvaluationConfig) -> EngineResult<EvaluationReport> {
    validate_policy(&config.policy)?;

    let projection = project(inputs);
    let requirement = required(inputs)?;
    let status = overall_status(&projection, &requirement, inputs.safety_margin);
    debug!(
        horizon = projection.horizon,
        nest_egg = projection.nest_egg,
        required_nest_egg = requirement.required_nest_egg,
        ?status,
        "projection complete"
    );

    let seed = config.monte_carlo.seed.unwrap_or_else(rand::random::<u64>);
    let success_rate = simulate_seeded(
        projection.nest_egg,
        requirement.spend_at_retirement,
        inputs.real_return,
        &config.monte_carlo,
        seed,
    )?;

    let strategies = evaluate_strategies(
        inputs,
        requirement.spend_at_retirement,
        &config.policy,
        Some(success_rate),
    );

    Ok(EvaluationReport {
        projection,
        requirement,
        overall_status: status,
        on_track_threshold: on_track_threshold(&requirement, inputs.safety_margin),
        monte_carlo_success_rate: success_rate,
        seed,
        strategy_metrics: strategy_metric_series(&strategies),
        strategies,
        balances: inputs
            .balances
            .iter()
            .map(|(category, amount)| CategoryAmount { category, amount })
            .collect(),
        contributions: inputs
            .contributions
            .iter()
            .map(|(category, amount)| CategoryAmount { category, amount })
            .collect(),
    })
}

fn validate_policy(policy: &StrategyPolicy) -> EngineResult<()> {
    if !policy.sepp_divisor.is_finite() || policy.sepp_divisor <= 0.0 {
        return Err(EngineError::invalid("sepp_divisor", "must be a finite value > 0"));
    }
    if !policy.drawdown_bridge_years.is_finite() || policy.drawdown_bridge_years < 0.0 {
        return Err(EngineError::invalid(
            "drawdown_bridge_years",
            "must be a finite value >= 0",
        ));
    }
    Ok(())
}

/// Long-format rows for a grouped bar chart, percentages on a 0-100 scale.
pub fn strategy_metric_series(strategies: &[StrategyResult]) -> Vec<StrategyMetricPoint> {
    let mut points = Vec::with_capacity(strategies.len() * 3);
    for metric in [
        StrategyMetric::CoveragePct,
        StrategyMetric::YearsCovered,
        StrategyMetric::MonteCarloSuccessPct,
    ] {
        for s in strategies {
            let value = match metric {
                StrategyMetric::CoveragePct => s.coverage_fraction * 100.0,
                StrategyMetric::YearsCovered => s.years_covered,
                StrategyMetric::MonteCarloSuccessPct => {
                    s.monte_carlo_success_rate.unwrap_or(0.0) * 100.0
                }
            };
            points.push(StrategyMetricPoint {
                strategy: s.name,
                metric,
                value,
            });
        }
    }
    points
}
