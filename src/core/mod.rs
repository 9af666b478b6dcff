mod engine;
mod error;
mod monte_carlo;
mod projection;
mod requirement;
mod strategies;
mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use engine::{EvaluationConfig, evaluate, strategy_metric_series};
pub use error::{EngineError, EngineResult};
pub use monte_carlo::{
    DEFAULT_HORIZON_YEARS, DEFAULT_RETURN_VOLATILITY, DEFAULT_TRIALS, MonteCarloConfig, simulate,
    simulate_inputs, simulate_seeded,
};
pub use projection::{future_value_of_annuity, grow, horizon, project};
pub use requirement::{assess, on_track_threshold, overall_status, required};
pub use strategies::{
    SEPP_LIFE_EXPECTANCY_DIVISOR, StrategyPolicy, TAXABLE_DRAWDOWN_BRIDGE_YEARS,
    evaluate_strategies, roth_ladder, sepp_72t, taxable_drawdown,
};
pub use types::{
    AccountCategory, AmountMap, Balances, CategoryAmount, ContributionCategory, Contributions,
    EvaluationReport, Inputs, OverallStatus, ProjectionResult, RequirementResult, StrategyKind,
    StrategyMetric, StrategyMetricPoint, StrategyResult, StrategyStatus,
};
