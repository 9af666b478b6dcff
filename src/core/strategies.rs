use serde::Serialize;

use super::types::{AccountCategory, Inputs, StrategyKind, StrategyResult, StrategyStatus};

/// Years of life expectancy the 72(t) payment is spread over.
pub const SEPP_LIFE_EXPECTANCY_DIVISOR: f64 = 30.0;
/// Years a taxable drawdown must last before penalty-free access.
pub const TAXABLE_DRAWDOWN_BRIDGE_YEARS: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyPolicy {
    pub sepp_divisor: f64,
    pub drawdown_bridge_years: f64,
}

impl Default for StrategyPolicy {
    fn default() -> Self {
        Self {
            sepp_divisor: SEPP_LIFE_EXPECTANCY_DIVISOR,
            drawdown_bridge_years: TAXABLE_DRAWDOWN_BRIDGE_YEARS,
        }
    }
}

/// `numerator / denominator`, or `fallback` when the denominator is not positive.
fn ratio_or(numerator: f64, denominator: f64, fallback: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        fallback
    }
}

fn display_fraction(ratio: f64) -> f64 {
    ratio.clamp(0.0, 1.0)
}

fn bridge_funds(inputs: &Inputs) -> f64 {
    inputs.balances.get(AccountCategory::TaxableInvestments)
        + inputs.balances.get(AccountCategory::CashEmergency)
}

fn pre_tax_funds(inputs: &Inputs) -> f64 {
    inputs.balances.get(AccountCategory::Traditional401k)
        + inputs.balances.get(AccountCategory::TraditionalIra)
}

fn result(
    kind: StrategyKind,
    coverage_ratio: f64,
    years_covered: f64,
    met: bool,
) -> StrategyResult {
    StrategyResult {
        kind,
        name: kind.display_name(),
        coverage_fraction: display_fraction(coverage_ratio),
        coverage_ratio,
        years_covered,
        monte_carlo_success_rate: None,
        status: StrategyStatus::from_met(met),
    }
}

/// Taxable and cash funds must carry spending through the conversion seasoning years.
pub fn roth_ladder(inputs: &Inputs, spend_at_retirement: f64) -> StrategyResult {
    let avail = bridge_funds(inputs);
    let need = spend_at_retirement * inputs.taxable_bridge_years_required as f64;

    result(
        StrategyKind::RothLadder,
        ratio_or(avail, need, 1.0),
        ratio_or(avail, spend_at_retirement, 0.0),
        avail >= need,
    )
}

pub fn sepp_72t(
    inputs: &Inputs,
    spend_at_retirement: f64,
    policy: &StrategyPolicy,
) -> StrategyResult {
    let balance = pre_tax_funds(inputs);
    let annual_payment = ratio_or(balance, policy.sepp_divisor, 0.0);

    result(
        StrategyKind::Sepp72t,
        ratio_or(annual_payment, spend_at_retirement, 0.0),
        ratio_or(balance, spend_at_retirement, 0.0),
        annual_payment >= spend_at_retirement,
    )
}

pub fn taxable_drawdown(
    inputs: &Inputs,
    spend_at_retirement: f64,
    policy: &StrategyPolicy,
) -> StrategyResult {
    let years_covered = ratio_or(bridge_funds(inputs), spend_at_retirement, 0.0);

    result(
        StrategyKind::TaxableDrawdown,
        ratio_or(years_covered, policy.drawdown_bridge_years, 1.0),
        years_covered,
        years_covered >= policy.drawdown_bridge_years,
    )
}

/// All three strategies in stable display order.
pub fn evaluate_strategies(
    inputs: &Inputs,
    spend_at_retirement: f64,
    policy: &StrategyPolicy,
    monte_carlo_success_rate: Option<f64>,
) -> Vec<StrategyResult> {
    let mut results = vec![
        roth_ladder(inputs, spend_at_retirement),
        sepp_72t(inputs, spend_at_retirement, policy),
        taxable_drawdown(inputs, spend_at_retirement, policy),
    ];
    for r in &mut results {
        r.monte_carlo_success_rate = monte_carlo_success_rate;
    }
    results
}
