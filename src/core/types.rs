use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    #[serde(rename = "traditional_401k")]
    Traditional401k,
    TraditionalIra,
    RothIra,
    Hsa,
    TaxableInvestments,
    CashEmergency,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionCategory {
    #[serde(rename = "pre_tax_401k")]
    PreTax401k,
    #[serde(rename = "roth_401k")]
    Roth401k,
    RothIra,
    Hsa,
    TaxableInvestments,
    CashSavings,
    EmployerMatch,
}

/// Currency amounts keyed by category. Missing categories read as zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AmountMap<K: Ord> {
    amounts: BTreeMap<K, f64>,
}

impl<K: Ord> Default for AmountMap<K> {
    fn default() -> Self {
        Self {
            amounts: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Copy> AmountMap<K> {
    pub fn get(&self, key: K) -> f64 {
        self.amounts.get(&key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: K, amount: f64) {
        self.amounts.insert(key, amount);
    }

    pub fn with(mut self, key: K, amount: f64) -> Self {
        self.set(key, amount);
        self
    }

    pub fn total(&self) -> f64 {
        self.amounts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.amounts.iter().map(|(k, v)| (*k, *v))
    }
}

pub type Balances = AmountMap<AccountCategory>;
pub type Contributions = AmountMap<ContributionCategory>;

#[derive(Debug, Clone)]
pub struct Inputs {
    pub current_age: u32,
    pub target_retire_age: u32,
    pub current_yearly_expenses: f64,
    pub gross_annual_income: f64,
    pub desired_retirement_expenses: f64,
    pub inflation_rate: f64,
    pub real_return: f64,
    pub safe_withdrawal_rate: f64,
    pub safety_margin: f64,
    pub taxable_bridge_years_required: u32,
    pub balances: Balances,
    pub contributions: Contributions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub horizon: u32,
    pub total_now: f64,
    pub annual_contribution: f64,
    pub grown_balance: f64,
    pub contributions_future_value: f64,
    pub nest_egg: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementResult {
    pub horizon: u32,
    pub spend_at_retirement: f64,
    pub required_nest_egg: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    OnTrack,
    UnderSaving,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    RothLadder,
    #[serde(rename = "sepp-72t")]
    Sepp72t,
    TaxableDrawdown,
}

impl StrategyKind {
    pub const ORDERED: [StrategyKind; 3] = [
        StrategyKind::RothLadder,
        StrategyKind::Sepp72t,
        StrategyKind::TaxableDrawdown,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            StrategyKind::RothLadder => "Roth Conversion Ladder",
            StrategyKind::Sepp72t => "72(t) SEPP",
            StrategyKind::TaxableDrawdown => "Taxable Drawdown First",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StrategyStatus {
    Ok,
    Short,
}

impl StrategyStatus {
    pub fn from_met(met: bool) -> Self {
        if met {
            StrategyStatus::Ok
        } else {
            StrategyStatus::Short
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    pub kind: StrategyKind,
    pub name: &'static str,
    /// Share of the need met, clamped to `[0, 1]`.
    pub coverage_fraction: f64,
    /// Unclamped ratio the status is derived from.
    pub coverage_ratio: f64,
    pub years_covered: f64,
    pub monte_carlo_success_rate: Option<f64>,
    pub status: StrategyStatus,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StrategyMetric {
    CoveragePct,
    YearsCovered,
    MonteCarloSuccessPct,
}

/// One long-format row of the strategy comparison chart series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMetricPoint {
    pub strategy: &'static str,
    pub metric: StrategyMetric,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAmount<K> {
    pub category: K,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    pub projection: ProjectionResult,
    pub requirement: RequirementResult,
    pub overall_status: OverallStatus,
    pub on_track_threshold: f64,
    pub monte_carlo_success_rate: f64,
    pub seed: u64,
    pub strategies: Vec<StrategyResult>,
    pub strategy_metrics: Vec<StrategyMetricPoint>,
    pub balances: Vec<CategoryAmount<AccountCategory>>,
    pub contributions: Vec<CategoryAmount<ContributionCategory>>,
}
