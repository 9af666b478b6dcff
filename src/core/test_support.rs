use super::types::{AccountCategory, Balances, ContributionCategory, Contributions, Inputs};

pub(crate) fn assert_rel(actual: f64, expected: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= 1e-6 * scale,
        "expected {expected}, got {actual}"
    );
}

/// 35-year-old retiring at 50 with 150k saved and 42,150 a year going in.
pub(crate) fn scenario_inputs() -> Inputs {
    let balances = Balances::default()
        .with(AccountCategory::Traditional401k, 50_000.0)
        .with(AccountCategory::TraditionalIra, 30_000.0)
        .with(AccountCategory::RothIra, 20_000.0)
        .with(AccountCategory::Hsa, 10_000.0)
        .with(AccountCategory::TaxableInvestments, 30_000.0)
        .with(AccountCategory::CashEmergency, 10_000.0);
    let contributions = Contributions::default()
        .with(ContributionCategory::PreTax401k, 23_000.0)
        .with(ContributionCategory::Roth401k, 0.0)
        .with(ContributionCategory::RothIra, 7_000.0)
        .with(ContributionCategory::Hsa, 4_150.0)
        .with(ContributionCategory::TaxableInvestments, 5_000.0)
        .with(ContributionCategory::CashSavings, 0.0)
        .with(ContributionCategory::EmployerMatch, 3_000.0);

    Inputs {
        current_age: 35,
        target_retire_age: 50,
        current_yearly_expenses: 35_000.0,
        gross_annual_income: 110_000.0,
        desired_retirement_expenses: 40_000.0,
        inflation_rate: 0.02,
        real_return: 0.05,
        safe_withdrawal_rate: 0.035,
        safety_margin: 0.9,
        taxable_bridge_years_required: 3,
        balances,
        contributions,
    }
}
