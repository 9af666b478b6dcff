use super::types::{Inputs, ProjectionResult};

/// Whole years until retirement. A target age already passed yields zero.
pub fn horizon(inputs: &Inputs) -> u32 {
    inputs.target_retire_age.saturating_sub(inputs.current_age)
}

pub fn grow(balance: f64, years: u32, rate: f64) -> f64 {
    balance * (1.0 + rate).powf(years as f64)
}

/// Future value of a level contribution paid at the end of each year.
pub fn future_value_of_annuity(contribution: f64, years: u32, rate: f64) -> f64 {
    if years == 0 {
        return 0.0;
    }
    if rate == 0.0 {
        return contribution * years as f64;
    }
    let n = years as f64;
    if rate <= -1.0 {
        return contribution * (((1.0 + rate).powf(n) - 1.0) / rate);
    }
    // (1+r)^n - 1 via exp_m1/ln_1p keeps precision for rates near zero.
    contribution * ((n * rate.ln_1p()).exp_m1() / rate)
}

pub fn project(inputs: &Inputs) -> ProjectionResult {
    let years = horizon(inputs);
    let total_now = inputs.balances.total();
    let annual_contribution = inputs.contributions.total();
    let grown_balance = grow(total_now, years, inputs.real_return);
    let contributions_future_value =
        future_value_of_annuity(annual_contribution, years, inputs.real_return);

    ProjectionResult {
        horizon: years,
        total_now,
        annual_contribution,
        grown_balance,
        contributions_future_value,
        nest_egg: grown_balance + contributions_future_value,
    }
}
