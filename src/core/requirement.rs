use super::error::{EngineError, EngineResult};
use super::projection::{horizon, project};
use super::types::{Inputs, OverallStatus, ProjectionResult, RequirementResult};

pub fn required(inputs: &Inputs) -> EngineResult<RequirementResult> {
    if !inputs.safe_withdrawal_rate.is_finite() || inputs.safe_withdrawal_rate <= 0.0 {
        return Err(EngineError::invalid(
            "safe_withdrawal_rate",
            "must be a finite value > 0",
        ));
    }

    let years = horizon(inputs);
    let spend_at_retirement =
        inputs.desired_retirement_expenses * (1.0 + inputs.inflation_rate).powf(years as f64);

    Ok(RequirementResult {
        horizon: years,
        spend_at_retirement,
        required_nest_egg: spend_at_retirement / inputs.safe_withdrawal_rate,
    })
}

pub fn on_track_threshold(requirement: &RequirementResult, safety_margin: f64) -> f64 {
    requirement.required_nest_egg * safety_margin
}

pub fn overall_status(
    projection: &ProjectionResult,
    requirement: &RequirementResult,
    safety_margin: f64,
) -> OverallStatus {
    if projection.nest_egg >= on_track_threshold(requirement, safety_margin) {
        OverallStatus::OnTrack
    } else {
        OverallStatus::UnderSaving
    }
}

pub fn assess(inputs: &Inputs) -> EngineResult<OverallStatus> {
    let requirement = required(inputs)?;
    Ok(overall_status(
        &project(inputs),
        &requirement,
        inputs.safety_margin,
    ))
}
