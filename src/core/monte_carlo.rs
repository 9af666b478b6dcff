use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
#[cfg(feature = "parallel")]
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;
use tracing::debug;

use super::error::{EngineError, EngineResult};
use super::projection::project;
use super::requirement::required;
use super::types::Inputs;

pub const DEFAULT_TRIALS: u32 = 500;
pub const DEFAULT_HORIZON_YEARS: u32 = 40;
pub const DEFAULT_RETURN_VOLATILITY: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonteCarloConfig {
    pub trials: u32,
    pub horizon_years: u32,
    pub return_volatility: f64,
    /// Fixed base seed for reproducible runs. `None` draws one per evaluation.
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            horizon_years: DEFAULT_HORIZON_YEARS,
            return_volatility: DEFAULT_RETURN_VOLATILITY,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TrialPlan {
    start_balance: f64,
    annual_spend: f64,
    horizon_years: u32,
    returns: Normal<f64>,
}

impl TrialPlan {
    fn new(
        start_balance: f64,
        annual_spend: f64,
        mean_return: f64,
        config: &MonteCarloConfig,
    ) -> EngineResult<Self> {
        if config.trials == 0 {
            return Err(EngineError::invalid("trials", "must be > 0"));
        }
        if !config.return_volatility.is_finite() || config.return_volatility < 0.0 {
            return Err(EngineError::invalid(
                "return_volatility",
                "must be a finite value >= 0",
            ));
        }
        if !mean_return.is_finite() {
            return Err(EngineError::invalid("real_return", "must be finite"));
        }
        if !start_balance.is_finite() || !annual_spend.is_finite() {
            return Err(EngineError::invalid(
                "start_balance",
                "balance and spending must be finite",
            ));
        }

        let returns = Normal::new(mean_return, config.return_volatility)
            .map_err(|_| EngineError::invalid("return_volatility", "must be >= 0"))?;

        Ok(Self {
            start_balance,
            annual_spend,
            horizon_years: config.horizon_years,
            returns,
        })
    }

    /// Runs one retirement path. A path fails as soon as the balance is exhausted.
    fn survives<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        let mut balance = self.start_balance;
        for _ in 0..self.horizon_years {
            balance *= 1.0 + self.returns.sample(rng);
            balance -= self.annual_spend;
            if balance <= 0.0 {
                return false;
            }
        }
        true
    }
}

fn success_rate(successes: usize, trials: u32) -> f64 {
    successes as f64 / trials as f64
}

/// Survival rate over `config.trials` paths drawn sequentially from `rng`.
pub fn simulate<R: Rng + ?Sized>(
    start_balance: f64,
    annual_spend: f64,
    mean_return: f64,
    config: &MonteCarloConfig,
    rng: &mut R,
) -> EngineResult<f64> {
    let plan = TrialPlan::new(start_balance, annual_spend, mean_return, config)?;
    let successes = (0..config.trials).filter(|_| plan.survives(&mut *rng)).count();

    debug!(
        trials = config.trials,
        horizon_years = config.horizon_years,
        successes,
        "monte carlo finished"
    );
    Ok(success_rate(successes, config.trials))
}

/// Same model as [`simulate`], but every trial owns a generator seeded from
/// `base_seed` and its index. The result does not depend on how trials are scheduled.
pub fn simulate_seeded(
    start_balance: f64,
    annual_spend: f64,
    mean_return: f64,
    config: &MonteCarloConfig,
    base_seed: u64,
) -> EngineResult<f64> {
    let plan = TrialPlan::new(start_balance, annual_spend, mean_return, config)?;
    let trial_survives =
        |trial: u32| plan.survives(&mut SmallRng::seed_from_u64(trial_seed(base_seed, trial)));

    #[cfg(feature = "parallel")]
    let successes = (0..config.trials)
        .into_par_iter()
        .filter(|&trial| trial_survives(trial))
        .count();
    #[cfg(not(feature = "parallel"))]
    let successes = (0..config.trials)
        .filter(|&trial| trial_survives(trial))
        .count();

    debug!(
        trials = config.trials,
        horizon_years = config.horizon_years,
        base_seed,
        successes,
        "seeded monte carlo finished"
    );
    Ok(success_rate(successes, config.trials))
}

/// Starts from the projected nest egg and withdraws the inflated retirement spend.
pub fn simulate_inputs<R: Rng + ?Sized>(
    inputs: &Inputs,
    config: &MonteCarloConfig,
    rng: &mut R,
) -> EngineResult<f64> {
    let requirement = required(inputs)?;
    simulate(
        project(inputs).nest_egg,
        requirement.spend_at_retirement,
        inputs.real_return,
        config,
        rng,
    )
}

fn trial_seed(base_seed: u64, trial: u32) -> u64 {
    splitmix64(base_seed ^ (((trial as u64) << 32) | trial as u64))
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
