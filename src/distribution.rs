//! Distribution parameters, validation and integer outcome sampling.

use rand::Rng;
use rand_distr::{Binomial, Distribution, Normal, Poisson};
use serde::{Deserialize, Serialize};

/// Upper bound on the number of outcomes a frequency table can hold.
pub const MAX_BINS: usize = 200;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DistributionError {
    #[error("probability of success must be within [0, 1], got {0}")]
    Probability(f64),

    #[error("trials must be at most {max}, got {got}")]
    TooManyTrials { got: u64, max: u64 },

    #[error("mean must be finite, got {0}")]
    Mean(f64),

    #[error("standard deviation must be finite and positive, got {0}")]
    StdDev(f64),

    #[error("lambda must be finite and positive, got {0}")]
    Lambda(f64),

    #[error("bins must be within 1..={max}, got {got}")]
    Bins { got: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionSpec {
    Binomial { trials: u64, probability: f64 },
    Normal { mean: f64, std_dev: f64, bins: usize },
    Poisson { lambda: f64, bins: usize },
}

impl DistributionSpec {
    pub const DEFAULT_BINOMIAL: Self = Self::Binomial {
        trials: 25,
        probability: 0.2,
    };
    pub const DEFAULT_NORMAL: Self = Self::Normal {
        mean: 12.5,
        std_dev: 3.125,
        bins: 25,
    };
    pub const DEFAULT_POISSON: Self = Self::Poisson {
        lambda: 5.0,
        bins: 13,
    };

    pub fn validate(&self) -> Result<(), DistributionError> {
        match *self {
            Self::Binomial {
                trials,
                probability,
            } => {
                if !(0.0..=1.0).contains(&probability) {
                    return Err(DistributionError::Probability(probability));
                }
                let max = (MAX_BINS - 1) as u64;
                if trials > max {
                    return Err(DistributionError::TooManyTrials { got: trials, max });
                }
            }
            Self::Normal {
                mean,
                std_dev,
                bins,
            } => {
                if !mean.is_finite() {
                    return Err(DistributionError::Mean(mean));
                }
                if !std_dev.is_finite() || std_dev <= 0.0 {
                    return Err(DistributionError::StdDev(std_dev));
                }
                check_bins(bins)?;
            }
            Self::Poisson { lambda, bins } => {
                if !lambda.is_finite() || lambda <= 0.0 {
                    return Err(DistributionError::Lambda(lambda));
                }
                check_bins(bins)?;
            }
        }
        Ok(())
    }

    /// Number of outcomes tracked by the frequency table, starting at value 0.
    pub fn bins(&self) -> usize {
        match *self {
            // The binomial support is finite, so the table covers all of it.
            Self::Binomial { trials, .. } => trials as usize + 1,
            Self::Normal { bins, .. } | Self::Poisson { bins, .. } => bins,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Binomial { .. } => "Binomial",
            Self::Normal { .. } => "Normal",
            Self::Poisson { .. } => "Poisson",
        }
    }

    /// Display name with parameters, e.g. `Poisson Distribution (lambda=5)`.
    pub fn label(&self) -> String {
        match *self {
            Self::Binomial {
                trials,
                probability,
            } => format!(
                "Binomial Distribution (trials={trials}, probability of success={probability})"
            ),
            Self::Normal { mean, std_dev, .. } => {
                format!("Normal Distribution (mean={mean}, standard deviation={std_dev})")
            }
            Self::Poisson { lambda, .. } => format!("Poisson Distribution (lambda={lambda})"),
        }
    }

    pub fn value_axis_label(&self) -> &'static str {
        match self {
            Self::Binomial { .. } => "Value",
            Self::Normal { .. } => "Random Value",
            Self::Poisson { .. } => "Number",
        }
    }

    /// Decimal places used when showing percentages above bars.
    pub fn percent_precision(&self) -> usize {
        match self {
            Self::Normal { .. } => 2,
            _ => 3,
        }
    }

    pub fn expected_mean(&self) -> f64 {
        match *self {
            Self::Binomial {
                trials,
                probability,
            } => trials as f64 * probability,
            Self::Normal { mean, .. } => mean,
            Self::Poisson { lambda, .. } => lambda,
        }
    }

    pub fn expected_variance(&self) -> f64 {
        match *self {
            Self::Binomial {
                trials,
                probability,
            } => trials as f64 * probability * (1.0 - probability),
            Self::Normal { std_dev, .. } => std_dev * std_dev,
            Self::Poisson { lambda, .. } => lambda,
        }
    }

    /// Build a sampler for validated parameters.
    pub fn sampler(&self) -> Result<OutcomeSampler, DistributionError> {
        self.validate()?;
        Ok(match *self {
            Self::Binomial {
                trials,
                probability,
            } => OutcomeSampler::Binomial(
                Binomial::new(trials, probability)
                    .map_err(|_| DistributionError::Probability(probability))?,
            ),
            Self::Normal { mean, std_dev, .. } => OutcomeSampler::Normal(
                Normal::new(mean, std_dev).map_err(|_| DistributionError::StdDev(std_dev))?,
            ),
            Self::Poisson { lambda, .. } => OutcomeSampler::Poisson(
                Poisson::new(lambda).map_err(|_| DistributionError::Lambda(lambda))?,
            ),
        })
    }
}

fn check_bins(bins: usize) -> Result<(), DistributionError> {
    if bins == 0 || bins > MAX_BINS {
        return Err(DistributionError::Bins {
            got: bins,
            max: MAX_BINS,
        });
    }
    Ok(())
}

/// Draws integer outcomes from one of the supported distributions.
#[derive(Debug, Clone, Copy)]
pub enum OutcomeSampler {
    Binomial(Binomial),
    Normal(Normal<f64>),
    Poisson(Poisson<f64>),
}

impl OutcomeSampler {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        match self {
            Self::Binomial(d) => Distribution::<u64>::sample(d, rng) as i64,
            // Truncate toward zero: -0.7 lands on 0, 24.9 on 24.
            Self::Normal(d) => Distribution::<f64>::sample(d, rng).trunc() as i64,
            Self::Poisson(d) => Distribution::<f64>::sample(d, rng) as i64,
        }
    }
}
