//! Interval multipliers
//!
//! Each passing grade has its own multiplier, a function of the card's current
//! ease (as a factor, e.g. 2.5) and current interval in days. Deck option files
//! describe them declaratively:
//!
//! - `3.0` or `{"constant": 3.0}`
//! - `{"ease": {"scale": 1.0, "offset": 0.5}}` = scale * ease + offset
//! - `{"power": {"coefficient": 1.0, "exponent": -0.1, "offset": 1.7381}}`
//!   = coefficient * ease * interval^exponent + offset
//!
//! Library callers can plug in any closure with [`Multiplier::custom`].
//! A multiplier of exactly zero hands the grade back to the host scheduler.

use serde::Deserialize;
use std::sync::Arc;

/// Multiplier evaluation error
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MultiplierError {
    #[error("Multiplier returned a non-finite value ({value}) for ease {ease} and interval {interval}")]
    NotFinite { value: f64, ease: f64, interval: u32 },
    #[error("Multiplier returned a negative value ({value}) for ease {ease} and interval {interval}")]
    Negative { value: f64, ease: f64, interval: u32 },
}

/// A per-grade interval multiplier strategy
pub trait MultiplierFn: Send + Sync {
    fn multiplier(&self, ease: f64, interval: u32) -> f64;
}

impl<F> MultiplierFn for F
where
    F: Fn(f64, u32) -> f64 + Send + Sync,
{
    fn multiplier(&self, ease: f64, interval: u32) -> f64 {
        self(ease, interval)
    }
}

// ============================================================================
// MULTIPLIER
// ============================================================================

#[derive(Clone)]
pub enum Multiplier {
    Constant(f64),
    /// scale * ease + offset
    Ease { scale: f64, offset: f64 },
    /// coefficient * ease * interval^exponent + offset
    Power {
        coefficient: f64,
        exponent: f64,
        offset: f64,
    },
    Custom(Arc<dyn MultiplierFn>),
}

impl Multiplier {
    pub fn custom<F>(f: F) -> Self
    where
        F: MultiplierFn + 'static,
    {
        Multiplier::Custom(Arc::new(f))
    }

    /// Raw value with no validation
    pub fn raw(&self, ease: f64, interval: u32) -> f64 {
        match self {
            Multiplier::Constant(value) => *value,
            Multiplier::Ease { scale, offset } => scale * ease + offset,
            Multiplier::Power {
                coefficient,
                exponent,
                offset,
            } => coefficient * ease * f64::from(interval).powf(*exponent) + offset,
            Multiplier::Custom(f) => f.multiplier(ease, interval),
        }
    }

    /// Evaluate, rejecting negative and non-finite results
    pub fn evaluate(&self, ease: f64, interval: u32) -> Result<f64, MultiplierError> {
        let value = self.raw(ease, interval);
        if !value.is_finite() {
            return Err(MultiplierError::NotFinite {
                value,
                ease,
                interval,
            });
        }
        if value < 0.0 {
            return Err(MultiplierError::Negative {
                value,
                ease,
                interval,
            });
        }
        Ok(value)
    }

    /// Short human-readable form
    pub fn describe(&self) -> String {
        match self {
            Multiplier::Constant(value) => format!("{}", value),
            Multiplier::Ease { scale, offset } => format!("{} * ease + {}", scale, offset),
            Multiplier::Power {
                coefficient,
                exponent,
                offset,
            } => format!(
                "{} * ease * interval^{} + {}",
                coefficient, exponent, offset
            ),
            Multiplier::Custom(_) => "custom".to_string(),
        }
    }
}

impl std::fmt::Debug for Multiplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Multiplier({})", self.describe())
    }
}

impl From<f64> for Multiplier {
    fn from(value: f64) -> Self {
        Multiplier::Constant(value)
    }
}

// ============================================================================
// DESERIALIZATION
// ============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ConstantSpec {
    constant: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EaseTerms {
    #[serde(default = "one")]
    scale: f64,
    #[serde(default)]
    offset: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EaseSpec {
    ease: EaseTerms,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PowerTerms {
    #[serde(default = "one")]
    coefficient: f64,
    exponent: f64,
    #[serde(default)]
    offset: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PowerSpec {
    power: PowerTerms,
}

fn one() -> f64 {
    1.0
}

#[derive(Deserialize)]
#[serde(untagged, expecting = "a number or one of {\"constant\"}, {\"ease\"}, {\"power\"}")]
enum MultiplierSpec {
    Number(f64),
    Constant(ConstantSpec),
    Ease(EaseSpec),
    Power(PowerSpec),
}

impl From<MultiplierSpec> for Multiplier {
    fn from(spec: MultiplierSpec) -> Self {
        match spec {
            MultiplierSpec::Number(value) => Multiplier::Constant(value),
            MultiplierSpec::Constant(ConstantSpec { constant }) => Multiplier::Constant(constant),
            MultiplierSpec::Ease(EaseSpec {
                ease: EaseTerms { scale, offset },
            }) => Multiplier::Ease { scale, offset },
            MultiplierSpec::Power(PowerSpec {
                power:
                    PowerTerms {
                        coefficient,
                        exponent,
                        offset,
                    },
            }) => Multiplier::Power {
                coefficient,
                exponent,
                offset,
            },
        }
    }
}

impl<'de> Deserialize<'de> for Multiplier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        MultiplierSpec::deserialize(deserializer).map(Multiplier::from)
    }
}
