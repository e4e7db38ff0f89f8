//! Linear predictors that decorrelate successive samples.
//!
//! Coders transmit `value - predict()` and then call `update(value)`; the
//! decoder runs an identical predictor, so both sides stay in lockstep.
//! `predict` has no side effects and may be called any number of times.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Predicts the next integer of a sequence from its history.
pub trait IntPredictor {
    /// Estimate of the next value.
    fn predict(&self) -> i32;

    /// Commit the value actually seen.
    fn update(&mut self, v: i32);
}

/// Always predicts a fixed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroOrderPredictor {
    value: i32,
}

impl ZeroOrderPredictor {
    /// Predict `value` forever.
    pub fn new(value: i32) -> Self {
        Self { value }
    }
}

impl IntPredictor for ZeroOrderPredictor {
    fn predict(&self) -> i32 {
        self.value
    }

    fn update(&mut self, _v: i32) {}
}

/// Predicts the previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstOrderPredictor {
    prev: i32,
}

impl FirstOrderPredictor {
    /// Start from `initial` as the notional previous value.
    pub fn new(initial: i32) -> Self {
        Self { prev: initial }
    }
}

impl IntPredictor for FirstOrderPredictor {
    fn predict(&self) -> i32 {
        self.prev
    }

    fn update(&mut self, v: i32) {
        self.prev = v;
    }
}

/// Linear extrapolation from the last two values: `2 * prev1 - prev2`.
///
/// Arithmetic wraps; the coder and decoder wrap identically, so the residual
/// stream still round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondOrderPredictor {
    prev1: i32,
    prev2: i32,
}

impl SecondOrderPredictor {
    /// `prev1` is the most recent value, `prev2` the one before it.
    pub fn new(prev1: i32, prev2: i32) -> Self {
        Self { prev1, prev2 }
    }
}

impl IntPredictor for SecondOrderPredictor {
    fn predict(&self) -> i32 {
        self.prev1.wrapping_mul(2).wrapping_sub(self.prev2)
    }

    fn update(&mut self, v: i32) {
        self.prev2 = self.prev1;
        self.prev1 = v;
    }
}

/// Serializable predictor choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "order", rename_all = "snake_case")]
pub enum PredictorConfig {
    /// Order 0: constant prediction.
    Zero {
        /// Predicted value.
        initial: i32,
    },
    /// Order 1: previous value.
    First {
        /// Value assumed before the first sample.
        initial: i32,
    },
    /// Order 2: linear extrapolation.
    Second {
        /// Value assumed immediately before the first sample.
        prev1: i32,
        /// Value assumed two steps before the first sample.
        prev2: i32,
    },
}

impl Default for PredictorConfig {
    fn default() -> Self {
        PredictorConfig::First { initial: 0 }
    }
}

impl PredictorConfig {
    /// Select a predictor by order; `a` and `b` are its initial values
    /// (`b` is only used by order 2).
    ///
    /// # Errors
    /// Returns [`Error::InvalidPredictorOrder`] for orders other than 0, 1, 2.
    pub fn from_order(order: u8, a: i32, b: i32) -> Result<Self> {
        match order {
            0 => Ok(PredictorConfig::Zero { initial: a }),
            1 => Ok(PredictorConfig::First { initial: a }),
            2 => Ok(PredictorConfig::Second { prev1: a, prev2: b }),
            n => Err(Error::InvalidPredictorOrder(n)),
        }
    }

    /// Predictor order.
    pub fn order(&self) -> u8 {
        match self {
            PredictorConfig::Zero { .. } => 0,
            PredictorConfig::First { .. } => 1,
            PredictorConfig::Second { .. } => 2,
        }
    }

    /// A fresh predictor in its initial state.
    pub fn build(&self) -> Box<dyn IntPredictor + Send> {
        match *self {
            PredictorConfig::Zero { initial } => Box::new(ZeroOrderPredictor::new(initial)),
            PredictorConfig::First { initial } => Box::new(FirstOrderPredictor::new(initial)),
            PredictorConfig::Second { prev1, prev2 } => {
                Box::new(SecondOrderPredictor::new(prev1, prev2))
            }
        }
    }
}
