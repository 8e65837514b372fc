//! Cineon log / linear conversion.
//!
//! Each RGB channel has its own black point, white point and gamma; alpha
//! is left alone. See [`fxkit_transfer::cineon`] for the curve.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use fxkit_transfer::CineonCurve;

use crate::{OpsError, OpsResult, PixelKernel};

/// Conversion direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Log2LinDirection {
    /// Log code values to linear
    #[default]
    LogToLin,
    /// Linear to log code values
    LinToLog,
}

/// Settings of [`Log2Lin`], one value per RGB channel.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Log2LinParams {
    /// Conversion direction
    pub direction: Log2LinDirection,
    /// Black point, 10-bit code values
    pub black: [f32; 3],
    /// White point, 10-bit code values
    pub white: [f32; 3],
    /// Negative gamma
    pub gamma: [f32; 3],
}

impl Default for Log2LinParams {
    fn default() -> Self {
        Self {
            direction: Log2LinDirection::LogToLin,
            black: [95.0; 3],
            white: [685.0; 3],
            gamma: [0.6; 3],
        }
    }
}

impl Log2LinParams {
    /// Rejects non-finite values.
    pub fn validate(&self) -> OpsResult<()> {
        if [self.black, self.white, self.gamma].iter().flatten().any(|v| !v.is_finite()) {
            return Err(OpsError::invalid("log2lin values must be finite"));
        }
        Ok(())
    }
}

/// Per-channel Cineon conversion.
#[derive(Debug, Clone)]
pub struct Log2Lin {
    direction: Log2LinDirection,
    curves: [CineonCurve; 3],
}

impl Log2Lin {
    /// Resolves offset and gain per channel.
    pub fn new(params: Log2LinParams) -> OpsResult<Self> {
        params.validate()?;
        let curves = std::array::from_fn(|c| CineonCurve::new(params.black[c], params.white[c], params.gamma[c]));
        Ok(Self {
            direction: params.direction,
            curves,
        })
    }

    /// The same curves in the other direction.
    pub fn inverse(&self) -> Self {
        let direction = match self.direction {
            Log2LinDirection::LogToLin => Log2LinDirection::LinToLog,
            Log2LinDirection::LinToLog => Log2LinDirection::LogToLin,
        };
        Self {
            direction,
            curves: self.curves,
        }
    }
}

impl PixelKernel for Log2Lin {
    fn process(&self, _x: i32, _y: i32, pix: &mut [f32; 4]) {
        for (v, curve) in pix.iter_mut().zip(&self.curves) {
            *v = match self.direction {
                Log2LinDirection::LogToLin => curve.to_linear(*v),
                Log2LinDirection::LinToLog => curve.from_linear(*v),
            };
        }
    }
}
