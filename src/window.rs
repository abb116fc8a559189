//! Window geometry and kernel weighting.
//!
//! A `WindowSpec` fixes one co-occurrence window: how far it reaches
//! (`radius`), which side(s) of the anchor it covers (`Orientation`), how
//! weight decays with offset (`Kernel` + `KernelParams`), and whether the
//! decaying variable-window factor applies (`WindowFunction`). Weights are a
//! function of the 0-based offset only, so every adapter (plain, timed,
//! multiset, tree) shares the same tables.

use crate::error::{CoocError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_GEOMETRIC_P: f64 = 0.9;
pub const DEFAULT_VARIABLE_POWER: f64 = 0.75;

/// Which side of the anchor a window covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Before,
    After,
    /// Both sides, emitted as two separate column blocks (before, then after).
    Directional,
}

impl FromStr for Orientation {
    type Err = CoocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            "directional" => Ok(Self::Directional),
            other => Err(CoocError::InvalidConfig(format!(
                "unknown window orientation '{other}'"
            ))),
        }
    }
}

/// Weight decay as a function of offset within the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kernel {
    /// Constant weight 1.
    Flat,
    /// 1 / (offset + 1).
    Harmonic,
    /// p^offset, default p = 0.9.
    Geometric,
}

impl FromStr for Kernel {
    type Err = CoocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "flat" => Ok(Self::Flat),
            "harmonic" => Ok(Self::Harmonic),
            "geometric" => Ok(Self::Geometric),
            other => Err(CoocError::InvalidConfig(format!("unknown kernel '{other}'"))),
        }
    }
}

/// Fixed windows weight every offset; variable windows decay toward the rim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    Fixed,
    Variable,
}

impl FromStr for WindowFunction {
    type Err = CoocError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fixed" => Ok(Self::Fixed),
            "variable" => Ok(Self::Variable),
            other => Err(CoocError::InvalidConfig(format!(
                "unknown window function '{other}'"
            ))),
        }
    }
}

/// Optional kernel tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct KernelParams {
    /// Geometric decay base; `None` means the kernel default.
    pub p: Option<f64>,
    /// Divide the weight table by its sum.
    pub normalize: bool,
    /// Zero out weights at offsets strictly below this value.
    pub offset: usize,
}

/// Optional window-function tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct WindowParams {
    /// Variable-window decay exponent; `None` means 0.75.
    pub power: Option<f64>,
}

/// One fully resolved co-occurrence window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub radius: usize,
    pub orientation: Orientation,
    pub window_function: WindowFunction,
    pub kernel: Kernel,
    pub kernel_params: KernelParams,
    pub window_params: WindowParams,
}

impl WindowSpec {
    /// Resolve the weighting function for this spec.
    #[must_use]
    pub(crate) fn weights(&self) -> WindowWeights {
        let span = self.radius.max(1);
        let p = self.kernel_params.p.unwrap_or(DEFAULT_GEOMETRIC_P);
        let power = self.window_params.power.unwrap_or(DEFAULT_VARIABLE_POWER);

        let raw = |off: usize| -> f64 {
            if off < self.kernel_params.offset {
                return 0.0;
            }
            match self.kernel {
                Kernel::Flat => 1.0,
                Kernel::Harmonic => 1.0 / (off as f64 + 1.0),
                Kernel::Geometric => p.powi(i32::try_from(off).unwrap_or(i32::MAX)),
            }
        };

        let denom = if self.kernel_params.normalize {
            let total: f64 = (0..span).map(&raw).sum();
            if total > 0.0 {
                total
            } else {
                1.0
            }
        } else {
            1.0
        };

        let variable = match self.window_function {
            WindowFunction::Fixed => None,
            WindowFunction::Variable => Some((span as f64, power)),
        };

        let table = (0..span)
            .map(|off| {
                let mut w = raw(off) / denom;
                if let Some((span_f, power)) = variable {
                    w *= ((span_f - off as f64) / span_f).powf(power);
                }
                w
            })
            .collect();

        WindowWeights {
            table,
            kernel: self.kernel,
            p,
            min_offset: self.kernel_params.offset,
            denom,
            variable,
        }
    }
}

/// Precomputed per-offset weights with an analytic tail.
///
/// The table covers offsets `0..max(radius, 1)`; timed windows can reach
/// further when many events fall inside the time radius, so weights beyond
/// the table are computed on demand from the same formula.
#[derive(Debug, Clone)]
pub(crate) struct WindowWeights {
    table: Vec<f64>,
    kernel: Kernel,
    p: f64,
    min_offset: usize,
    denom: f64,
    variable: Option<(f64, f64)>,
}

impl WindowWeights {
    pub(crate) fn weight(&self, off: usize) -> f64 {
        if let Some(&w) = self.table.get(off) {
            return w;
        }
        // Past the nominal span the variable-window factor has decayed to
        // nothing; fixed windows keep the kernel's own tail.
        if self.variable.is_some() || off < self.min_offset {
            return 0.0;
        }
        let raw = match self.kernel {
            Kernel::Flat => 1.0,
            Kernel::Harmonic => 1.0 / (off as f64 + 1.0),
            Kernel::Geometric => self.p.powi(i32::try_from(off).unwrap_or(i32::MAX)),
        };
        raw / self.denom
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &[f64] {
        &self.table
    }
}
