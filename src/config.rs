//! Configuration for the co-occurrence vectorizer.

use crate::error::{CoocError, Result};
use crate::token::Token;
use crate::window::{
    Kernel, KernelParams, Orientation, WindowFunction, WindowParams, WindowSpec,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// A byte count parseable from strings like `"4096"`, `"1k"`, `"64M"`, `"0.5G"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemorySize(pub u64);

impl MemorySize {
    #[must_use]
    pub const fn bytes(self) -> u64 {
        self.0
    }
}

impl Default for MemorySize {
    /// 64 MiB of triple buffer.
    fn default() -> Self {
        Self(64 * 1024 * 1024)
    }
}

impl FromStr for MemorySize {
    type Err = CoocError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (digits, multiplier) = match s.chars().last() {
            Some('k' | 'K') => (&s[..s.len() - 1], 1024u64),
            Some('m' | 'M') => (&s[..s.len() - 1], 1024 * 1024),
            Some('g' | 'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
            _ => (s, 1),
        };
        let value: f64 = digits
            .trim()
            .parse()
            .map_err(|_| CoocError::InvalidMemorySize(s.to_string()))?;
        if value < 0.0 || !value.is_finite() {
            return Err(CoocError::InvalidMemorySize(s.to_string()));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(Self((value * multiplier as f64).round() as u64))
    }
}

/// Configuration for `CooccurrenceVectorizer`.
///
/// The four window parameters (`window_radii`, `window_orientations`,
/// `window_functions`, `kernels`) are parallel lists describing one window
/// spec each; a single-element list broadcasts against the longest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoocConfig {
    pub window_radii: Vec<usize>,
    pub window_orientations: Vec<Orientation>,
    pub window_functions: Vec<WindowFunction>,
    pub kernels: Vec<Kernel>,
    pub kernel_args: Vec<KernelParams>,
    pub window_args: Vec<WindowParams>,
    /// L1-normalize each window placement before accumulation.
    pub normalize_windows: bool,
    /// Refinement passes over the accumulated blocks.
    pub n_iter: usize,
    /// Post-composition row-normalized pruning threshold; 0 keeps raw weights.
    pub epsilon: f64,
    /// Worker threads for the document scan; 1 means sequential.
    pub n_threads: usize,
    /// Byte budget for the coordinate triple buffer.
    pub coo_initial_memory: MemorySize,

    // Vocabulary construction.
    pub token_dictionary: Option<BTreeMap<Token, u32>>,
    pub min_occurrences: Option<u64>,
    pub max_occurrences: Option<u64>,
    pub min_frequency: Option<f64>,
    pub max_frequency: Option<f64>,
    pub min_document_occurrences: Option<u64>,
    pub max_document_occurrences: Option<u64>,
    pub min_document_frequency: Option<f64>,
    pub max_document_frequency: Option<f64>,
    pub max_unique_tokens: Option<usize>,
    /// Substitute for pruned and out-of-vocabulary tokens.
    pub mask_token: Option<Token>,
    /// Zero the mask row and column of every block after accumulation.
    pub nullify_mask: bool,
}

impl Default for CoocConfig {
    fn default() -> Self {
        Self {
            window_radii: vec![5],
            window_orientations: vec![Orientation::Directional],
            window_functions: vec![WindowFunction::Fixed],
            kernels: vec![Kernel::Flat],
            kernel_args: vec![KernelParams::default()],
            window_args: vec![WindowParams::default()],
            normalize_windows: true,
            n_iter: 0,
            epsilon: 0.0,
            n_threads: 1,
            coo_initial_memory: MemorySize::default(),
            token_dictionary: None,
            min_occurrences: None,
            max_occurrences: None,
            min_frequency: None,
            max_frequency: None,
            min_document_occurrences: None,
            max_document_occurrences: None,
            min_document_frequency: None,
            max_document_frequency: None,
            max_unique_tokens: None,
            mask_token: None,
            nullify_mask: false,
        }
    }
}

impl CoocConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn window_radius(mut self, radius: usize) -> Self {
        self.window_radii = vec![radius];
        self
    }

    #[must_use]
    pub fn window_radii(mut self, radii: Vec<usize>) -> Self {
        self.window_radii = radii;
        self
    }

    #[must_use]
    pub fn window_orientation(mut self, orientation: Orientation) -> Self {
        self.window_orientations = vec![orientation];
        self
    }

    #[must_use]
    pub fn window_orientations(mut self, orientations: Vec<Orientation>) -> Self {
        self.window_orientations = orientations;
        self
    }

    #[must_use]
    pub fn window_function(mut self, function: WindowFunction) -> Self {
        self.window_functions = vec![function];
        self
    }

    #[must_use]
    pub fn window_functions(mut self, functions: Vec<WindowFunction>) -> Self {
        self.window_functions = functions;
        self
    }

    #[must_use]
    pub fn kernel(mut self, kernel: Kernel) -> Self {
        self.kernels = vec![kernel];
        self
    }

    #[must_use]
    pub fn kernels(mut self, kernels: Vec<Kernel>) -> Self {
        self.kernels = kernels;
        self
    }

    #[must_use]
    pub fn kernel_args(mut self, args: KernelParams) -> Self {
        self.kernel_args = vec![args];
        self
    }

    #[must_use]
    pub fn kernel_args_list(mut self, args: Vec<KernelParams>) -> Self {
        self.kernel_args = args;
        self
    }

    #[must_use]
    pub fn window_args(mut self, args: WindowParams) -> Self {
        self.window_args = vec![args];
        self
    }

    #[must_use]
    pub fn window_args_list(mut self, args: Vec<WindowParams>) -> Self {
        self.window_args = args;
        self
    }

    #[must_use]
    pub fn normalize_windows(mut self, normalize: bool) -> Self {
        self.normalize_windows = normalize;
        self
    }

    #[must_use]
    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    #[must_use]
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn n_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads.max(1);
        self
    }

    #[must_use]
    pub fn coo_initial_memory(mut self, budget: MemorySize) -> Self {
        self.coo_initial_memory = budget;
        self
    }

    #[must_use]
    pub fn token_dictionary(mut self, dictionary: BTreeMap<Token, u32>) -> Self {
        self.token_dictionary = Some(dictionary);
        self
    }

    #[must_use]
    pub fn min_occurrences(mut self, min: u64) -> Self {
        self.min_occurrences = Some(min);
        self
    }

    #[must_use]
    pub fn max_occurrences(mut self, max: u64) -> Self {
        self.max_occurrences = Some(max);
        self
    }

    #[must_use]
    pub fn min_frequency(mut self, min: f64) -> Self {
        self.min_frequency = Some(min);
        self
    }

    #[must_use]
    pub fn max_frequency(mut self, max: f64) -> Self {
        self.max_frequency = Some(max);
        self
    }

    #[must_use]
    pub fn min_document_occurrences(mut self, min: u64) -> Self {
        self.min_document_occurrences = Some(min);
        self
    }

    #[must_use]
    pub fn max_document_occurrences(mut self, max: u64) -> Self {
        self.max_document_occurrences = Some(max);
        self
    }

    #[must_use]
    pub fn min_document_frequency(mut self, min: f64) -> Self {
        self.min_document_frequency = Some(min);
        self
    }

    #[must_use]
    pub fn max_document_frequency(mut self, max: f64) -> Self {
        self.max_document_frequency = Some(max);
        self
    }

    #[must_use]
    pub fn max_unique_tokens(mut self, max: usize) -> Self {
        self.max_unique_tokens = Some(max);
        self
    }

    #[must_use]
    pub fn mask_token(mut self, mask: impl Into<Token>) -> Self {
        self.mask_token = Some(mask.into());
        self
    }

    #[must_use]
    pub fn nullify_mask(mut self, nullify: bool) -> Self {
        self.nullify_mask = nullify;
        self
    }

    /// Broadcast the parallel window parameter lists into resolved specs.
    pub(crate) fn build_specs(&self) -> Result<Vec<WindowSpec>> {
        if self.epsilon < 0.0 || !self.epsilon.is_finite() {
            return Err(CoocError::InvalidConfig(format!(
                "epsilon must be a finite non-negative number, got {}",
                self.epsilon
            )));
        }

        let lens = [
            ("window_radii", self.window_radii.len()),
            ("window_orientations", self.window_orientations.len()),
            ("window_functions", self.window_functions.len()),
            ("kernels", self.kernels.len()),
            ("kernel_args", self.kernel_args.len()),
            ("window_args", self.window_args.len()),
        ];
        let n = lens.iter().map(|&(_, l)| l).max().unwrap_or(0);
        if n == 0 {
            return Err(CoocError::WindowParamMismatch(
                "window parameter lists are empty".to_string(),
            ));
        }
        for &(name, len) in &lens {
            if len != 1 && len != n {
                return Err(CoocError::WindowParamMismatch(format!(
                    "{name} has {len} entries, expected 1 or {n}"
                )));
            }
        }

        fn pick<T: Clone>(list: &[T], i: usize) -> T {
            if list.len() == 1 {
                list[0].clone()
            } else {
                list[i].clone()
            }
        }

        Ok((0..n)
            .map(|i| WindowSpec {
                radius: pick(&self.window_radii, i),
                orientation: pick(&self.window_orientations, i),
                window_function: pick(&self.window_functions, i),
                kernel: pick(&self.kernels, i),
                kernel_params: pick(&self.kernel_args, i),
                window_params: pick(&self.window_args, i),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_size_parsing() {
        assert_eq!("4096".parse::<MemorySize>().unwrap(), MemorySize(4096));
        assert_eq!("1k".parse::<MemorySize>().unwrap(), MemorySize(1024));
        assert_eq!("1K".parse::<MemorySize>().unwrap(), MemorySize(1024));
        assert_eq!(
            "64M".parse::<MemorySize>().unwrap(),
            MemorySize(64 * 1024 * 1024)
        );
        assert_eq!(
            "0.5G".parse::<MemorySize>().unwrap(),
            MemorySize(512 * 1024 * 1024)
        );
        assert!("12Q".parse::<MemorySize>().is_err());
        assert!("-1k".parse::<MemorySize>().is_err());
    }

    #[test]
    fn test_default_is_single_directional_window() {
        let specs = CoocConfig::default().build_specs().unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].radius, 5);
        assert_eq!(specs[0].orientation, Orientation::Directional);
        assert_eq!(specs[0].kernel, Kernel::Flat);
        assert_eq!(specs[0].window_function, WindowFunction::Fixed);
    }

    #[test]
    fn test_broadcasting_scalar_against_list() {
        let specs = CoocConfig::default()
            .window_radii(vec![1, 3])
            .kernel(Kernel::Geometric)
            .build_specs()
            .unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].radius, 1);
        assert_eq!(specs[1].radius, 3);
        assert!(specs.iter().all(|s| s.kernel == Kernel::Geometric));
    }

    #[test]
    fn test_mismatched_lists_rejected() {
        let err = CoocConfig::default()
            .window_radii(vec![1, 2, 3])
            .kernels(vec![Kernel::Flat, Kernel::Harmonic])
            .build_specs()
            .unwrap_err();
        assert!(matches!(err, CoocError::WindowParamMismatch(_)));
    }

    #[test]
    fn test_negative_epsilon_rejected() {
        let err = CoocConfig::default().epsilon(-0.5).build_specs().unwrap_err();
        assert!(matches!(err, CoocError::InvalidConfig(_)));
    }
}
