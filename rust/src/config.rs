//! Configuration types for the analysis.

use pyo3::prelude::*;

/// How the roots of a forest relate to each other in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RootPolicy {
    /// Root i starts when root i-1 finishes; tasks of different roots are ordered.
    #[default]
    Sequential,
    /// Every root starts at 0; tasks of different roots may run in parallel.
    Independent,
}

/// Configuration for a full analysis run.
#[pyclass]
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Whether the forest's roots are mutually independent graphs
    #[pyo3(get, set)]
    pub roots_independent: bool,
    /// Verbosity level: 0=silent, 1=summary, 2=checks, 3=debug
    #[pyo3(get, set)]
    pub verbosity: u8,
    /// Field written for a trip count that is not statically known
    #[pyo3(get, set)]
    pub not_constant_marker: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            roots_independent: false,
            verbosity: 0,
            not_constant_marker: "NC".to_string(),
        }
    }
}

impl AnalysisConfig {
    pub fn root_policy(&self) -> RootPolicy {
        if self.roots_independent {
            RootPolicy::Independent
        } else {
            RootPolicy::Sequential
        }
    }
}

#[pymethods]
impl AnalysisConfig {
    #[new]
    #[pyo3(signature = (roots_independent=None, verbosity=None, not_constant_marker=None))]
    fn new(
        roots_independent: Option<bool>,
        verbosity: Option<u8>,
        not_constant_marker: Option<String>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            roots_independent: roots_independent.unwrap_or(defaults.roots_independent),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
            not_constant_marker: not_constant_marker.unwrap_or(defaults.not_constant_marker),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "AnalysisConfig(roots_independent={}, verbosity={}, not_constant_marker={:?})",
            self.roots_independent, self.verbosity, self.not_constant_marker
        )
    }
}
