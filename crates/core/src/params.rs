//! MaAsLin3 analysis parameters.
//!
//! The ten values are passed to the wrapper script positionally after the
//! three path arguments. The order of [`AnalysisParams::to_args`] is part of
//! the external contract with the R script and must only change together
//! with it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::CoreError;

/// Number of positional parameter arguments after the path arguments.
pub const PARAM_ARG_COUNT: usize = 10;

/// Field names accepted as request overrides, in command-line order.
pub const PARAM_NAMES: [&str; PARAM_ARG_COUNT] = [
    "formula",
    "normalization",
    "transform",
    "augment",
    "standardize",
    "max_significance",
    "median_comparison_abundance",
    "median_comparison_prevalence",
    "max_pngs",
    "cores",
];

// ---------------------------------------------------------------------------
// Enumerated options
// ---------------------------------------------------------------------------

/// Per-sample normalization applied before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Normalization {
    Tss,
    Clr,
    None,
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tss => "TSS",
            Self::Clr => "CLR",
            Self::None => "NONE",
        })
    }
}

impl FromStr for Normalization {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TSS" => Ok(Self::Tss),
            "CLR" => Ok(Self::Clr),
            "NONE" => Ok(Self::None),
            other => Err(CoreError::Validation(format!(
                "normalization must be one of TSS, CLR, NONE (got '{other}')"
            ))),
        }
    }
}

/// Transform applied to normalized abundances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transform {
    Log,
    Plog,
    None,
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Log => "LOG",
            Self::Plog => "PLOG",
            Self::None => "NONE",
        })
    }
}

impl FromStr for Transform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOG" => Ok(Self::Log),
            "PLOG" => Ok(Self::Plog),
            "NONE" => Ok(Self::None),
            other => Err(CoreError::Validation(format!(
                "transform must be one of LOG, PLOG, NONE (got '{other}')"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter record
// ---------------------------------------------------------------------------

/// Parameters forwarded to the MaAsLin3 wrapper script.
///
/// [`Default`] yields the standard configuration; a request that overrides
/// nothing produces exactly that argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnalysisParams {
    /// Model formula, e.g. `~ disease`.
    #[validate(length(min = 1, max = 1024))]
    pub formula: String,
    pub normalization: Normalization,
    pub transform: Transform,
    pub augment: bool,
    pub standardize: bool,
    /// q-value threshold for reporting associations.
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub max_significance: f64,
    pub median_comparison_abundance: bool,
    pub median_comparison_prevalence: bool,
    /// Upper bound on the number of PNG plots written.
    #[validate(range(max = 10000))]
    pub max_pngs: u32,
    #[validate(range(min = 1, max = 256))]
    pub cores: u32,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            formula: "~ disease".to_string(),
            normalization: Normalization::Tss,
            transform: Transform::Log,
            augment: true,
            standardize: true,
            max_significance: 0.1,
            median_comparison_abundance: true,
            median_comparison_prevalence: false,
            max_pngs: 250,
            cores: 1,
        }
    }
}

impl AnalysisParams {
    /// Apply a single named override.
    ///
    /// Returns `Ok(false)` when `name` is not a parameter so callers can
    /// ignore unrelated form fields.
    pub fn set(&mut self, name: &str, value: &str) -> Result<bool, CoreError> {
        match name {
            "formula" => self.formula = value.trim().to_string(),
            "normalization" => self.normalization = value.parse()?,
            "transform" => self.transform = value.parse()?,
            "augment" => self.augment = parse_flag(name, value)?,
            "standardize" => self.standardize = parse_flag(name, value)?,
            "max_significance" => self.max_significance = parse_number(name, value)?,
            "median_comparison_abundance" => {
                self.median_comparison_abundance = parse_flag(name, value)?
            }
            "median_comparison_prevalence" => {
                self.median_comparison_prevalence = parse_flag(name, value)?
            }
            "max_pngs" => self.max_pngs = parse_number(name, value)?,
            "cores" => self.cores = parse_number(name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Check every field against its allowed range.
    pub fn check(&self) -> Result<(), CoreError> {
        if !self.max_significance.is_finite() {
            return Err(CoreError::Validation(
                "max_significance must be a finite number".to_string(),
            ));
        }
        self.validate()
            .map_err(|e| CoreError::Validation(e.to_string()))
    }

    /// Stringify the parameters in command-line order.
    pub fn to_args(&self) -> [String; PARAM_ARG_COUNT] {
        [
            self.formula.clone(),
            self.normalization.to_string(),
            self.transform.to_string(),
            r_bool(self.augment),
            r_bool(self.standardize),
            self.max_significance.to_string(),
            r_bool(self.median_comparison_abundance),
            r_bool(self.median_comparison_prevalence),
            self.max_pngs.to_string(),
            self.cores.to_string(),
        ]
    }
}

/// R-style logical literal.
fn r_bool(value: bool) -> String {
    let literal = if value { "TRUE" } else { "FALSE" };
    literal.to_string()
}

fn parse_flag(name: &str, value: &str) -> Result<bool, CoreError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" => Ok(true),
        "false" | "f" | "0" | "no" => Ok(false),
        _ => Err(CoreError::Validation(format!(
            "{name} must be a boolean (got '{value}')"
        ))),
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("{name} must be a number (got '{value}')")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
