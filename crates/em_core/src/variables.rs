//! Run parameters with safe defaults and domain validation.
//!
//! Notes:
//! - `max_gender_proportion` must lie in `(0, 0.75]`; the quota formula
//!   `1 - 4/3·p` goes negative above 0.75.
//! - `shuffle_seed` only drives the remainder shuffle of capacity
//!   redistribution; two runs with the same inputs and seed are identical.
//! - `normalize_group_happiness` is off by default so combined scores stay
//!   comparable with historical results.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Default used by the selection run when no parameter file is given.
pub const DEFAULT_MAX_GENDER_PROPORTION: f64 = 0.55;

/// Upper bound of the `max_gender_proportion` domain (inclusive).
pub const MAX_GENDER_PROPORTION_CEILING: f64 = 0.75;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct Params {
    /// Vacancy rows already carry the male/female/unassigned split.
    pub genders_provided: bool,
    /// Maximal proportion of one gender within a group.
    pub max_gender_proportion: f64,
    /// Run the greasing pre-pass before matching.
    pub allow_greasing: bool,
    /// Trim surplus capacity down to the applicant count before matching.
    pub redistribute: bool,
    /// Seed for the remainder shuffle.
    pub shuffle_seed: u64,
    /// Rescale group happiness to 0..=100 inside the combined score.
    pub normalize_group_happiness: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            genders_provided: false,
            max_gender_proportion: DEFAULT_MAX_GENDER_PROPORTION,
            allow_greasing: true,
            redistribute: true,
            shuffle_seed: 0,
            normalize_group_happiness: false,
        }
    }
}

/// Reject parameter values outside their domains before any matching starts.
pub fn validate_domains(p: &Params) -> Result<(), CoreError> {
    let m = p.max_gender_proportion;
    if !m.is_finite() || m <= 0.0 || m > MAX_GENDER_PROPORTION_CEILING {
        return Err(CoreError::DomainOutOfRange("max_gender_proportion"));
    }
    Ok(())
}
