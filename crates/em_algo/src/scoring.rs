//! ScoringEngine: quality of a finished assignment against the original tables.
//!
//! Weighted metrics (all over the assigned applicants):
//! - applicant average  = (9 - mean rank) / 8 · 100
//! - applicant worst    = (9 - max rank) / 8 · 100
//! - group happiness    = share rated > 3, a fraction in [0, 1]
//! - group fairness     = (1 - min(var, 0.4) / 0.4) · 100, where `var` is the
//!   mean squared distance of the nine per-group average ratings (empty group
//!   → 0) from the mean rating over all applicants
//! - combined           = 0.5·avg + 0.1·worst + 0.2·happiness + 0.2·fairness
//!
//! Group happiness enters the combined score unscaled unless `normalize` is set,
//! which multiplies it by 100 first. Audit-only metrics ride along and never
//! enter the combined score.

use std::fmt;

use em_core::entities::{MAX_RANK, MAX_RATING};
use em_core::{ApplicantId, GroupCode, GROUP_COUNT};

use crate::preferences::PreferenceStore;
use crate::Assignment;

/// Weights of (applicant average, applicant worst, group happiness, group fairness).
pub const WEIGHTS: [f64; 4] = [0.5, 0.1, 0.2, 0.2];

/// Variance at which group fairness bottoms out.
pub const MAX_VARIANCE: f64 = 0.4;

/// Ratings strictly above this count as "happy".
const HAPPY_ABOVE: u8 = 3;
/// Ranks strictly below this count as "top three".
const TOP_THREE_BELOW: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    EmptyAssignment,
    /// Assignment names an applicant absent from the preference tables.
    UnknownApplicant(ApplicantId),
}

impl fmt::Display for ScoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreError::EmptyAssignment => write!(f, "cannot score an empty assignment"),
            ScoreError::UnknownApplicant(id) => write!(f, "assignment names unknown applicant: {id}"),
        }
    }
}

impl std::error::Error for ScoreError {}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    pub applicants: usize,
    pub applicant_average: f64,
    pub applicant_worst: f64,
    /// Fraction in [0, 1].
    pub group_happiness: f64,
    pub group_fairness: f64,
    pub combined: f64,
    /// Group happiness was rescaled to [0, 100] inside `combined`.
    pub normalized: bool,

    // Audit-only.
    pub top_three_pct: f64,
    pub group_average_rating: f64,
    pub group_average_rating_score: f64,
    pub group_rating_variance: f64,
    pub per_group_average: [f64; GROUP_COUNT],
    pub per_group_top_rated_pct: [f64; GROUP_COUNT],
}

/// Score `assignment` against the original rankings and ratings in `store`.
pub fn score_assignment(
    store: &PreferenceStore,
    assignment: &Assignment,
    normalize: bool,
) -> Result<ScoreReport, ScoreError> {
    if assignment.is_empty() {
        return Err(ScoreError::EmptyAssignment);
    }

    let mut rank_sum = 0u64;
    let mut worst_rank = 0u8;
    let mut top_three = 0usize;
    let mut happy = 0usize;
    let mut rating_sum = 0u64;
    let mut group_sum = [0u64; GROUP_COUNT];
    let mut group_n = [0usize; GROUP_COUNT];
    let mut group_happy = [0usize; GROUP_COUNT];

    for (id, &g) in assignment {
        let p = store
            .lookup(id)
            .ok_or_else(|| ScoreError::UnknownApplicant(id.clone()))?;
        let rank = p.rank_of(g);
        let rating = p.rating_from(g).value();

        rank_sum += u64::from(rank);
        worst_rank = worst_rank.max(rank);
        if rank < TOP_THREE_BELOW {
            top_three += 1;
        }
        rating_sum += u64::from(rating);
        group_sum[g.index()] += u64::from(rating);
        group_n[g.index()] += 1;
        if rating > HAPPY_ABOVE {
            happy += 1;
            group_happy[g.index()] += 1;
        }
    }

    let n = assignment.len() as f64;
    let max_rank = f64::from(MAX_RANK);
    let span = max_rank - 1.0;

    let applicant_average = (max_rank - rank_sum as f64 / n) / span * 100.0;
    let applicant_worst = (max_rank - f64::from(worst_rank)) / span * 100.0;
    let group_happiness = happy as f64 / n;

    let mut per_group_average = [0.0; GROUP_COUNT];
    let mut per_group_top_rated_pct = [0.0; GROUP_COUNT];
    for g in GroupCode::ALL {
        let i = g.index();
        if group_n[i] > 0 {
            per_group_average[i] = group_sum[i] as f64 / group_n[i] as f64;
            per_group_top_rated_pct[i] = group_happy[i] as f64 / group_n[i] as f64 * 100.0;
        }
    }

    let global = rating_sum as f64 / n;
    let variance = per_group_average
        .iter()
        .map(|avg| (avg - global).powi(2))
        .sum::<f64>()
        / GROUP_COUNT as f64;
    let group_fairness = (1.0 - variance.min(MAX_VARIANCE) / MAX_VARIANCE) * 100.0;

    let happiness_term = if normalize { group_happiness * 100.0 } else { group_happiness };
    let combined = WEIGHTS[0] * applicant_average
        + WEIGHTS[1] * applicant_worst
        + WEIGHTS[2] * happiness_term
        + WEIGHTS[3] * group_fairness;

    Ok(ScoreReport {
        applicants: assignment.len(),
        applicant_average,
        applicant_worst,
        group_happiness,
        group_fairness,
        combined,
        normalized: normalize,
        top_three_pct: top_three as f64 / n * 100.0,
        group_average_rating: global,
        group_average_rating_score: global / f64::from(MAX_RATING) * 100.0,
        group_rating_variance: variance,
        per_group_average,
        per_group_top_rated_pct,
    })
}
