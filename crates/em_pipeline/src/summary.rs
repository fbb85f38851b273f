//! crates/em_pipeline/src/summary.rs
//! Run summary: typed mirror of the canonical JSON written next to the
//! assignment. Per-group maps are keyed by group code, so canonical key
//! order is A..J.

use std::collections::BTreeMap;

use serde::Serialize;

use em_algo::{MatchOutcome, Redistribution, ScoreReport, WEIGHTS};
use em_core::{GroupCode, Params, Pool, GROUP_COUNT};
use em_io::hasher::{sha256_hex, InputDigests};
use em_io::tables::assignment_bytes;

use crate::{Diagnostics, PipelineError};

#[derive(Debug, Clone, Serialize)]
pub struct PoolUsage {
    pub male: [u32; 2],
    pub female: [u32; 2],
    pub unassigned: [u32; 2],
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchingStats {
    pub placed: usize,
    pub rounds: u32,
    pub resets: u32,
    pub greased: u32,
    /// group → `[placed, original]` per pool.
    pub pools: BTreeMap<String, PoolUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedistributionEcho {
    pub surplus: u32,
    pub per_group: u32,
    pub remainder_groups: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreEcho {
    pub combined: f64,
    pub weights: [f64; 4],
    pub normalized_group_happiness: bool,
    pub applicant_average: f64,
    pub applicant_worst: f64,
    pub group_happiness: f64,
    pub group_fairness: f64,
    pub top_three_pct: f64,
    pub group_average_rating: f64,
    pub group_average_rating_score: f64,
    pub group_rating_variance: f64,
    pub per_group_average: BTreeMap<String, f64>,
    pub per_group_top_rated_pct: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub params: Params,
    pub inputs: InputDigests,
    pub assignment_sha256: String,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redistribution: Option<RedistributionEcho>,
    pub matching: MatchingStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<ScoreEcho>,
}

fn per_group(values: &[f64; GROUP_COUNT]) -> BTreeMap<String, f64> {
    GroupCode::ALL
        .iter()
        .map(|g| (g.as_str().to_string(), values[g.index()]))
        .collect()
}

impl From<&ScoreReport> for ScoreEcho {
    fn from(r: &ScoreReport) -> Self {
        Self {
            combined: r.combined,
            weights: WEIGHTS,
            normalized_group_happiness: r.normalized,
            applicant_average: r.applicant_average,
            applicant_worst: r.applicant_worst,
            group_happiness: r.group_happiness,
            group_fairness: r.group_fairness,
            top_three_pct: r.top_three_pct,
            group_average_rating: r.group_average_rating,
            group_average_rating_score: r.group_average_rating_score,
            group_rating_variance: r.group_rating_variance,
            per_group_average: per_group(&r.per_group_average),
            per_group_top_rated_pct: per_group(&r.per_group_top_rated_pct),
        }
    }
}

fn matching_stats(m: &MatchOutcome) -> MatchingStats {
    let pools = GroupCode::ALL
        .iter()
        .map(|&g| {
            let usage = |pool: Pool| [m.ledger.placed_in(g, pool), m.ledger.original(g).get(pool)];
            (
                g.as_str().to_string(),
                PoolUsage {
                    male: usage(Pool::Male),
                    female: usage(Pool::Female),
                    unassigned: usage(Pool::Unassigned),
                },
            )
        })
        .collect();
    MatchingStats {
        placed: m.assignment.len(),
        rounds: m.rounds,
        resets: m.resets,
        greased: m.greased,
        pools,
    }
}

pub fn build(
    params: &Params,
    digests: &InputDigests,
    diagnostics: &Diagnostics,
    redistribution: Option<&Redistribution>,
    matched: &MatchOutcome,
    report: Option<&ScoreReport>,
) -> Result<RunSummary, PipelineError> {
    let bytes = assignment_bytes(&matched.assignment)?;
    Ok(RunSummary {
        params: params.clone(),
        inputs: digests.clone(),
        assignment_sha256: sha256_hex(&bytes),
        diagnostics: diagnostics.clone(),
        redistribution: redistribution.map(|r| RedistributionEcho {
            surplus: r.surplus,
            per_group: r.per_group,
            remainder_groups: r.remainder_groups.iter().map(|g| g.as_str().to_string()).collect(),
        }),
        matching: matching_stats(matched),
        score: report.map(ScoreEcho::from),
    })
}

#[cfg(test)]
mod tests {
    use crate::{fixtures, run_with_ctx, PipelineCtx};
    use em_core::Params;
    use em_io::canonical_json::to_canonical_bytes;

    #[test]
    fn summary_serializes_canonically() {
        let ctx = PipelineCtx {
            tables: fixtures::tables(
                fixtures::TWO_GROUP_VACANCIES,
                fixtures::TWO_GROUP_PREFERENCES,
                fixtures::TWO_GROUP_RATINGS,
                true,
            ),
            params: Params { genders_provided: true, redistribute: false, ..Params::default() },
        };
        let out = run_with_ctx(&ctx).unwrap();
        let text = String::from_utf8(to_canonical_bytes(&out.summary).unwrap()).unwrap();
        assert!(text.starts_with(r#"{"assignment_sha256":""#));
        assert!(text.contains(r#""pools":{"A":{"female":[0,1],"male":[1,1],"unassigned":[0,0]}"#));
        assert!(text.contains(r#""weights":[0.5,0.1,0.2,0.2]"#));
        assert!(!text.contains("redistribution"));
        assert_eq!(out.summary.matching.placed, 2);
    }
}
