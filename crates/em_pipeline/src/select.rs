//! crates/em_pipeline/src/select.rs
//! Pick the best of several candidate assignments by combined score.
//!
//! Candidates are scored against the same original tables. The highest
//! combined score wins; on equal scores the earliest candidate is kept.
//! A candidate that leaves an eligible applicant unplaced, or that cannot be
//! scored, is reported and skipped.

use em_algo::{Assignment, PreferenceStore, ScoreReport};

use crate::{run_with_ctx, score, PipelineCtx, PipelineError, RunOutcome};

/// A named assignment competing for selection.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub name: String,
    pub assignment: Assignment,
}

#[derive(Debug, Clone)]
pub struct Scored {
    /// Position in the candidate list.
    pub candidate: usize,
    pub name: String,
    pub report: ScoreReport,
}

#[derive(Debug, Clone)]
pub struct Selection {
    /// Scored candidates, input order.
    pub scored: Vec<Scored>,
    /// Index into `scored` of the winner.
    pub best: usize,
    /// Incomplete or unscorable candidates, with the reason.
    pub rejected: Vec<(String, String)>,
}

impl Selection {
    pub fn winner(&self) -> Option<&Scored> {
        self.scored.get(self.best)
    }
}

pub fn select_best(
    store: &PreferenceStore,
    candidates: &[Candidate],
    normalize: bool,
) -> Result<Selection, PipelineError> {
    let mut scored: Vec<Scored> = Vec::with_capacity(candidates.len());
    let mut rejected = Vec::new();
    let mut best: Option<usize> = None;

    for (ix, c) in candidates.iter().enumerate() {
        let missing = score::missing_applicants(store, &c.assignment);
        if let Some(first) = missing.first() {
            let reason = format!("leaves {} eligible applicant(s) unplaced (first: {first})", missing.len());
            tracing::warn!(candidate = %c.name, missing = missing.len(), "incomplete candidate skipped");
            rejected.push((c.name.clone(), reason));
            continue;
        }
        match score::score_external(store, &c.assignment, normalize) {
            Ok(report) => {
                tracing::info!(candidate = %c.name, combined = report.combined, "candidate scored");
                let better = best.map_or(true, |b| report.combined > scored[b].report.combined);
                scored.push(Scored { candidate: ix, name: c.name.clone(), report });
                if better {
                    best = Some(scored.len() - 1);
                }
            }
            Err(e) => {
                tracing::warn!(candidate = %c.name, error = %e, "candidate skipped");
                rejected.push((c.name.clone(), e.to_string()));
            }
        }
    }

    let best = best.ok_or(PipelineError::NoCandidates)?;
    Ok(Selection { scored, best, rejected })
}

/// Names of the two engine variants the selection always runs.
pub const WITH_GREASING: &str = "matching_greasing";
pub const WITHOUT_GREASING: &str = "matching_no_greasing";

/// Run the engine with and without greasing (other parameters unchanged).
/// Each variant succeeds or fails on its own.
pub fn run_engine_variants(ctx: &PipelineCtx) -> Vec<(String, Result<RunOutcome, PipelineError>)> {
    [(WITH_GREASING, true), (WITHOUT_GREASING, false)]
        .into_iter()
        .map(|(name, greasing)| {
            let variant = PipelineCtx {
                tables: ctx.tables.clone(),
                params: em_core::Params { allow_greasing: greasing, ..ctx.params.clone() },
            };
            (name.to_string(), run_with_ctx(&variant))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{fixtures, load};
    use em_core::GroupCode;

    fn store() -> PreferenceStore {
        let t = fixtures::tables(
            fixtures::TWO_GROUP_VACANCIES,
            fixtures::TWO_GROUP_PREFERENCES,
            fixtures::TWO_GROUP_RATINGS,
            true,
        );
        load::build_store(&t).unwrap().0
    }

    fn cand(name: &str, x1: GroupCode, x2: GroupCode) -> Candidate {
        let mut assignment = Assignment::new();
        assignment.insert("x1".parse().unwrap(), x1);
        assignment.insert("x2".parse().unwrap(), x2);
        Candidate { name: name.into(), assignment }
    }

    #[test]
    fn highest_combined_score_wins() {
        let s = store();
        let cands = vec![
            cand("swapped", GroupCode::B, GroupCode::A),
            cand("ideal", GroupCode::A, GroupCode::B),
        ];
        let sel = select_best(&s, &cands, false).unwrap();
        assert_eq!(sel.winner().unwrap().name, "ideal");
        assert_eq!(sel.scored.len(), 2);
    }

    #[test]
    fn ties_keep_the_earliest_and_bad_candidates_are_skipped() {
        let s = store();
        let mut ghost = cand("ghost", GroupCode::A, GroupCode::B);
        ghost.assignment.insert("casper".parse().unwrap(), GroupCode::C);
        let cands = vec![
            ghost,
            cand("first", GroupCode::A, GroupCode::B),
            cand("second", GroupCode::A, GroupCode::B),
        ];
        let sel = select_best(&s, &cands, false).unwrap();
        assert_eq!(sel.winner().unwrap().name, "first");
        assert_eq!(sel.winner().unwrap().candidate, 1);
        assert_eq!(sel.rejected.len(), 1);
        assert_eq!(sel.rejected[0].0, "ghost");
    }

    #[test]
    fn partial_candidates_cannot_win() {
        let s = store();
        let mut partial = cand("partial", GroupCode::A, GroupCode::B);
        partial.assignment.remove(&"x2".parse().unwrap());
        let cands = vec![partial, cand("swapped", GroupCode::B, GroupCode::A)];
        let sel = select_best(&s, &cands, false).unwrap();
        assert_eq!(sel.winner().unwrap().name, "swapped");
        assert_eq!(sel.scored.len(), 1);
        assert_eq!(sel.rejected.len(), 1);
        assert_eq!(sel.rejected[0].0, "partial");
        assert!(sel.rejected[0].1.contains("1 eligible applicant(s) unplaced (first: x2)"));
    }

    #[test]
    fn nothing_scorable_is_an_error() {
        assert!(matches!(select_best(&store(), &[], false), Err(PipelineError::NoCandidates)));
        let mut empty = cand("empty", GroupCode::A, GroupCode::B);
        empty.assignment.clear();
        assert!(matches!(select_best(&store(), &[empty], false), Err(PipelineError::NoCandidates)));
    }

    #[test]
    fn engine_variants_both_run() {
        let ctx = PipelineCtx {
            tables: fixtures::tables(
                fixtures::TWO_GROUP_VACANCIES,
                fixtures::TWO_GROUP_PREFERENCES,
                fixtures::TWO_GROUP_RATINGS,
                true,
            ),
            params: em_core::Params { genders_provided: true, redistribute: false, ..Default::default() },
        };
        let v = run_engine_variants(&ctx);
        assert_eq!(v[0].0, WITH_GREASING);
        assert_eq!(v[0].1.as_ref().unwrap().matched.greased, 2);
        assert_eq!(v[1].1.as_ref().unwrap().matched.greased, 0);
    }
}
