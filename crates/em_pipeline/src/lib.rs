//! em_pipeline — one matching run, end to end (load → validate → capacity → grease →
//! match → verify → score → summary), plus selection among candidate assignments.
//! File I/O stays in `em_io`; algorithms stay in `em_algo`.

use thiserror::Error;

use em_algo::{LedgerError, MatchError, PreferenceError, ScoreError};
use em_core::variables::{self, Params};
use em_core::CoreError;
use em_io::loader::LoadedTables;
use em_io::IoError;

pub mod assign;
pub mod capacity;
pub mod load;
pub mod score;
pub mod select;
pub mod summary;
pub mod validate;

pub use load::{Diagnostics, Excluded, ExclusionReason};
pub use select::{select_best, Candidate, Selection};
pub use summary::RunSummary;
pub use validate::{validate, ValidationReport};

/// Single error surface for the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Io(#[from] IoError),

    #[error("parameter error: {0}")]
    Params(#[from] CoreError),

    #[error("capacity configuration: {0}")]
    Capacity(#[from] LedgerError),

    #[error("preference table: {0}")]
    Preferences(#[from] PreferenceError),

    #[error("matching failed: {0}")]
    Matching(#[from] MatchError),

    #[error("scoring failed: {0}")]
    Scoring(#[from] ScoreError),

    #[error("no candidate assignment could be scored")]
    NoCandidates,
}

/// Inputs of one run: parsed tables and effective parameters.
#[derive(Debug, Clone)]
pub struct PipelineCtx {
    pub tables: LoadedTables,
    pub params: Params,
}

/// Everything one run produces.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub matched: em_algo::MatchOutcome,
    /// `None` when no applicant was eligible.
    pub report: Option<em_algo::ScoreReport>,
    pub diagnostics: Diagnostics,
    pub redistribution: Option<em_algo::Redistribution>,
    pub summary: RunSummary,
}

/// Run the whole pipeline on preloaded tables.
pub fn run_with_ctx(ctx: &PipelineCtx) -> Result<RunOutcome, PipelineError> {
    let params = &ctx.params;
    variables::validate_domains(params)?;

    // LOAD: join preferences and ratings; ineligible applicants go to diagnostics.
    let (store, diagnostics) = load::build_store(&ctx.tables)?;
    tracing::info!(
        applicants = store.len(),
        excluded = diagnostics.excluded.len(),
        "inputs loaded"
    );

    // CAPACITY: quota split, then optional redistribution.
    let (ledger, redistribution) = capacity::prepare_ledger(&ctx.tables.vacancies, store.len(), params)?;
    tracing::info!(rooms = ledger.total_remaining(), "capacity ready");

    // GREASE + MATCH
    let matched = assign::assign(&store, ledger, params.allow_greasing)?;
    tracing::info!(
        rounds = matched.rounds,
        resets = matched.resets,
        greased = matched.greased,
        "matching done"
    );

    // SCORE
    let report = score::score_if_any(&store, &matched.assignment, params.normalize_group_happiness)?;

    let summary = summary::build(
        params,
        &ctx.tables.digests,
        &diagnostics,
        redistribution.as_ref(),
        &matched,
        report.as_ref(),
    )?;

    Ok(RunOutcome { matched, report, diagnostics, redistribution, summary })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use em_io::hasher::InputDigests;
    use em_io::loader::LoadedTables;
    use em_io::tables::{parse_preferences, parse_ratings, parse_vacancies};

    /// Tables from literal CSV text; digests are placeholders.
    pub(crate) fn tables(vacancies: &str, preferences: &str, ratings: &str, genders_provided: bool) -> LoadedTables {
        LoadedTables {
            vacancies: parse_vacancies("v.csv", vacancies.as_bytes(), genders_provided).unwrap(),
            preferences: parse_preferences("p.csv", preferences.as_bytes()).unwrap(),
            ratings: parse_ratings("r.csv", ratings.as_bytes()).unwrap(),
            digests: InputDigests {
                vacancies_sha256: "v".into(),
                preferences_sha256: "p".into(),
                ratings_sha256: "r".into(),
            },
        }
    }

    /// Two applicants, two usable groups, everything else closed.
    pub(crate) const TWO_GROUP_VACANCIES: &str =
        "A,1,1,0\nB,1,1,0\nC,0,0,0\nD,0,0,0\nE,0,0,0\nF,0,0,0\nG,0,0,0\nH,0,0,0\nJ,0,0,0\n";
    pub(crate) const TWO_GROUP_PREFERENCES: &str = "x1,1,2,3,4,5,6,7,8,9,0\nx2,2,1,3,4,5,6,7,8,9,0\n";
    pub(crate) const TWO_GROUP_RATINGS: &str = "x1,6,5,1,1,1,1,1,1,1\nx2,5,6,1,1,1,1,1,1,1\n";
}
