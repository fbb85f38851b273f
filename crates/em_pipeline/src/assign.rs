//! crates/em_pipeline/src/assign.rs
//! Optional greasing pre-pass, then deferred acceptance.

use em_algo::{grease, CapacityLedger, MatchError, MatchOutcome, MatchingSession, PreferenceStore};

use crate::PipelineError;

pub fn assign(
    store: &PreferenceStore,
    ledger: CapacityLedger,
    allow_greasing: bool,
) -> Result<MatchOutcome, PipelineError> {
    let mut session = MatchingSession::new(store, ledger);
    if allow_greasing {
        let placed = grease(&mut session).map_err(MatchError::from)?;
        tracing::info!(placed, "greasing placed applicants");
    }
    Ok(session.run()?)
}
