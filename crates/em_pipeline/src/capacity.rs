//! crates/em_pipeline/src/capacity.rs
//! Vacancy table → `CapacityLedger`.
//!
//! Split rows are taken as-is; total rows go through the quota formula.
//! With `redistribute` on, surplus rooms are trimmed to the applicant count
//! and every group is re-split with the formula (even split rows), seeded by
//! `shuffle_seed`.

use em_algo::ledger::split_total;
use em_algo::{CapacityLedger, LedgerError, Redistribution, Rooms};
use em_core::rng::ShuffleRng;
use em_core::{GroupCode, Params, GROUP_COUNT};
use em_io::tables::{Capacity, VacancyTable};

use crate::PipelineError;

/// Initial per-group rooms before any redistribution.
pub fn initial_rooms(table: &VacancyTable, p: f64) -> Result<[Rooms; GROUP_COUNT], LedgerError> {
    let mut rooms = [Rooms::default(); GROUP_COUNT];
    for g in GroupCode::ALL {
        rooms[g.index()] = match table.get(g) {
            Capacity::Split { male, female, unassigned } => Rooms::new(male, female, unassigned),
            Capacity::Total(total) => split_total(i64::from(total), p)
                .ok_or(LedgerError::NegativePool { group: g, total: i64::from(total) })?,
        };
    }
    Ok(rooms)
}

pub fn prepare_ledger(
    table: &VacancyTable,
    applicants: usize,
    params: &Params,
) -> Result<(CapacityLedger, Option<Redistribution>), PipelineError> {
    let p = params.max_gender_proportion;
    let mut ledger = CapacityLedger::from_split(initial_rooms(table, p)?);

    let capacity = ledger.total_remaining();
    if capacity < applicants as u64 {
        tracing::warn!(capacity, applicants, "fewer rooms than applicants");
    }

    let redistribution = if params.redistribute {
        let mut rng = ShuffleRng::from_seed_u64(params.shuffle_seed);
        Some(ledger.redistribute(applicants, p, &mut rng)?)
    } else {
        None
    };
    Ok((ledger, redistribution))
}
