// crates/em_algo/src/lib.rs
#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use em_core::{ApplicantId, GroupCode};

/// Final mapping applicant → group. Keyed by name, so iteration order is the
/// persisted output order.
pub type Assignment = BTreeMap<ApplicantId, GroupCode>;

// ----------------------------- Data + bookkeeping --------------------------------------

pub mod preferences;
pub mod ledger;

// ----------------------------- Engines -------------------------------------------------

pub mod matching;
pub mod greasing;
pub mod scoring;

// Convenience re-exports (pipeline imports these from crate root)
pub use greasing::{find_candidates, grease, GreaseCandidate};
pub use ledger::{split_total, CapacityLedger, LedgerError, Redistribution, Rooms};
pub use matching::{MatchError, MatchOutcome, MatchingSession};
pub use preferences::{Applicant, PreferenceError, PreferenceStore, Profile};
pub use scoring::{score_assignment, ScoreError, ScoreReport, WEIGHTS};
