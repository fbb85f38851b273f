//! crates/em_pipeline/src/load.rs
//! Join the preference and rating tables into a `PreferenceStore`.
//!
//! Applicants without a usable rating row are excluded from matching and
//! listed in `Diagnostics`; nobody disappears silently. Rating rows naming
//! nobody in the preference table are listed too, then ignored.

use std::collections::BTreeMap;

use serde::Serialize;

use em_algo::{PreferenceStore, Profile};
use em_core::ApplicantId;
use em_io::loader::LoadedTables;
use em_io::tables::RatingDefect;

use crate::PipelineError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExclusionReason {
    /// No rating row for this applicant.
    MissingRatings,
    /// A rating row exists but is unusable.
    MalformedRatings { line: u64, defect: RatingDefect },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Excluded {
    pub id: ApplicantId,
    pub reason: ExclusionReason,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    /// Preference-table order.
    pub excluded: Vec<Excluded>,
    /// Rating rows for unknown applicants, file order.
    pub unknown_rating_rows: Vec<ApplicantId>,
}

pub fn build_store(tables: &LoadedTables) -> Result<(PreferenceStore, Diagnostics), PipelineError> {
    let mut diagnostics = Diagnostics::default();

    let mut ratings = BTreeMap::new();
    for row in &tables.ratings {
        ratings.insert(&row.id, row);
    }

    let mut store = PreferenceStore::new();
    for pref in &tables.preferences {
        let reason = match ratings.remove(&pref.id) {
            None => ExclusionReason::MissingRatings,
            Some(row) => match &row.ratings {
                Ok(r) => {
                    store.push(Profile {
                        id: pref.id.clone(),
                        gender: pref.gender,
                        ranking: pref.ranking,
                        ratings: *r,
                    })?;
                    continue;
                }
                Err(defect) => ExclusionReason::MalformedRatings { line: row.line, defect: defect.clone() },
            },
        };
        tracing::warn!(applicant = %pref.id, ?reason, "applicant excluded from matching");
        diagnostics.excluded.push(Excluded { id: pref.id.clone(), reason });
    }

    // Whatever is left was never claimed by a preference row.
    let mut unknown: Vec<_> = ratings.into_values().collect();
    unknown.sort_by_key(|r| r.line);
    for row in unknown {
        tracing::warn!(applicant = %row.id, line = row.line, "rating row for unknown applicant ignored");
        diagnostics.unknown_rating_rows.push(row.id.clone());
    }

    Ok((store, diagnostics))
}
