//! Greasing: single pre-pass placing mutual top-affinity pairs before matching.
//!
//! A (group, applicant) pair is a candidate when the group gave the maximal
//! rating (6) and the applicant ranks the group in their top three.
//! Groups are scanned A..J; a later candidate replaces an earlier one for the
//! same applicant only when the applicant ranks it strictly better.
//! Surviving candidates are placed in preference-table order, each only if the
//! group can still take the applicant; placed applicants leave the pool.

use std::collections::BTreeMap;

use em_core::entities::MAX_RATING;
use em_core::GroupCode;

use crate::ledger::LedgerError;
use crate::matching::MatchingSession;
use crate::preferences::{Applicant, PreferenceStore};

/// Highest rank that still counts as "top three".
pub const TOP_RANK: u8 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GreaseCandidate {
    /// Store index of the applicant.
    pub applicant: usize,
    pub group: GroupCode,
    /// Applicant's rank of `group`.
    pub rank: u8,
}

/// One candidate per applicant, ascending by store index.
pub fn find_candidates(store: &PreferenceStore, pool: &[Applicant]) -> Vec<GreaseCandidate> {
    let mut best: BTreeMap<usize, GreaseCandidate> = BTreeMap::new();
    for g in GroupCode::ALL {
        for a in pool {
            let Some(rank) = a.current_rank(g) else { continue };
            if store.rating(g, a.ix()) != MAX_RATING || rank > TOP_RANK {
                continue;
            }
            let cand = GreaseCandidate { applicant: a.ix(), group: g, rank };
            best.entry(a.ix())
                .and_modify(|held| {
                    if cand.rank < held.rank {
                        *held = cand;
                    }
                })
                .or_insert(cand);
        }
    }
    best.into_values().collect()
}

/// Run the pre-pass on a fresh session. Returns the number of placements.
pub fn grease(session: &mut MatchingSession<'_>) -> Result<u32, LedgerError> {
    let candidates = find_candidates(session.store, &session.unplaced);
    let mut placed = Vec::new();
    for c in &candidates {
        let Some(a) = session.unplaced.iter().find(|a| a.ix() == c.applicant) else { continue };
        if session.ledger.can_take(c.group, a.gender()) {
            session.ledger.take(c.group, c.applicant, a.gender())?;
            placed.push(c.applicant);
        }
    }
    session.unplaced.retain(|a| !placed.contains(&a.ix()));

    let n = placed.len() as u32;
    session.greased += n;
    tracing::debug!(candidates = candidates.len(), placed = n, "greasing pass done");
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{CapacityLedger, Rooms};
    use crate::preferences::tests::profile;
    use em_core::{Gender, Pool, GROUP_COUNT};

    fn ledger(entries: &[(GroupCode, Rooms)]) -> CapacityLedger {
        let mut rooms = [Rooms::default(); GROUP_COUNT];
        for &(g, r) in entries {
            rooms[g.index()] = r;
        }
        CapacityLedger::from_split(rooms)
    }

    #[test]
    fn mutual_top_pair_is_placed_before_matching() {
        // x ranks C first, C rates x 6.
        let store = PreferenceStore::from_profiles(vec![profile(
            "x",
            Gender::Female,
            [2, 3, 1, 4, 5, 6, 7, 8, 9],
            [1, 1, 6, 1, 1, 1, 1, 1, 1],
        )])
        .unwrap();
        let mut s = MatchingSession::new(&store, ledger(&[(GroupCode::C, Rooms::new(1, 1, 1))]));
        assert_eq!(grease(&mut s).unwrap(), 1);
        assert!(s.unplaced().is_empty());
        assert_eq!(s.ledger().placed_in(GroupCode::C, Pool::Female), 1);
        assert_eq!(s.ledger().placed_in(GroupCode::C, Pool::Unassigned), 0);
        assert_eq!(s.ledger().remaining(GroupCode::C), Rooms::new(1, 0, 1));

        let out = s.run().unwrap();
        assert_eq!(out.greased, 1);
        assert_eq!(out.rounds, 0);
        assert_eq!(out.assignment[&"x".parse().unwrap()], GroupCode::C);
    }

    #[test]
    fn better_ranked_candidate_wins() {
        // Both B (rank 3) and D (rank 2) gave a 6; D is preferred.
        let store = PreferenceStore::from_profiles(vec![profile(
            "y",
            Gender::Male,
            [1, 3, 4, 2, 5, 6, 7, 8, 9],
            [5, 6, 1, 6, 1, 1, 1, 1, 1],
        )])
        .unwrap();
        let s = MatchingSession::new(&store, ledger(&[]));
        let c = find_candidates(&store, s.unplaced());
        assert_eq!(c, vec![GreaseCandidate { applicant: 0, group: GroupCode::D, rank: 2 }]);
    }

    #[test]
    fn rank_four_or_rating_five_is_not_greasy() {
        let store = PreferenceStore::from_profiles(vec![
            profile("p", Gender::Male, [4, 1, 2, 3, 5, 6, 7, 8, 9], [6, 5, 5, 5, 1, 1, 1, 1, 1]),
        ])
        .unwrap();
        let s = MatchingSession::new(&store, ledger(&[]));
        assert!(find_candidates(&store, s.unplaced()).is_empty());
    }

    #[test]
    fn full_group_leaves_applicant_for_matching() {
        let store = PreferenceStore::from_profiles(vec![
            profile("a", Gender::Male, [1, 2, 3, 4, 5, 6, 7, 8, 9], [6; 9]),
            profile("b", Gender::Male, [1, 2, 3, 4, 5, 6, 7, 8, 9], [6; 9]),
        ])
        .unwrap();
        let mut s = MatchingSession::new(
            &store,
            ledger(&[(GroupCode::A, Rooms::new(1, 0, 0)), (GroupCode::B, Rooms::new(1, 0, 0))]),
        );
        assert_eq!(grease(&mut s).unwrap(), 1);
        assert_eq!(s.unplaced().len(), 1);
        assert_eq!(s.unplaced()[0].ix(), 1);

        let out = s.run().unwrap();
        assert_eq!(out.assignment[&"a".parse().unwrap()], GroupCode::A);
        assert_eq!(out.assignment[&"b".parse().unwrap()], GroupCode::B);
    }
}
