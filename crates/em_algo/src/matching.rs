//! Round-based deferred acceptance over a `PreferenceStore` and a `CapacityLedger`.
//!
//! Each round:
//! - every unplaced applicant proposes to its favorite remaining group
//!   (an exhausted ranking is restored to the original first);
//! - groups A..J in turn sort their proposers by rating ↓ (stable, so equal
//!   ratings keep preference-table order) and accept while `can_take` holds;
//!   everyone else marks that group as rejected.
//!
//! Placements are final. The run stops when nobody is left unplaced, or fails
//! with `Unplaceable` when a round accepted nobody and no remaining applicant
//! fits any group (the ledger cannot change after such a round, so looping
//! would never end). A hard round cap backs this up.
//!
//! Postconditions are checked on the ledger, not assumed.

use std::cmp::Reverse;
use std::fmt;

use em_core::{ApplicantId, GroupCode, Pool, GROUP_COUNT};

use crate::ledger::{CapacityLedger, LedgerError};
use crate::preferences::{Applicant, PreferenceStore};
use crate::Assignment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// Applicants that no group can take any more.
    Unplaceable { remaining: Vec<ApplicantId>, rounds: u32 },
    /// A finished run broke one of its own guarantees.
    Postcondition(&'static str),
    Ledger(LedgerError),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Unplaceable { remaining, rounds } => {
                write!(f, "{} applicant(s) unplaceable after {rounds} round(s)", remaining.len())?;
                if let Some(first) = remaining.first() {
                    write!(f, " (first: {first})")?;
                }
                Ok(())
            }
            MatchError::Postcondition(what) => write!(f, "matching postcondition failed: {what}"),
            MatchError::Ledger(e) => write!(f, "ledger: {e}"),
        }
    }
}

impl std::error::Error for MatchError {}

impl From<LedgerError> for MatchError {
    fn from(e: LedgerError) -> Self {
        MatchError::Ledger(e)
    }
}

/// A finished run.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub assignment: Assignment,
    /// Deferred-acceptance rounds executed (greasing is not a round).
    pub rounds: u32,
    /// Ranking restorations after an applicant exhausted all nine groups.
    pub resets: u32,
    /// Applicants placed by the greasing pre-pass.
    pub greased: u32,
    /// Final ledger, for pool usage reporting.
    pub ledger: CapacityLedger,
}

/// Owned state of one matching run. Build, optionally grease, then `run`.
#[derive(Debug)]
pub struct MatchingSession<'a> {
    pub(crate) store: &'a PreferenceStore,
    pub(crate) ledger: CapacityLedger,
    /// Unplaced applicants, preference-table order.
    pub(crate) unplaced: Vec<Applicant>,
    pub(crate) greased: u32,
}

impl<'a> MatchingSession<'a> {
    /// Every profile in `store` enters the pool.
    pub fn new(store: &'a PreferenceStore, ledger: CapacityLedger) -> Self {
        let unplaced = store
            .profiles()
            .iter()
            .enumerate()
            .map(|(ix, p)| Applicant::new(ix, p))
            .collect();
        Self { store, ledger, unplaced, greased: 0 }
    }

    pub fn ledger(&self) -> &CapacityLedger {
        &self.ledger
    }

    pub fn unplaced(&self) -> &[Applicant] {
        &self.unplaced
    }

    fn round_cap(&self) -> u32 {
        let n = self.store.len() as u64;
        u32::try_from((n + 1) * 2 * GROUP_COUNT as u64).unwrap_or(u32::MAX)
    }

    fn stuck(&self) -> bool {
        !self
            .unplaced
            .iter()
            .any(|a| GroupCode::ALL.iter().any(|&g| self.ledger.can_take(g, a.gender())))
    }

    fn unplaceable(&self, rounds: u32) -> MatchError {
        let remaining: Vec<ApplicantId> = self
            .unplaced
            .iter()
            .filter_map(|a| self.store.profile(a.ix()).map(|p| p.id.clone()))
            .collect();
        tracing::warn!(remaining = remaining.len(), rounds, "matching cannot place remaining applicants");
        MatchError::Unplaceable { remaining, rounds }
    }

    /// One round; returns how many applicants were placed and how many
    /// rankings had to be restored.
    fn round(&mut self) -> Result<(usize, u32), LedgerError> {
        let mut proposals: [Vec<usize>; GROUP_COUNT] = Default::default();
        let mut resets = 0u32;
        for (k, a) in self.unplaced.iter_mut().enumerate() {
            let (g, reset) = a.favorite();
            if reset {
                resets += 1;
            }
            proposals[g.index()].push(k);
        }

        let mut accepted = vec![false; self.unplaced.len()];
        for g in GroupCode::ALL {
            let proposers = &mut proposals[g.index()];
            let store = self.store;
            let unplaced = &self.unplaced;
            proposers.sort_by_key(|&k| Reverse(store.rating(g, unplaced[k].ix())));
            for &k in proposers.iter() {
                let a = &mut self.unplaced[k];
                if self.ledger.can_take(g, a.gender()) {
                    self.ledger.take(g, a.ix(), a.gender())?;
                    accepted[k] = true;
                } else {
                    a.reject(g);
                }
            }
        }

        let placed = accepted.iter().filter(|&&x| x).count();
        let mut flags = accepted.into_iter();
        self.unplaced.retain(|_| !flags.next().unwrap_or(false));
        Ok((placed, resets))
    }

    /// Run rounds until everyone is placed.
    pub fn run(mut self) -> Result<MatchOutcome, MatchError> {
        let (rounds, resets) = self.drive()?;
        let assignment = self.verify()?;
        Ok(MatchOutcome {
            assignment,
            rounds,
            resets,
            greased: self.greased,
            ledger: self.ledger,
        })
    }

    /// Round loop; returns rounds executed and rankings restored.
    fn drive(&mut self) -> Result<(u32, u32), MatchError> {
        let cap = self.round_cap();
        let mut rounds = 0u32;
        let mut resets = 0u32;

        while !self.unplaced.is_empty() {
            if rounds >= cap {
                return Err(self.unplaceable(rounds));
            }
            rounds += 1;
            let (placed, reset_now) = self.round()?;
            resets += reset_now;
            tracing::debug!(round = rounds, placed, left = self.unplaced.len(), resets = reset_now, "round done");

            if placed == 0 && !self.unplaced.is_empty() && self.stuck() {
                return Err(self.unplaceable(rounds));
            }
        }
        Ok((rounds, resets))
    }

    /// Every applicant placed exactly once, pools within their original size.
    fn verify(&self) -> Result<Assignment, MatchError> {
        if self.ledger.placed_count() != self.store.len() {
            return Err(MatchError::Postcondition("placed count differs from applicant count"));
        }
        for g in GroupCode::ALL {
            for pool in Pool::ALL {
                if self.ledger.placed_in(g, pool) > self.ledger.original(g).get(pool) {
                    return Err(MatchError::Postcondition("pool over capacity"));
                }
            }
        }
        let mut assignment = Assignment::new();
        for (ix, g, _) in self.ledger.placements() {
            let p = self
                .store
                .profile(ix)
                .ok_or(MatchError::Postcondition("placement for unknown applicant"))?;
            if assignment.insert(p.id.clone(), g).is_some() {
                return Err(MatchError::Postcondition("applicant placed twice"));
            }
        }
        if assignment.len() != self.store.len() {
            return Err(MatchError::Postcondition("assignment size differs from applicant count"));
        }
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Rooms;
    use crate::preferences::tests::profile;
    use em_core::Gender;
    use proptest::prelude::*;

    fn rooms_with(entries: &[(GroupCode, Rooms)]) -> [Rooms; GROUP_COUNT] {
        let mut rooms = [Rooms::default(); GROUP_COUNT];
        for &(g, r) in entries {
            rooms[g.index()] = r;
        }
        rooms
    }

    #[test]
    fn two_groups_perfect_match() {
        let store = PreferenceStore::from_profiles(vec![
            profile("x1", Gender::Male, [1, 2, 3, 4, 5, 6, 7, 8, 9], [6, 5, 1, 1, 1, 1, 1, 1, 1]),
            profile("x2", Gender::Male, [2, 1, 3, 4, 5, 6, 7, 8, 9], [5, 6, 1, 1, 1, 1, 1, 1, 1]),
        ])
        .unwrap();
        let ledger = CapacityLedger::from_split(rooms_with(&[
            (GroupCode::A, Rooms::new(1, 1, 0)),
            (GroupCode::B, Rooms::new(1, 1, 0)),
        ]));
        let out = MatchingSession::new(&store, ledger).run().unwrap();
        assert_eq!(out.rounds, 1);
        assert_eq!(out.assignment[&"x1".parse().unwrap()], GroupCode::A);
        assert_eq!(out.assignment[&"x2".parse().unwrap()], GroupCode::B);
        assert_eq!(out.ledger.placed_in(GroupCode::A, Pool::Male), 1);
    }

    #[test]
    fn higher_rating_wins_contested_room() {
        let store = PreferenceStore::from_profiles(vec![
            profile("low", Gender::Female, [1, 2, 3, 4, 5, 6, 7, 8, 9], [2; 9]),
            profile("high", Gender::Female, [1, 2, 3, 4, 5, 6, 7, 8, 9], [5; 9]),
        ])
        .unwrap();
        let ledger = CapacityLedger::from_split(rooms_with(&[
            (GroupCode::A, Rooms::new(0, 1, 0)),
            (GroupCode::B, Rooms::new(0, 1, 0)),
        ]));
        let out = MatchingSession::new(&store, ledger).run().unwrap();
        assert_eq!(out.assignment[&"high".parse().unwrap()], GroupCode::A);
        assert_eq!(out.assignment[&"low".parse().unwrap()], GroupCode::B);
        assert_eq!(out.rounds, 2);
    }

    #[test]
    fn equal_ratings_keep_table_order() {
        let store = PreferenceStore::from_profiles(vec![
            profile("second", Gender::Male, [1, 2, 3, 4, 5, 6, 7, 8, 9], [4; 9]),
            profile("first", Gender::Male, [1, 2, 3, 4, 5, 6, 7, 8, 9], [4; 9]),
        ])
        .unwrap();
        let ledger = CapacityLedger::from_split(rooms_with(&[
            (GroupCode::A, Rooms::new(1, 0, 0)),
            (GroupCode::B, Rooms::new(1, 0, 0)),
        ]));
        let out = MatchingSession::new(&store, ledger).run().unwrap();
        assert_eq!(out.assignment[&"second".parse().unwrap()], GroupCode::A);
        assert_eq!(out.assignment[&"first".parse().unwrap()], GroupCode::B);
    }

    #[test]
    fn exhausted_applicant_resets_and_uses_overflow() {
        // "m" is turned away by A while a female room remains; once "f" takes
        // it, only A's unassigned room is left and m gets it after a reset.
        let store = PreferenceStore::from_profiles(vec![
            profile("f", Gender::Female, [1, 2, 3, 4, 5, 6, 7, 8, 9], [1; 9]),
            profile("m", Gender::Male, [1, 2, 3, 4, 5, 6, 7, 8, 9], [6; 9]),
        ])
        .unwrap();
        let ledger = CapacityLedger::from_split(rooms_with(&[(GroupCode::A, Rooms::new(0, 1, 1))]));
        let out = MatchingSession::new(&store, ledger).run().unwrap();
        assert_eq!(out.assignment[&"m".parse().unwrap()], GroupCode::A);
        assert_eq!(out.assignment[&"f".parse().unwrap()], GroupCode::A);
        assert_eq!(out.resets, 1);
        assert_eq!(out.rounds, 10);
        assert_eq!(out.ledger.placed_in(GroupCode::A, Pool::Unassigned), 1);
    }

    #[test]
    fn gender_locked_capacity_is_unplaceable() {
        let store = PreferenceStore::from_profiles(vec![profile(
            "solo",
            Gender::Male,
            [1, 2, 3, 4, 5, 6, 7, 8, 9],
            [3; 9],
        )])
        .unwrap();
        let ledger = CapacityLedger::from_split(rooms_with(&[(GroupCode::A, Rooms::new(0, 1, 0))]));
        match MatchingSession::new(&store, ledger).run() {
            Err(MatchError::Unplaceable { remaining, rounds }) => {
                assert_eq!(remaining, vec!["solo".parse::<ApplicantId>().unwrap()]);
                assert_eq!(rounds, 1);
            }
            other => panic!("expected Unplaceable, got {other:?}"),
        }
    }

    #[test]
    fn empty_store_finishes_immediately() {
        let store = PreferenceStore::new();
        let out = MatchingSession::new(&store, CapacityLedger::from_split([Rooms::default(); GROUP_COUNT]))
            .run()
            .unwrap();
        assert!(out.assignment.is_empty());
        assert_eq!(out.rounds, 0);
    }

    fn arb_profile() -> impl Strategy<Value = ([u8; 9], [u8; 9], bool)> {
        (
            Just((1u8..=9).collect::<Vec<u8>>()).prop_shuffle(),
            proptest::collection::vec(1u8..=6, 9),
            any::<bool>(),
        )
            .prop_map(|(ranks, ratings, female)| {
                let mut r = [0u8; 9];
                r.copy_from_slice(&ranks);
                let mut s = [0u8; 9];
                s.copy_from_slice(&ratings);
                (r, s, female)
            })
    }

    proptest! {
        #[test]
        fn overflow_capacity_places_everyone(
            people in proptest::collection::vec(arb_profile(), 1..40),
            spread in proptest::collection::vec(0u32..6, GROUP_COUNT),
        ) {
            let store = PreferenceStore::from_profiles(people.iter().enumerate().map(|(i, (r, s, female))| {
                profile(&format!("a{i:03}"), if *female { Gender::Female } else { Gender::Male }, *r, *s)
            })).unwrap();

            // Unassigned-only rooms with at least one per applicant.
            let mut rooms = [Rooms::default(); GROUP_COUNT];
            for (slot, &extra) in rooms.iter_mut().zip(&spread) {
                *slot = Rooms::unassigned_only(extra);
            }
            let have: u64 = rooms.iter().map(Rooms::total).sum();
            rooms[0].unassigned += (store.len() as u64).saturating_sub(have) as u32;

            let a = MatchingSession::new(&store, CapacityLedger::from_split(rooms)).run().unwrap();
            let b = MatchingSession::new(&store, CapacityLedger::from_split(rooms)).run().unwrap();
            prop_assert_eq!(a.assignment.len(), store.len());
            prop_assert_eq!(&a.assignment, &b.assignment);
            for g in GroupCode::ALL {
                let in_g = a.assignment.values().filter(|&&x| x == g).count() as u64;
                prop_assert!(in_g <= rooms[g.index()].total());
            }
        }

        #[test]
        fn gendered_pools_place_all_or_name_the_stuck(
            people in proptest::collection::vec(arb_profile(), 1..30),
            caps in proptest::collection::vec((0u32..3, 0u32..3, 0u32..3), GROUP_COUNT),
        ) {
            let store = PreferenceStore::from_profiles(people.iter().enumerate().map(|(i, (r, s, female))| {
                profile(&format!("a{i:03}"), if *female { Gender::Female } else { Gender::Male }, *r, *s)
            })).unwrap();
            let mut rooms = [Rooms::default(); GROUP_COUNT];
            for (slot, &(m, f, u)) in rooms.iter_mut().zip(&caps) {
                *slot = Rooms::new(m, f, u);
            }

            let females = people.iter().filter(|p| p.2).count() as u64;
            let males = people.len() as u64 - females;
            let male_rooms: u64 = rooms.iter().map(|r| u64::from(r.male)).sum();
            let female_rooms: u64 = rooms.iter().map(|r| u64::from(r.female)).sum();

            let mut session = MatchingSession::new(&store, CapacityLedger::from_split(rooms));
            match session.drive() {
                Ok(_) => {
                    let assignment = session.verify().unwrap();
                    prop_assert_eq!(assignment.len(), store.len());
                }
                Err(MatchError::Unplaceable { remaining, .. }) => {
                    prop_assert!(male_rooms < males || female_rooms < females);
                    prop_assert_eq!(remaining.len(), session.unplaced.len());
                    prop_assert!(!remaining.is_empty());

                    // Recomputed from pool counts alone, without `can_take`.
                    let ledger = session.ledger();
                    let sum = |pool: Pool| -> u64 {
                        GroupCode::ALL.iter().map(|&g| u64::from(ledger.remaining(g).get(pool))).sum()
                    };
                    let gendered_left = sum(Pool::Male) + sum(Pool::Female);
                    for a in &session.unplaced {
                        let own = Pool::from(a.gender());
                        let fits = GroupCode::ALL.iter().any(|&g| {
                            let r = ledger.remaining(g);
                            r.get(own) > 0 || (gendered_left == 0 && r.unassigned > 0)
                        });
                        prop_assert!(!fits);
                    }
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }
    }
}
