//! PreferenceStore: the immutable input tables, plus the engine-side
//! `Applicant` whose ranking shrinks as groups reject it.
//!
//! Contract:
//! - A `Profile` is one eligible applicant: name, gender, the original ranking
//!   of the nine groups and the nine ratings the groups gave them.
//! - The store keeps profiles in input order; that order is the tie-break among
//!   equally rated proposers.
//! - Scoring reads profiles only; it never sees an `Applicant`'s current ranking.

use std::collections::BTreeMap;
use std::fmt;

use em_core::{ApplicantId, Gender, GroupCode, Ranking, Rating, GROUP_COUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceError {
    /// Two profiles share one name.
    DuplicateApplicant(ApplicantId),
}

impl fmt::Display for PreferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreferenceError::DuplicateApplicant(id) => write!(f, "duplicate applicant: {id}"),
        }
    }
}

impl std::error::Error for PreferenceError {}

/// Original, never-mutated input data for one applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: ApplicantId,
    pub gender: Gender,
    pub ranking: Ranking,
    /// Rating given by each group, indexed by `GroupCode::index()`.
    pub ratings: [Rating; GROUP_COUNT],
}

impl Profile {
    #[inline]
    pub fn rank_of(&self, group: GroupCode) -> u8 {
        self.ranking.rank_of(group)
    }

    #[inline]
    pub fn rating_from(&self, group: GroupCode) -> Rating {
        self.ratings[group.index()]
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreferenceStore {
    profiles: Vec<Profile>,
    index: BTreeMap<ApplicantId, usize>,
}

impl PreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a profile; input order is preserved.
    pub fn push(&mut self, profile: Profile) -> Result<usize, PreferenceError> {
        if self.index.contains_key(&profile.id) {
            return Err(PreferenceError::DuplicateApplicant(profile.id));
        }
        let ix = self.profiles.len();
        self.index.insert(profile.id.clone(), ix);
        self.profiles.push(profile);
        Ok(ix)
    }

    pub fn from_profiles<I>(profiles: I) -> Result<Self, PreferenceError>
    where
        I: IntoIterator<Item = Profile>,
    {
        let mut store = Self::new();
        for p in profiles {
            store.push(p)?;
        }
        Ok(store)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    #[inline]
    pub fn profile(&self, ix: usize) -> Option<&Profile> {
        self.profiles.get(ix)
    }

    pub fn lookup(&self, id: &ApplicantId) -> Option<&Profile> {
        self.index.get(id).and_then(|&ix| self.profiles.get(ix))
    }

    pub fn index_of(&self, id: &ApplicantId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Rating `group` gave the applicant at `ix`. Out-of-range indices rate lowest.
    #[inline]
    pub fn rating(&self, group: GroupCode, ix: usize) -> u8 {
        self.profiles
            .get(ix)
            .map(|p| p.rating_from(group).value())
            .unwrap_or(0)
    }
}

/* -------------------------------------------------------------------------- */
/*                              Engine-side state                             */
/* -------------------------------------------------------------------------- */

/// An unplaced applicant as the matching engine sees it.
///
/// `current[g] == None` means group `g` rejected this applicant in the
/// current cycle. Once every entry is `None` the next `favorite()` restores
/// the original snapshot.
#[derive(Debug, Clone)]
pub struct Applicant {
    ix: usize,
    gender: Gender,
    original: Ranking,
    current: [Option<u8>; GROUP_COUNT],
}

impl Applicant {
    pub fn new(ix: usize, profile: &Profile) -> Self {
        let mut a = Self {
            ix,
            gender: profile.gender,
            original: profile.ranking,
            current: [None; GROUP_COUNT],
        };
        a.reset();
        a
    }

    /// Index of the backing profile in the store.
    #[inline]
    pub fn ix(&self) -> usize {
        self.ix
    }

    #[inline]
    pub fn gender(&self) -> Gender {
        self.gender
    }

    #[inline]
    pub fn original(&self) -> &Ranking {
        &self.original
    }

    #[inline]
    pub fn current_rank(&self, group: GroupCode) -> Option<u8> {
        self.current[group.index()]
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.iter().all(Option::is_none)
    }

    pub fn reset(&mut self) {
        for (slot, &r) in self.current.iter_mut().zip(self.original.as_array()) {
            *slot = Some(r);
        }
    }

    pub fn reject(&mut self, group: GroupCode) {
        self.current[group.index()] = None;
    }

    /// Most preferred group not yet rejected in this cycle. Returns `true`
    /// alongside when the ranking had to be restored first.
    pub fn favorite(&mut self) -> (GroupCode, bool) {
        let reset = self.is_exhausted();
        if reset {
            self.reset();
        }
        let best = GroupCode::ALL
            .iter()
            .filter_map(|&g| self.current_rank(g).map(|r| (r, g)))
            .min()
            .map(|(_, g)| g);
        // A restored ranking is never empty.
        (best.unwrap_or(GroupCode::A), reset)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn profile(name: &str, gender: Gender, ranks: [u8; 9], ratings: [u8; 9]) -> Profile {
        Profile {
            id: name.parse().expect("id"),
            gender,
            ranking: Ranking::new(ranks).expect("ranking"),
            ratings: ratings.map(|r| Rating::new(r).expect("rating")),
        }
    }

    const IDENTITY: [u8; 9] = [1, 2, 3, 4, 5, 6, 7, 8, 9];

    #[test]
    fn duplicate_names_rejected() {
        let a = profile("ann", Gender::Female, IDENTITY, [3; 9]);
        let err = PreferenceStore::from_profiles(vec![a.clone(), a]).unwrap_err();
        assert_eq!(err, PreferenceError::DuplicateApplicant("ann".parse().unwrap()));
    }

    #[test]
    fn store_keeps_input_order() {
        let store = PreferenceStore::from_profiles(vec![
            profile("zed", Gender::Male, IDENTITY, [1; 9]),
            profile("amy", Gender::Female, IDENTITY, [6; 9]),
        ])
        .unwrap();
        assert_eq!(store.profile(0).unwrap().id.as_str(), "zed");
        assert_eq!(store.index_of(&"amy".parse().unwrap()), Some(1));
        assert_eq!(store.rating(GroupCode::C, 1), 6);
    }

    #[test]
    fn rejection_walks_down_the_ranking() {
        let p = profile("bo", Gender::Male, [2, 1, 3, 4, 5, 6, 7, 8, 9], [1; 9]);
        let mut a = Applicant::new(0, &p);
        assert_eq!(a.favorite(), (GroupCode::B, false));
        a.reject(GroupCode::B);
        assert_eq!(a.favorite(), (GroupCode::A, false));
        a.reject(GroupCode::A);
        assert_eq!(a.favorite(), (GroupCode::C, false));
    }

    #[test]
    fn exhausted_ranking_is_restored() {
        let p = profile("cy", Gender::Female, [9, 8, 7, 6, 5, 4, 3, 2, 1], [1; 9]);
        let mut a = Applicant::new(0, &p);
        for g in GroupCode::ALL {
            a.reject(g);
        }
        assert!(a.is_exhausted());
        assert_eq!(a.favorite(), (GroupCode::J, true));
        assert_eq!(a.current_rank(GroupCode::A), Some(9));
        assert_eq!(a.original().rank_of(GroupCode::J), 1);
    }
}
