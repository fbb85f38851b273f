//! Domain entities: group codes, genders, capacity pools, rankings and ratings.
//!
//! Every applicant ranks all nine groups (1 = most preferred). Every group rates
//! the applicants it interviewed on a 1..=6 scale (6 = most wanted).

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Number of groups. Preference rows are always exactly this wide.
pub const GROUP_COUNT: usize = 9;

/// Lowest (best) rank an applicant can give.
pub const MIN_RANK: u8 = 1;
/// Highest (worst) rank an applicant can give.
pub const MAX_RANK: u8 = GROUP_COUNT as u8;

/// Lowest rating a group can give.
pub const MIN_RATING: u8 = 1;
/// Highest rating a group can give; greasing keys on this value.
pub const MAX_RATING: u8 = 6;

/* -------------------------------------------------------------------------- */
/*                                  GroupCode                                 */
/* -------------------------------------------------------------------------- */

/// The nine fixed group codes. There is no `I`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GroupCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    J,
}

impl GroupCode {
    /// Canonical order; also the column order of every input table.
    pub const ALL: [GroupCode; GROUP_COUNT] = [
        GroupCode::A,
        GroupCode::B,
        GroupCode::C,
        GroupCode::D,
        GroupCode::E,
        GroupCode::F,
        GroupCode::G,
        GroupCode::H,
        GroupCode::J,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn from_index(ix: usize) -> Option<Self> {
        Self::ALL.get(ix).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupCode::A => "A",
            GroupCode::B => "B",
            GroupCode::C => "C",
            GroupCode::D => "D",
            GroupCode::E => "E",
            GroupCode::F => "F",
            GroupCode::G => "G",
            GroupCode::H => "H",
            GroupCode::J => "J",
        }
    }
}

impl fmt::Display for GroupCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupCode {
    type Err = CoreError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(CoreError::InvalidGroupCode);
        };
        match c.to_ascii_uppercase() {
            'A' => Ok(GroupCode::A),
            'B' => Ok(GroupCode::B),
            'C' => Ok(GroupCode::C),
            'D' => Ok(GroupCode::D),
            'E' => Ok(GroupCode::E),
            'F' => Ok(GroupCode::F),
            'G' => Ok(GroupCode::G),
            'H' => Ok(GroupCode::H),
            'J' => Ok(GroupCode::J),
            _ => Err(CoreError::InvalidGroupCode),
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                               Gender and Pool                              */
/* -------------------------------------------------------------------------- */

/// Protected attribute used for the gender quota.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }
}

impl FromStr for Gender {
    type Err = CoreError;

    /// Wire form is `0` (male) / `1` (female); `M`/`F` are accepted as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" | "M" | "m" => Ok(Gender::Male),
            "1" | "F" | "f" => Ok(Gender::Female),
            _ => Err(CoreError::InvalidGender),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Gender::Male => "M",
            Gender::Female => "F",
        })
    }
}

/// One of the three capacity buckets every group carries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Pool {
    Male,
    Female,
    Unassigned,
}

impl Pool {
    pub const ALL: [Pool; 3] = [Pool::Male, Pool::Female, Pool::Unassigned];
}

impl From<Gender> for Pool {
    fn from(g: Gender) -> Self {
        match g {
            Gender::Male => Pool::Male,
            Gender::Female => Pool::Female,
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                              Ranking and Rating                            */
/* -------------------------------------------------------------------------- */

/// An applicant's ranking of the nine groups, indexed by `GroupCode::index()`.
///
/// Invariant: the ranks form a permutation of `1..=9`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Ranking([u8; GROUP_COUNT]);

impl Ranking {
    pub fn new(ranks: [u8; GROUP_COUNT]) -> Result<Self, CoreError> {
        let mut seen = [false; GROUP_COUNT];
        for &r in &ranks {
            if !(MIN_RANK..=MAX_RANK).contains(&r) {
                return Err(CoreError::InvalidRanking);
            }
            let slot = &mut seen[(r - MIN_RANK) as usize];
            if *slot {
                return Err(CoreError::InvalidRanking);
            }
            *slot = true;
        }
        Ok(Self(ranks))
    }

    #[inline]
    pub fn rank_of(&self, group: GroupCode) -> u8 {
        self.0[group.index()]
    }

    #[inline]
    pub fn as_array(&self) -> &[u8; GROUP_COUNT] {
        &self.0
    }
}

/// A group's rating of an applicant, `1..=6`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Rating(u8);

impl Rating {
    pub const MAX: Rating = Rating(MAX_RATING);

    pub fn new(v: u8) -> Result<Self, CoreError> {
        if (MIN_RATING..=MAX_RATING).contains(&v) { Ok(Self(v)) } else { Err(CoreError::InvalidRating) }
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn group_codes_parse_case_insensitively() {
        assert_eq!("a".parse::<GroupCode>(), Ok(GroupCode::A));
        assert_eq!(" J ".parse::<GroupCode>(), Ok(GroupCode::J));
        assert_eq!("I".parse::<GroupCode>(), Err(CoreError::InvalidGroupCode));
        assert_eq!("AB".parse::<GroupCode>(), Err(CoreError::InvalidGroupCode));
        assert_eq!("".parse::<GroupCode>(), Err(CoreError::InvalidGroupCode));
    }

    #[test]
    fn group_index_round_trips() {
        for (i, g) in GroupCode::ALL.iter().enumerate() {
            assert_eq!(g.index(), i);
            assert_eq!(GroupCode::from_index(i), Some(*g));
        }
        assert_eq!(GroupCode::from_index(GROUP_COUNT), None);
    }

    #[test]
    fn gender_wire_tokens() {
        assert_eq!("0".parse::<Gender>(), Ok(Gender::Male));
        assert_eq!("1".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("F".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!("2".parse::<Gender>(), Err(CoreError::InvalidGender));
        assert_eq!(Gender::Male.opposite(), Gender::Female);
        assert_eq!(Pool::from(Gender::Female), Pool::Female);
    }

    #[test]
    fn ranking_requires_permutation() {
        assert!(Ranking::new([1, 2, 3, 4, 5, 6, 7, 8, 9]).is_ok());
        assert!(Ranking::new([9, 8, 7, 6, 5, 4, 3, 2, 1]).is_ok());
        assert_eq!(Ranking::new([1, 1, 3, 4, 5, 6, 7, 8, 9]), Err(CoreError::InvalidRanking));
        assert_eq!(Ranking::new([0, 2, 3, 4, 5, 6, 7, 8, 9]), Err(CoreError::InvalidRanking));
        assert_eq!(Ranking::new([10, 2, 3, 4, 5, 6, 7, 8, 1]), Err(CoreError::InvalidRanking));
    }

    #[test]
    fn rank_lookup_by_group() {
        let r = Ranking::new([3, 1, 2, 4, 5, 6, 7, 8, 9]).unwrap();
        assert_eq!(r.rank_of(GroupCode::A), 3);
        assert_eq!(r.rank_of(GroupCode::B), 1);
        assert_eq!(r.rank_of(GroupCode::J), 9);
    }

    #[test]
    fn rating_bounds() {
        assert!(Rating::new(1).is_ok());
        assert_eq!(Rating::new(6).unwrap(), Rating::MAX);
        assert_eq!(Rating::new(0), Err(CoreError::InvalidRating));
        assert_eq!(Rating::new(7), Err(CoreError::InvalidRating));
    }

    proptest! {
        #[test]
        fn any_permutation_is_a_ranking(
            ranks in Just((1u8..=9).collect::<Vec<u8>>()).prop_shuffle(),
        ) {
            let mut arr = [0u8; GROUP_COUNT];
            arr.copy_from_slice(&ranks);
            let r = Ranking::new(arr).unwrap();
            for (g, &rank) in GroupCode::ALL.iter().zip(&arr) {
                prop_assert_eq!(r.rank_of(*g), rank);
            }
        }

        #[test]
        fn repeated_rank_is_rejected(
            ranks in Just((1u8..=9).collect::<Vec<u8>>()).prop_shuffle(),
            from in 0usize..GROUP_COUNT,
            to in 0usize..GROUP_COUNT,
        ) {
            prop_assume!(from != to);
            let mut arr = [0u8; GROUP_COUNT];
            arr.copy_from_slice(&ranks);
            arr[to] = arr[from];
            prop_assert_eq!(Ranking::new(arr), Err(CoreError::InvalidRanking));
        }

        #[test]
        fn rating_accepts_exactly_one_to_six(v in any::<u8>()) {
            prop_assert_eq!(Rating::new(v).is_ok(), (1..=6).contains(&v));
        }
    }
}
