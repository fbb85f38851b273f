//! em_core — Core types, parameter domains, and the seeded shuffle RNG.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`em_algo`, `em_io`, `em_pipeline`, `em_cli`).
//!
//! - Applicant identity token: `ApplicantId`
//! - Fixed group codes `A..J` (nine groups), genders and capacity pools
//! - Validated `Ranking` (permutation of 1..=9) and `Rating` (1..=6)
//! - Run parameters (`Params`) with domain validation
//! - Seedable RNG (ChaCha20) for the capacity remainder shuffle
//!
//! Serialization derives are gated behind the `serde` feature.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidToken,
        InvalidGroupCode,
        InvalidGender,
        InvalidRanking,
        InvalidRating,
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidToken => write!(f, "invalid token"),
                CoreError::InvalidGroupCode => write!(f, "invalid group code"),
                CoreError::InvalidGender => write!(f, "invalid gender"),
                CoreError::InvalidRanking => write!(f, "ranking is not a permutation of 1..=9"),
                CoreError::InvalidRating => write!(f, "rating outside 1..=6"),
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    #[cfg(feature = "std")]
    impl std::error::Error for CoreError {}
}

pub mod tokens {
    //! Applicant identity token.

    use crate::errors::CoreError;
    use alloc::string::{String, ToString};
    use core::fmt;
    use core::str::FromStr;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    const MAX_TOKEN_LEN: usize = 256;

    /// Names come from free-form spreadsheets: accept anything printable, trimmed,
    /// non-empty and bounded. Control characters would break the CSV round-trip.
    fn is_token(s: &str) -> bool {
        let len = s.len();
        if !(1..=MAX_TOKEN_LEN).contains(&len) { return false; }
        s.trim() == s && !s.chars().any(|c| c.is_control())
    }

    /// Unique applicant name as it appears in the preference table.
    #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ApplicantId(String);

    impl ApplicantId {
        pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for ApplicantId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
    }

    impl FromStr for ApplicantId {
        type Err = CoreError;
        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let s = s.trim();
            if is_token(s) { Ok(Self(s.to_string())) } else { Err(CoreError::InvalidToken) }
        }
    }

    impl AsRef<str> for ApplicantId {
        fn as_ref(&self) -> &str { &self.0 }
    }
}

pub mod entities;
pub mod rng;
pub mod variables;

pub use entities::{Gender, GroupCode, Pool, Ranking, Rating, GROUP_COUNT};
pub use errors::CoreError;
pub use tokens::ApplicantId;
pub use variables::Params;
