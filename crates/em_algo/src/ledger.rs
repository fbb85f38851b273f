//! CapacityLedger: per-group rooms split into male / female / unassigned pools.
//!
//! Contract:
//! - Quota split of a total `u` under proportion `p`:
//!     * male = female = round((1 - 4/3·p) · u)   (half away from zero)
//!     * unassigned    = u - male - female
//!   Any negative pool is a capacity configuration error.
//! - Redistribution (before any placement): when total rooms exceed the
//!   applicant count, the surplus `s` is removed as `s / 9` from every
//!   group (capped at what the group holds), then the leftover one unit per
//!   open group per pass, walking a seeded shuffle of the nine codes; the
//!   last partial pass takes the first open groups in shuffle order.
//!   No group total goes below zero and the trimmed capacity equals the
//!   applicant count. Every group is then re-split from its new total with
//!   the same formula.
//! - `can_take`: own-gender pool has room, or both gender pools are empty in
//!   every group and this group's unassigned pool has room.
//! - `take`: own-gender pool first, unassigned otherwise. Pools only decrease.
//!
//! Determinism:
//! - The only randomness is the remainder shuffle, driven by `ShuffleRng`.

use std::collections::BTreeMap;
use std::fmt;

use em_core::rng::ShuffleRng;
use em_core::{Gender, GroupCode, Pool, GROUP_COUNT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Deriving the split for `group` yielded a negative pool.
    NegativePool { group: GroupCode, total: i64 },
    /// `take` called for a group that cannot take this applicant.
    NoRoom { group: GroupCode, applicant: usize },
    /// `take` called twice for the same applicant.
    AlreadyPlaced { applicant: usize, group: GroupCode },
    /// Redistribution requested after placements were recorded.
    PlacementsExist,
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NegativePool { group, total } => {
                write!(f, "group {group}: quota split of total {total} yields a negative pool")
            }
            LedgerError::NoRoom { group, applicant } => {
                write!(f, "group {group} has no room for applicant #{applicant}")
            }
            LedgerError::AlreadyPlaced { applicant, group } => {
                write!(f, "applicant #{applicant} already placed in group {group}")
            }
            LedgerError::PlacementsExist => write!(f, "cannot redistribute after placements"),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Room counts of one group.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rooms {
    pub male: u32,
    pub female: u32,
    pub unassigned: u32,
}

impl Rooms {
    pub const fn new(male: u32, female: u32, unassigned: u32) -> Self {
        Self { male, female, unassigned }
    }

    /// Everything in the unassigned pool.
    pub const fn unassigned_only(unassigned: u32) -> Self {
        Self { male: 0, female: 0, unassigned }
    }

    #[inline]
    pub fn total(&self) -> u64 {
        u64::from(self.male) + u64::from(self.female) + u64::from(self.unassigned)
    }

    #[inline]
    pub fn get(&self, pool: Pool) -> u32 {
        match pool {
            Pool::Male => self.male,
            Pool::Female => self.female,
            Pool::Unassigned => self.unassigned,
        }
    }

    fn get_mut(&mut self, pool: Pool) -> &mut u32 {
        match pool {
            Pool::Male => &mut self.male,
            Pool::Female => &mut self.female,
            Pool::Unassigned => &mut self.unassigned,
        }
    }
}

/// Three-way split of `total` under maximal gender proportion `p`.
/// Returns `None` when any resulting pool would be negative.
pub fn split_total(total: i64, p: f64) -> Option<Rooms> {
    if total < 0 || !p.is_finite() {
        return None;
    }
    let share = (1.0 - 4.0 / 3.0 * p) * total as f64;
    let gendered = share.round() as i64;
    let unassigned = total - 2 * gendered;
    if gendered < 0 || unassigned < 0 {
        return None;
    }
    Some(Rooms::new(
        u32::try_from(gendered).ok()?,
        u32::try_from(gendered).ok()?,
        u32::try_from(unassigned).ok()?,
    ))
}

/// What a redistribution pass removed; reported in the run summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Redistribution {
    /// Total rooms minus applicant count, clamped at zero.
    pub surplus: u32,
    /// Flat share removed from every group, capped at the group's total.
    pub per_group: u32,
    /// Groups that lost one more unit in the final partial pass, in shuffle
    /// order. Whole passes over the open groups are not listed.
    pub remainder_groups: Vec<GroupCode>,
}

#[derive(Debug, Clone)]
pub struct CapacityLedger {
    rooms: [Rooms; GROUP_COUNT],
    /// Snapshot of `rooms` when placements began (after redistribution).
    original: [Rooms; GROUP_COUNT],
    /// Units drawn from each pool, per group.
    drawn: [Rooms; GROUP_COUNT],
    /// applicant index → (group, pool the unit came from).
    placements: BTreeMap<usize, (GroupCode, Pool)>,
}

impl CapacityLedger {
    /// Ledger from rows already split by gender.
    pub fn from_split(rooms: [Rooms; GROUP_COUNT]) -> Self {
        Self {
            rooms,
            original: rooms,
            drawn: [Rooms::default(); GROUP_COUNT],
            placements: BTreeMap::new(),
        }
    }

    /// Ledger from one total per group, split with the quota formula.
    pub fn from_totals(totals: [u32; GROUP_COUNT], p: f64) -> Result<Self, LedgerError> {
        let mut rooms = [Rooms::default(); GROUP_COUNT];
        for (g, (slot, &total)) in GroupCode::ALL.iter().zip(rooms.iter_mut().zip(&totals)) {
            *slot = split_total(i64::from(total), p)
                .ok_or(LedgerError::NegativePool { group: *g, total: i64::from(total) })?;
        }
        Ok(Self::from_split(rooms))
    }

    #[inline]
    pub fn remaining(&self, group: GroupCode) -> Rooms {
        self.rooms[group.index()]
    }

    #[inline]
    pub fn original(&self, group: GroupCode) -> Rooms {
        self.original[group.index()]
    }

    /// Units of `pool` in `group` consumed by placements so far.
    #[inline]
    pub fn placed_in(&self, group: GroupCode, pool: Pool) -> u32 {
        self.drawn[group.index()].get(pool)
    }

    pub fn total_remaining(&self) -> u64 {
        self.rooms.iter().map(Rooms::total).sum()
    }

    pub fn placed_count(&self) -> usize {
        self.placements.len()
    }

    /// applicant index → (group, pool), ascending by index.
    pub fn placements(&self) -> impl Iterator<Item = (usize, GroupCode, Pool)> + '_ {
        self.placements.iter().map(|(&ix, &(g, p))| (ix, g, p))
    }

    fn pool_sum(&self, pool: Pool) -> u64 {
        self.rooms.iter().map(|r| u64::from(r.get(pool))).sum()
    }

    pub fn can_take(&self, group: GroupCode, gender: Gender) -> bool {
        let rooms = &self.rooms[group.index()];
        if rooms.get(gender.into()) > 0 {
            return true;
        }
        self.pool_sum(gender.into()) == 0
            && self.pool_sum(gender.opposite().into()) == 0
            && rooms.unassigned > 0
    }

    /// Place `applicant` in `group`, returning the pool the unit was drawn from.
    pub fn take(&mut self, group: GroupCode, applicant: usize, gender: Gender) -> Result<Pool, LedgerError> {
        if let Some(&(g, _)) = self.placements.get(&applicant) {
            return Err(LedgerError::AlreadyPlaced { applicant, group: g });
        }
        if !self.can_take(group, gender) {
            return Err(LedgerError::NoRoom { group, applicant });
        }
        let own = Pool::from(gender);
        let pool = if self.rooms[group.index()].get(own) > 0 { own } else { Pool::Unassigned };
        *self.rooms[group.index()].get_mut(pool) -= 1;
        *self.drawn[group.index()].get_mut(pool) += 1;
        self.placements.insert(applicant, (group, pool));
        Ok(pool)
    }

    /// Trim surplus rooms down to `applicants` and re-split every group.
    pub fn redistribute(
        &mut self,
        applicants: usize,
        p: f64,
        rng: &mut ShuffleRng,
    ) -> Result<Redistribution, LedgerError> {
        if !self.placements.is_empty() {
            return Err(LedgerError::PlacementsExist);
        }

        let mut totals: [i64; GROUP_COUNT] = self.rooms.map(|r| r.total() as i64);
        let capacity: i64 = totals.iter().sum();
        let surplus = (capacity - applicants as i64).max(0);
        let per_group = surplus / GROUP_COUNT as i64;

        let mut left = surplus;
        for t in totals.iter_mut() {
            let cut = per_group.min(*t);
            *t -= cut;
            left -= cut;
        }

        let mut queue = GroupCode::ALL;
        rng.shuffle_in_place(&mut queue);
        let mut remainder_groups = Vec::new();
        while left > 0 {
            let open: Vec<GroupCode> = queue.iter().copied().filter(|g| totals[g.index()] > 0).collect();
            let Some(smallest) = open.iter().map(|g| totals[g.index()]).min() else {
                break;
            };
            let width = open.len() as i64;
            if left >= width {
                // Whole passes over the open groups at once.
                let step = (left / width).min(smallest);
                for g in &open {
                    totals[g.index()] -= step;
                }
                left -= step * width;
            } else {
                for g in &open[..left as usize] {
                    totals[g.index()] -= 1;
                    remainder_groups.push(*g);
                }
                left = 0;
            }
        }

        let mut rooms = [Rooms::default(); GROUP_COUNT];
        for (g, slot) in GroupCode::ALL.iter().zip(rooms.iter_mut()) {
            let total = totals[g.index()];
            *slot = split_total(total, p).ok_or(LedgerError::NegativePool { group: *g, total })?;
        }
        self.rooms = rooms;
        self.original = rooms;

        tracing::debug!(surplus, per_group, remainder = remainder_groups.len(), "capacity redistributed");
        Ok(Redistribution {
            surplus: u32::try_from(surplus).unwrap_or(u32::MAX),
            per_group: u32::try_from(per_group).unwrap_or(u32::MAX),
            remainder_groups,
        })
    }
}
