//! Header-less CSV tables: vacancies, applicant preferences, group ratings,
//! and assignment files.
//!
//! Rules:
//! - Fields are trimmed; blank lines are skipped; rows may differ in width.
//! - Vacancies: `group, male, female, unassigned` when genders are provided,
//!   otherwise `group, total` or `group, _, _, total` (last column is the
//!   total). A group holds at most `u32::MAX` rooms in total. Every one of
//!   the nine groups exactly once.
//! - Preferences: `name, rA..rJ, gender`; ranks must be a permutation of 1..9.
//!   Any defect here is fatal.
//! - Ratings: `name, sA..sJ`. A defective row is not an error: it is returned
//!   with its defect so the caller can exclude the applicant.
//! - Assignments: `name, group`; only the first character of the group field
//!   counts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use em_core::entities::{MAX_RATING, MIN_RATING};
use em_core::{ApplicantId, Gender, GroupCode, Ranking, Rating, GROUP_COUNT};

use crate::canonical_json::write_atomic;
use crate::{IoError, IoResult};

/* -------------------------------------------------------------------------- */
/*                                   Types                                    */
/* -------------------------------------------------------------------------- */

/// Raw capacity of one group as written in the vacancy table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    Split { male: u32, female: u32, unassigned: u32 },
    Total(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VacancyTable {
    rows: [Capacity; GROUP_COUNT],
}

impl VacancyTable {
    pub fn new(rows: [Capacity; GROUP_COUNT]) -> Self {
        Self { rows }
    }

    pub fn get(&self, group: GroupCode) -> Capacity {
        self.rows[group.index()]
    }

    pub fn rows(&self) -> &[Capacity; GROUP_COUNT] {
        &self.rows
    }
}

/// One validated preference row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreferenceRow {
    pub line: u64,
    pub id: ApplicantId,
    pub gender: Gender,
    pub ranking: Ranking,
}

/// Why a rating row cannot be used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingDefect {
    /// Number of rating fields after the name, when not nine.
    WrongFieldCount(usize),
    /// A field that is not an integer in 1..=6.
    NotARating { group: GroupCode, value: String },
}

impl fmt::Display for RatingDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatingDefect::WrongFieldCount(n) => write!(f, "expected {GROUP_COUNT} ratings, found {n}"),
            RatingDefect::NotARating { group, value } => {
                write!(f, "rating for group {group} is not in {MIN_RATING}..={MAX_RATING}: {value:?}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatingRow {
    pub line: u64,
    pub id: ApplicantId,
    pub ratings: Result<[Rating; GROUP_COUNT], RatingDefect>,
}

/* -------------------------------------------------------------------------- */
/*                                  Helpers                                   */
/* -------------------------------------------------------------------------- */

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes)
}

fn csv_err(path: &str, e: csv::Error) -> IoError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    IoError::Csv { path: path.to_string(), line, msg: e.to_string() }
}

/// Non-blank records with their 1-based line numbers.
fn records(path: &str, bytes: &[u8]) -> IoResult<Vec<(u64, csv::StringRecord)>> {
    let mut out = Vec::new();
    for rec in reader(bytes).records() {
        let rec = rec.map_err(|e| csv_err(path, e))?;
        if rec.iter().all(str::is_empty) {
            continue;
        }
        let line = rec.position().map(|p| p.line()).unwrap_or(0);
        out.push((line, rec));
    }
    Ok(out)
}

fn read_bytes(path: &Path) -> IoResult<Vec<u8>> {
    fs::read(path).map_err(|e| IoError::read(path, e))
}

fn label(path: &Path) -> String {
    path.display().to_string()
}

fn parse_id(path: &str, line: u64, field: Option<&str>) -> IoResult<ApplicantId> {
    let raw = field.unwrap_or("");
    raw.parse()
        .map_err(|_| IoError::invalid(path, line, format!("invalid applicant name {raw:?}")))
}

/* -------------------------------------------------------------------------- */
/*                                 Vacancies                                  */
/* -------------------------------------------------------------------------- */

pub fn parse_vacancies(path: &str, bytes: &[u8], genders_provided: bool) -> IoResult<VacancyTable> {
    let mut rows: [Option<Capacity>; GROUP_COUNT] = [None; GROUP_COUNT];

    for (line, rec) in records(path, bytes)? {
        let code = rec.get(0).unwrap_or("");
        let group: GroupCode = code
            .parse()
            .map_err(|_| IoError::invalid(path, line, format!("unknown group code {code:?}")))?;

        let mut nums = Vec::with_capacity(3);
        for field in rec.iter().skip(1) {
            let n = field.parse::<u32>().map_err(|_| {
                IoError::invalid(path, line, format!("group {group}: room count {field:?} is not a non-negative integer"))
            })?;
            nums.push(n);
        }

        let cap = match (genders_provided, nums.as_slice()) {
            (true, &[male, female, unassigned]) => {
                let total = u64::from(male) + u64::from(female) + u64::from(unassigned);
                if total > u64::from(u32::MAX) {
                    return Err(IoError::invalid(
                        path,
                        line,
                        format!("group {group}: {total} rooms in total exceeds {}", u32::MAX),
                    ));
                }
                Capacity::Split { male, female, unassigned }
            }
            (false, &[total]) | (false, &[_, _, total]) => Capacity::Total(total),
            (true, _) => {
                return Err(IoError::invalid(
                    path,
                    line,
                    format!("group {group}: expected male, female and unassigned counts, found {} value(s)", nums.len()),
                ))
            }
            (false, _) => {
                return Err(IoError::invalid(
                    path,
                    line,
                    format!("group {group}: expected a total (1 or 3 values), found {} value(s)", nums.len()),
                ))
            }
        };

        if rows[group.index()].replace(cap).is_some() {
            return Err(IoError::invalid(path, line, format!("duplicate row for group {group}")));
        }
    }

    let mut out = [Capacity::Total(0); GROUP_COUNT];
    for g in GroupCode::ALL {
        out[g.index()] = rows[g.index()]
            .ok_or_else(|| IoError::invalid(path, 0, format!("missing row for group {g}")))?;
    }
    Ok(VacancyTable::new(out))
}

pub fn read_vacancies(path: &Path, genders_provided: bool) -> IoResult<VacancyTable> {
    parse_vacancies(&label(path), &read_bytes(path)?, genders_provided)
}

/* -------------------------------------------------------------------------- */
/*                                Preferences                                 */
/* -------------------------------------------------------------------------- */

const PREFERENCE_FIELDS: usize = 1 + GROUP_COUNT + 1;

pub fn parse_preferences(path: &str, bytes: &[u8]) -> IoResult<Vec<PreferenceRow>> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();

    for (line, rec) in records(path, bytes)? {
        if rec.len() != PREFERENCE_FIELDS {
            return Err(IoError::invalid(
                path,
                line,
                format!("expected name, {GROUP_COUNT} ranks and gender ({PREFERENCE_FIELDS} fields), found {}", rec.len()),
            ));
        }
        let id = parse_id(path, line, rec.get(0))?;

        let mut ranks = [0u8; GROUP_COUNT];
        for (g, slot) in GroupCode::ALL.iter().zip(ranks.iter_mut()) {
            let field = rec.get(1 + g.index()).unwrap_or("");
            *slot = field.parse().map_err(|_| {
                IoError::invalid(path, line, format!("{id}: rank for group {g} is not an integer: {field:?}"))
            })?;
        }
        let ranking = Ranking::new(ranks)
            .map_err(|_| IoError::invalid(path, line, format!("{id}: ranks are not a permutation of 1..9")))?;

        let raw_gender = rec.get(PREFERENCE_FIELDS - 1).unwrap_or("");
        let gender: Gender = raw_gender
            .parse()
            .map_err(|_| IoError::invalid(path, line, format!("{id}: gender must be 0 or 1, found {raw_gender:?}")))?;

        if !seen.insert(id.clone()) {
            return Err(IoError::invalid(path, line, format!("duplicate applicant {id}")));
        }
        out.push(PreferenceRow { line, id, gender, ranking });
    }
    Ok(out)
}

pub fn read_preferences(path: &Path) -> IoResult<Vec<PreferenceRow>> {
    parse_preferences(&label(path), &read_bytes(path)?)
}

/* -------------------------------------------------------------------------- */
/*                                  Ratings                                   */
/* -------------------------------------------------------------------------- */

fn parse_rating_fields(rec: &csv::StringRecord) -> Result<[Rating; GROUP_COUNT], RatingDefect> {
    let n = rec.len().saturating_sub(1);
    if n != GROUP_COUNT {
        return Err(RatingDefect::WrongFieldCount(n));
    }
    let mut out = [Rating::MAX; GROUP_COUNT];
    for (g, slot) in GroupCode::ALL.iter().zip(out.iter_mut()) {
        let field = rec.get(1 + g.index()).unwrap_or("");
        *slot = field
            .parse::<u8>()
            .ok()
            .and_then(|v| Rating::new(v).ok())
            .ok_or_else(|| RatingDefect::NotARating { group: *g, value: field.to_string() })?;
    }
    Ok(out)
}

/// Rating rows in file order. Malformed rows come back with their defect;
/// a second row for the same name is an error.
pub fn parse_ratings(path: &str, bytes: &[u8]) -> IoResult<Vec<RatingRow>> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for (line, rec) in records(path, bytes)? {
        let id = parse_id(path, line, rec.get(0))?;
        if !seen.insert(id.clone()) {
            return Err(IoError::invalid(path, line, format!("duplicate rating row for {id}")));
        }
        out.push(RatingRow { line, id, ratings: parse_rating_fields(&rec) });
    }
    Ok(out)
}

pub fn read_ratings(path: &Path) -> IoResult<Vec<RatingRow>> {
    parse_ratings(&label(path), &read_bytes(path)?)
}

/* -------------------------------------------------------------------------- */
/*                                Assignments                                 */
/* -------------------------------------------------------------------------- */

pub fn parse_assignment(path: &str, bytes: &[u8]) -> IoResult<BTreeMap<ApplicantId, GroupCode>> {
    let mut out = BTreeMap::new();
    for (line, rec) in records(path, bytes)? {
        if rec.len() < 2 {
            return Err(IoError::invalid(path, line, "expected name and group"));
        }
        let id = parse_id(path, line, rec.get(0))?;
        let raw = rec.get(1).unwrap_or("");
        let group = raw
            .chars()
            .next()
            .and_then(|c| c.to_string().parse::<GroupCode>().ok())
            .ok_or_else(|| IoError::invalid(path, line, format!("{id}: unknown group {raw:?}")))?;
        if out.insert(id.clone(), group).is_some() {
            return Err(IoError::invalid(path, line, format!("{id} assigned twice")));
        }
    }
    Ok(out)
}

pub fn read_assignment(path: &Path) -> IoResult<BTreeMap<ApplicantId, GroupCode>> {
    parse_assignment(&label(path), &read_bytes(path)?)
}

/// `name,group` per line, in the iteration order given (callers pass a
/// name-sorted map). No header.
pub fn assignment_bytes<'a, I>(entries: I) -> IoResult<Vec<u8>>
where
    I: IntoIterator<Item = (&'a ApplicantId, &'a GroupCode)>,
{
    let mut w = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    for (id, g) in entries {
        w.write_record([id.as_str(), g.as_str()])
            .map_err(|e| IoError::Write { path: "<buffer>".into(), msg: e.to_string() })?;
    }
    w.into_inner()
        .map_err(|e| IoError::Write { path: "<buffer>".into(), msg: e.to_string() })
}

pub fn write_assignment<'a, I>(path: &Path, entries: I) -> IoResult<()>
where
    I: IntoIterator<Item = (&'a ApplicantId, &'a GroupCode)>,
{
    let bytes = assignment_bytes(entries).map_err(|e| IoError::write(path, e))?;
    write_atomic(path, &bytes)
}
