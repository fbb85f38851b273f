//! Loader: read the three local input tables once, digest the raw bytes, and
//! parse them into typed rows for the pipeline. Also loads parameter files.

#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};

use em_core::variables::{self, Params};

use crate::hasher::{sha256_hex, InputDigests};
use crate::tables::{self, PreferenceRow, RatingRow, VacancyTable};
use crate::{IoError, IoResult};

/// Locations of the three input tables.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub vacancies: PathBuf,
    pub preferences: PathBuf,
    pub ratings: PathBuf,
}

/// Parsed tables plus digests of the exact bytes they were parsed from.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub vacancies: VacancyTable,
    pub preferences: Vec<PreferenceRow>,
    pub ratings: Vec<RatingRow>,
    pub digests: InputDigests,
}

fn read(path: &Path) -> IoResult<(String, Vec<u8>)> {
    let bytes = fs::read(path).map_err(|e| IoError::read(path, e))?;
    Ok((path.display().to_string(), bytes))
}

pub fn load_tables(paths: &InputPaths, genders_provided: bool) -> IoResult<LoadedTables> {
    let (v_label, v_bytes) = read(&paths.vacancies)?;
    let (p_label, p_bytes) = read(&paths.preferences)?;
    let (r_label, r_bytes) = read(&paths.ratings)?;

    let digests = InputDigests {
        vacancies_sha256: sha256_hex(&v_bytes),
        preferences_sha256: sha256_hex(&p_bytes),
        ratings_sha256: sha256_hex(&r_bytes),
    };

    Ok(LoadedTables {
        vacancies: tables::parse_vacancies(&v_label, &v_bytes, genders_provided)?,
        preferences: tables::parse_preferences(&p_label, &p_bytes)?,
        ratings: tables::parse_ratings(&r_label, &r_bytes)?,
        digests,
    })
}

/// Read a JSON parameter file; missing keys take defaults, unknown keys fail.
pub fn load_params(path: &Path) -> IoResult<Params> {
    let bytes = fs::read(path).map_err(|e| IoError::read(path, e))?;
    let params: Params = serde_json::from_slice(&bytes).map_err(|e| IoError::Json {
        pointer: path.display().to_string(),
        msg: e.to_string(),
    })?;
    variables::validate_domains(&params).map_err(|e| IoError::Validation {
        path: path.display().to_string(),
        line: 0,
        msg: e.to_string(),
    })?;
    Ok(params)
}
