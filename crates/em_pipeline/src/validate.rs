//! crates/em_pipeline/src/validate.rs
//! Check inputs and parameters without matching.
//!
//! Structural problems (bad ranks, unknown group codes, duplicate names) are
//! fatal at load time and never reach this stage. What remains is reported
//! as issues: out-of-domain params and unusable capacity are errors;
//! excluded applicants, stray rating rows and a room deficit are warnings.
//! Issue order is stable: params, capacity, applicants, rating rows.

use serde::Serialize;

use em_core::variables::{self, Params};
use em_core::{ApplicantId, CoreError, GroupCode};
use em_algo::LedgerError;

use crate::{capacity, load, Diagnostics, PipelineCtx, PipelineError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum EntityRef {
    Root,
    Param(&'static str),
    Group(GroupCode),
    Applicant(ApplicantId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    #[serde(rename = "where")]
    pub where_: EntityRef,
}

/// pass = no `Error` issue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub pass: bool,
    pub applicants: usize,
    /// Rooms after quota split and redistribution; 0 when capacity failed.
    pub rooms: u64,
    pub diagnostics: Diagnostics,
    pub issues: Vec<ValidationIssue>,
}

fn issue(severity: Severity, code: &'static str, message: String, where_: EntityRef) -> ValidationIssue {
    ValidationIssue { severity, code, message, where_ }
}

fn param_issue(e: CoreError) -> ValidationIssue {
    let name = match e {
        CoreError::DomainOutOfRange(name) => name,
        _ => "params",
    };
    issue(Severity::Error, "param_domain", e.to_string(), EntityRef::Param(name))
}

fn capacity_issue(e: &LedgerError) -> ValidationIssue {
    let at = match e {
        LedgerError::NegativePool { group, .. } => EntityRef::Group(*group),
        _ => EntityRef::Root,
    };
    issue(Severity::Error, "capacity_configuration", e.to_string(), at)
}

pub fn validate(ctx: &PipelineCtx) -> Result<ValidationReport, PipelineError> {
    let params: &Params = &ctx.params;
    let mut issues = Vec::new();

    let params_ok = match variables::validate_domains(params) {
        Ok(()) => true,
        Err(e) => {
            issues.push(param_issue(e));
            false
        }
    };

    let (store, diagnostics) = load::build_store(&ctx.tables)?;
    let applicants = store.len();

    // A bad quota proportion makes any split meaningless.
    let mut rooms = 0;
    if params_ok {
        match capacity::prepare_ledger(&ctx.tables.vacancies, applicants, params) {
            Ok((ledger, _)) => {
                rooms = ledger.total_remaining();
                if rooms < applicants as u64 {
                    issues.push(issue(
                        Severity::Warning,
                        "capacity_deficit",
                        format!("{rooms} rooms for {applicants} applicants"),
                        EntityRef::Root,
                    ));
                }
            }
            Err(PipelineError::Capacity(e)) => issues.push(capacity_issue(&e)),
            Err(e) => return Err(e),
        }
    }

    for ex in &diagnostics.excluded {
        let reason = match &ex.reason {
            load::ExclusionReason::MissingRatings => "no rating row".to_string(),
            load::ExclusionReason::MalformedRatings { line, defect } => {
                format!("rating row at line {line}: {defect}")
            }
        };
        issues.push(issue(
            Severity::Warning,
            "excluded_applicant",
            reason,
            EntityRef::Applicant(ex.id.clone()),
        ));
    }
    for id in &diagnostics.unknown_rating_rows {
        issues.push(issue(
            Severity::Warning,
            "unknown_rating_row",
            "rating row names no known applicant".to_string(),
            EntityRef::Applicant(id.clone()),
        ));
    }

    let pass = !issues.iter().any(|i| i.severity == Severity::Error);
    tracing::info!(pass, issues = issues.len(), applicants, rooms, "validation done");
    Ok(ValidationReport { pass, applicants, rooms, diagnostics, issues })
}
