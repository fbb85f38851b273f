// crates/em_cli/src/main.rs
//
// `em` entry point: parse args, install logging, dispatch a subcommand, map
// typed errors to exit codes. Diagnostics go to stderr; stdout carries the
// machine-readable result (score JSON, selection table, validation report).

mod args;
mod telemetry;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const CAPACITY: i32 = 3;
    pub const IO: i32 = 4;
    pub const MATCHING: i32 = 5;
    pub const SCORING: i32 = 6;
}

use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Command, InputArgs, ParamArgs};

use em_core::Params;
use em_io::canonical_json::{to_canonical_bytes, write_canonical_file};
use em_io::loader;
use em_io::tables::{read_assignment, write_assignment};
use em_io::IoError;
use em_pipeline::score::score_external;
use em_pipeline::select::{run_engine_variants, Candidate};
use em_pipeline::summary::ScoreEcho;
use em_pipeline::{load, run_with_ctx, select_best, validate, PipelineCtx, PipelineError};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Input shape, params, logging filter
    Validation(String),
    /// Negative quota split
    Capacity(String),
    /// Read/write failures
    Io(String),
    /// Unplaceable applicants or a failed postcondition
    Matching(String),
    Scoring(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m)
            | MainError::Capacity(m)
            | MainError::Io(m)
            | MainError::Matching(m)
            | MainError::Scoring(m) => f.write_str(m),
        }
    }
}

fn main() -> ExitCode {
    let cli = match parse_cli() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("em: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };

    if let Err(e) = telemetry::init(cli.log_level.as_deref()) {
        eprintln!("em: error: {e}");
        return ExitCode::from(exitcodes::VALIDATION as u8);
    }

    let rc = match dispatch(cli.command) {
        Ok(rc) => rc,
        Err(e) => {
            eprintln!("em: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

fn dispatch(cmd: Command) -> Result<i32, MainError> {
    match cmd {
        Command::Run { inputs, params, out, summary } => {
            run_once(&inputs, &params, &out, summary.as_deref())
        }
        Command::Score { inputs, params, assignment } => score_file(&inputs, &params, &assignment),
        Command::Select { inputs, params, candidates, out } => select(&inputs, &params, &candidates, &out),
        Command::Validate { inputs, params } => validate_only(&inputs, &params),
    }
}

fn load_ctx(inputs: &InputArgs, params: &ParamArgs) -> Result<PipelineCtx, MainError> {
    let params: Params = params.resolve().map_err(map_io_err)?;
    let tables = loader::load_tables(&inputs.paths(), params.genders_provided).map_err(map_io_err)?;
    Ok(PipelineCtx { tables, params })
}

fn print_bytes(bytes: &[u8]) {
    println!("{}", String::from_utf8_lossy(bytes));
}

fn run_once(inputs: &InputArgs, params: &ParamArgs, out: &Path, summary: Option<&Path>) -> Result<i32, MainError> {
    let ctx = load_ctx(inputs, params)?;
    let outcome = run_with_ctx(&ctx).map_err(map_pipeline_err)?;

    write_assignment(out, &outcome.matched.assignment).map_err(map_io_err)?;
    if let Some(path) = summary {
        write_canonical_file(path, &outcome.summary).map_err(map_io_err)?;
    }

    let combined = outcome.report.as_ref().map(|r| r.combined).unwrap_or(0.0);
    println!(
        "placed {} of {} applicants; combined score {combined:.4}",
        outcome.matched.assignment.len(),
        outcome.matched.assignment.len() + outcome.diagnostics.excluded.len(),
    );
    Ok(exitcodes::OK)
}

fn score_file(inputs: &InputArgs, params: &ParamArgs, assignment: &Path) -> Result<i32, MainError> {
    let ctx = load_ctx(inputs, params)?;
    let (store, _) = load::build_store(&ctx.tables).map_err(map_pipeline_err)?;
    let assignment = read_assignment(assignment).map_err(map_io_err)?;
    let report = score_external(&store, &assignment, ctx.params.normalize_group_happiness)
        .map_err(map_pipeline_err)?;
    let bytes = to_canonical_bytes(&ScoreEcho::from(&report)).map_err(map_io_err)?;
    print_bytes(&bytes);
    Ok(exitcodes::OK)
}

fn select(inputs: &InputArgs, params: &ParamArgs, files: &[std::path::PathBuf], out: &Path) -> Result<i32, MainError> {
    let ctx = load_ctx(inputs, params)?;
    let (store, _) = load::build_store(&ctx.tables).map_err(map_pipeline_err)?;

    let mut candidates = Vec::new();
    for (name, result) in run_engine_variants(&ctx) {
        match result {
            Ok(outcome) => candidates.push(Candidate { name, assignment: outcome.matched.assignment }),
            Err(e) => {
                tracing::warn!(variant = %name, error = %e, "engine variant failed");
                println!("{name}\tfailed: {e}");
            }
        }
    }
    for path in files {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let assignment = read_assignment(path).map_err(map_io_err)?;
        candidates.push(Candidate { name, assignment });
    }

    let selection = select_best(&store, &candidates, ctx.params.normalize_group_happiness)
        .map_err(map_pipeline_err)?;

    println!("candidate\tcombined\tapplicant_avg\tapplicant_worst\tgroup_happiness\tgroup_fairness");
    for (i, s) in selection.scored.iter().enumerate() {
        let r = &s.report;
        let mark = if i == selection.best { " *" } else { "" };
        println!(
            "{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}{mark}",
            s.name, r.combined, r.applicant_average, r.applicant_worst, r.group_happiness, r.group_fairness
        );
    }
    for (name, reason) in &selection.rejected {
        println!("{name}\trejected: {reason}");
    }

    let winner = selection.winner().ok_or_else(|| MainError::Scoring("no winner".to_string()))?;
    let assignment = &candidates[winner.candidate].assignment;
    write_assignment(out, assignment).map_err(map_io_err)?;
    tracing::info!(winner = %winner.name, out = %out.display(), "best assignment written");
    Ok(exitcodes::OK)
}

/// Loads inputs and reports issues; exit 2 when any issue is an error.
fn validate_only(inputs: &InputArgs, params: &ParamArgs) -> Result<i32, MainError> {
    let ctx = load_ctx(inputs, params)?;
    let report = validate(&ctx).map_err(map_pipeline_err)?;
    let text = serde_json::to_string_pretty(&report).map_err(|e| MainError::Io(format!("json: {e}")))?;
    println!("{text}");
    Ok(if report.pass { exitcodes::OK } else { exitcodes::VALIDATION })
}

fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::Capacity(_) => CAPACITY,
        MainError::Io(_) => IO,
        MainError::Matching(_) => MATCHING,
        MainError::Scoring(_) => SCORING,
    }
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Read { .. } | IoError::Write { .. } => MainError::Io(e.to_string()),
        IoError::Csv { .. } | IoError::Validation { .. } | IoError::Json { .. } => {
            MainError::Validation(e.to_string())
        }
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    match e {
        PipelineError::Io(io) => map_io_err(io),
        PipelineError::Params(_) | PipelineError::Preferences(_) => MainError::Validation(e.to_string()),
        PipelineError::Capacity(_) => MainError::Capacity(e.to_string()),
        PipelineError::Matching(_) => MainError::Matching(e.to_string()),
        PipelineError::Scoring(_) | PipelineError::NoCandidates => MainError::Scoring(e.to_string()),
    }
}
