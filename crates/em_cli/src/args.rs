// crates/em_cli/src/args.rs
//
// Offline CLI surface: four subcommands over the same three input tables.
// - Params come from defaults, then an optional --params JSON file, then flags.
// - Seeds accept decimal u64 or 0x-hex (up to 16 nybbles).
// - Paths must be local (no scheme://).

use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};

use em_core::Params;
use em_io::loader::{self, InputPaths};
use em_io::IoError;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "em",
    disable_help_subcommand = true,
    about = "Assign freshmen to entries by quota-constrained deferred acceptance"
)]
pub struct Cli {
    /// Log filter (e.g. `debug`, `em_algo=trace`). RUST_LOG wins over this;
    /// EM_LOG_LEVEL is used when neither is set.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run one matching and write the assignment.
    Run {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        params: ParamArgs,
        /// Assignment CSV to write (name,group; sorted by name).
        #[arg(long)]
        out: PathBuf,
        /// Optional run summary (canonical JSON).
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Score an existing assignment file against the inputs.
    Score {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long)]
        assignment: PathBuf,
    },
    /// Run both engine variants, add external candidates, keep the best.
    Select {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        params: ParamArgs,
        /// Extra assignment file to compete (repeatable); named by file stem.
        #[arg(long = "candidate")]
        candidates: Vec<PathBuf>,
        /// Where the winning assignment is written.
        #[arg(long)]
        out: PathBuf,
    },
    /// Load and check inputs and params without matching.
    Validate {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Debug, ClapArgs, Clone)]
pub struct InputArgs {
    /// Vacancy table: group,male,female,unassigned (or group,total).
    #[arg(long)]
    pub vacancies: PathBuf,
    /// Preference table: name,rA..rJ,gender.
    #[arg(long)]
    pub preferences: PathBuf,
    /// Rating table: name,sA..sJ.
    #[arg(long)]
    pub ratings: PathBuf,
}

impl InputArgs {
    pub fn paths(&self) -> InputPaths {
        InputPaths {
            vacancies: self.vacancies.clone(),
            preferences: self.preferences.clone(),
            ratings: self.ratings.clone(),
        }
    }
}

#[derive(Debug, ClapArgs, Clone, Default)]
pub struct ParamArgs {
    /// Params JSON; flags below override its values.
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// Vacancy rows carry male/female/unassigned counts.
    #[arg(long)]
    pub genders_provided: bool,
    #[arg(long)]
    pub max_gender_proportion: Option<f64>,
    #[arg(long)]
    pub no_greasing: bool,
    #[arg(long)]
    pub no_redistribute: bool,
    /// Redistribution shuffle seed: decimal u64 or 0x-hex.
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,
    /// Rescale group happiness to 0..100 before weighting.
    #[arg(long)]
    pub normalize_group_happiness: bool,
}

impl ParamArgs {
    /// Effective params. Domain checks happen in the pipeline.
    pub fn resolve(&self) -> Result<Params, IoError> {
        let mut p = match &self.params {
            Some(path) => loader::load_params(path)?,
            None => Params::default(),
        };
        if self.genders_provided {
            p.genders_provided = true;
        }
        if let Some(v) = self.max_gender_proportion {
            p.max_gender_proportion = v;
        }
        if self.no_greasing {
            p.allow_greasing = false;
        }
        if self.no_redistribute {
            p.redistribute = false;
        }
        if let Some(seed) = self.seed {
            p.shuffle_seed = seed;
        }
        if self.normalize_group_happiness {
            p.normalize_group_happiness = true;
        }
        Ok(p)
    }
}

#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

fn iter_all_paths(cli: &Cli) -> Vec<&Path> {
    let (inputs, params, extra): (&InputArgs, &ParamArgs, Vec<&Path>) = match &cli.command {
        Command::Run { inputs, params, out, summary } => {
            (inputs, params, [Some(out.as_path()), summary.as_deref()].into_iter().flatten().collect())
        }
        Command::Score { inputs, params, assignment } => (inputs, params, vec![assignment.as_path()]),
        Command::Select { inputs, params, candidates, out } => {
            let mut v: Vec<&Path> = candidates.iter().map(PathBuf::as_path).collect();
            v.push(out.as_path());
            (inputs, params, v)
        }
        Command::Validate { inputs, params } => (inputs, params, Vec::new()),
    };
    let mut all = vec![inputs.vacancies.as_path(), inputs.preferences.as_path(), inputs.ratings.as_path()];
    all.extend(params.params.as_deref());
    all.extend(extra);
    all
}

/// Parse argv (clap exits with code 2 on usage errors) and reject remote paths.
pub fn parse_and_validate() -> Result<Cli, CliError> {
    let cli = Cli::parse();
    for p in iter_all_paths(&cli) {
        ensure_local_path(p)?;
    }
    Ok(cli)
}
