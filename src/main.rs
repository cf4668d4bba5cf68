//! SparsePoly Command Line Interface
//!
//! Usage:
//!   sparsepoly [OPTIONS] <input-file>
//!   sparsepoly --help
//!
//! Examples:
//!   sparsepoly gs.set --uf 'rowptr; [m] -> { [x] : 0 <= x < m }; [nnz] -> { [y] : 0 <= y < nnz }; nondecreasing'
//!   sparsepoly deps.rel --relation --backend iscc --emit json
//!   sparsepoly gs.set --uf-file decls.txt --parallel i,ip

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use sparsepoly::analysis::complexity;
use sparsepoly::backend::{AffineBackend, IsccBackend, NativeBackend, OmegaRewriter};
use sparsepoly::constraints::{Relation, Set};
use sparsepoly::env::{Environment, Monotonicity, UninterpFunc};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// SparsePoly - symbolic polyhedral algebra with uninterpreted functions
#[derive(Parser, Debug)]
#[command(name = "sparsepoly")]
#[command(author = "SparsePoly Contributors")]
#[command(version)]
#[command(about = "Normalize and compare sparse dependence sets and relations", long_about = None)]
struct Cli {
    /// Input file holding one set or relation expression
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Parse the input as a relation instead of a set
    #[arg(short, long)]
    relation: bool,

    /// Declare an uninterpreted function:
    /// 'name; domain-set; range-set[; flags]' where flags are any of
    /// bijective, increasing, nondecreasing, decreasing, nonincreasing
    #[arg(long = "uf", value_name = "DECL")]
    ufs: Vec<String>,

    /// Read declarations from a file, one per line (# starts a comment)
    #[arg(long, value_name = "FILE")]
    uf_file: Option<PathBuf>,

    /// Affine backend for canonicalization
    #[arg(short, long, default_value = "native")]
    backend: BackendArg,

    /// Backend timeout in seconds (iscc only)
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Skip normalization, just parse and emit
    #[arg(long)]
    no_normalize: bool,

    /// Output form
    #[arg(short, long, default_value = "text")]
    emit: EmitKind,

    /// Also report inspector complexity, keeping these tuple variables
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    parallel: Option<Vec<String>>,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress warnings)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    /// Built-in pure-Rust canonicalizer
    Native,
    /// The `iscc` calculator (must be installed)
    Iscc,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EmitKind {
    /// The crate's textual grammar
    Text,
    /// JSON via serde
    Json,
    /// ISL syntax
    Isl,
    /// Omega syntax, UF calls replaced by symbolic constants
    Omega,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else {
        match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    info!("SparsePoly v{}", sparsepoly::VERSION);
    debug!("Input file: {:?}", cli.input);

    let mut env = Environment::new();
    let mut decls: Vec<String> = Vec::new();
    if let Some(ref path) = cli.uf_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read declaration file {:?}", path))?;
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if !line.is_empty() {
                decls.push(line.to_string());
            }
        }
    }
    decls.extend(cli.ufs.iter().cloned());
    for decl in &decls {
        let func = parse_uf_decl(decl)?;
        debug!("declaring uninterpreted function `{}`", func.name);
        env.declare(func)
            .with_context(|| format!("failed to declare `{}`", decl))?;
    }

    let backend: Box<dyn AffineBackend> = match cli.backend {
        BackendArg::Native => Box::new(NativeBackend::new()),
        BackendArg::Iscc => Box::new(IsccBackend::with_timeout(Duration::from_secs(cli.timeout))),
    };
    debug!("backend: {}", backend.name());

    let source = fs::read_to_string(&cli.input)
        .with_context(|| format!("failed to read input file {:?}", cli.input))?;

    if cli.relation {
        let mut rel = Relation::from_string(source.trim()).context("failed to parse relation")?;
        if !cli.no_normalize {
            info!("normalizing...");
            rel.normalize(&env, backend.as_ref())
                .context("normalization failed")?;
        }
        emit_relation(&rel, cli.emit)?;
    } else {
        let mut set = Set::from_string(source.trim()).context("failed to parse set")?;
        if !cli.no_normalize {
            info!("normalizing...");
            set.normalize(&env, backend.as_ref())
                .context("normalization failed")?;
        }
        emit_set(&set, cli.emit)?;
        if let Some(ref names) = cli.parallel {
            let positions = resolve_positions(&set, names)?;
            let estimate = complexity(&set, &env, &positions)?;
            println!("complexity: {}", estimate);
        }
    }

    Ok(())
}

/// Parse a `name; domain; range[; flags]` declaration.
fn parse_uf_decl(decl: &str) -> Result<UninterpFunc> {
    let fields: Vec<&str> = decl.split(';').map(str::trim).collect();
    if fields.len() < 3 {
        return Err(anyhow!(
            "declaration `{}` needs at least name; domain; range",
            decl
        ));
    }
    let name = fields[0];
    let domain = Set::from_string(fields[1])
        .with_context(|| format!("bad domain for `{}`", name))?;
    let range = Set::from_string(fields[2])
        .with_context(|| format!("bad range for `{}`", name))?;
    let mut bijective = false;
    let mut monotonicity = Monotonicity::None;
    for flag in fields.iter().skip(3).flat_map(|f| f.split_whitespace()) {
        match flag {
            "bijective" => bijective = true,
            "increasing" => monotonicity = Monotonicity::Increasing,
            "nondecreasing" => monotonicity = Monotonicity::Nondecreasing,
            "decreasing" => monotonicity = Monotonicity::Decreasing,
            "nonincreasing" => monotonicity = Monotonicity::Nonincreasing,
            other => return Err(anyhow!("unknown declaration flag `{}`", other)),
        }
    }
    Ok(UninterpFunc::new(name, domain, range, bijective, monotonicity))
}

/// Map tuple-variable names to positions in the set's declaration.
fn resolve_positions(set: &Set, names: &[String]) -> Result<Vec<usize>> {
    let conj = set
        .conjunctions()
        .first()
        .ok_or_else(|| anyhow!("cannot estimate complexity of the empty set"))?;
    names
        .iter()
        .map(|n| {
            conj.tuple_decl()
                .position_of(n)
                .ok_or_else(|| anyhow!("no tuple variable named `{}`", n))
        })
        .collect()
}

fn emit_set(set: &Set, emit: EmitKind) -> Result<()> {
    match emit {
        EmitKind::Text => println!("{}", set),
        EmitKind::Json => println!("{}", serde_json::to_string_pretty(set)?),
        EmitKind::Isl => println!("{}", set.to_isl_string()),
        EmitKind::Omega => {
            let mut rewriter = OmegaRewriter::new();
            println!("{}", set.to_omega_string(&mut rewriter)?);
        }
    }
    Ok(())
}

fn emit_relation(rel: &Relation, emit: EmitKind) -> Result<()> {
    match emit {
        EmitKind::Text => println!("{}", rel),
        EmitKind::Json => println!("{}", serde_json::to_string_pretty(rel)?),
        EmitKind::Isl => println!("{}", rel.to_isl_string()),
        EmitKind::Omega => {
            return Err(anyhow!("omega emission is only implemented for sets"));
        }
    }
    Ok(())
}
