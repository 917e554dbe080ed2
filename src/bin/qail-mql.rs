//! qail-mql — MongoDB filter ⇄ line-based IR
//!
//! # Usage
//!
//! ```bash
//! # Query → lines
//! qail-mql --schema events.json encode 'db.events.find({"severity":{"$gt":5}})'
//!
//! # Lines → query (stdin)
//! printf 'severity gt 5\nlimit = 10\n' | qail-mql --schema events.json decode -
//!
//! # Round-trip check a file of queries, one per line
//! qail-mql --schema events.json verify -f queries.txt --json
//! ```

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use qail_mql::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "qail-mql")]
#[command(version)]
#[command(about = "Schema-aware MongoDB filter transpiler", long_about = None)]
#[command(after_help = "EXAMPLES:
    qail-mql canon 'db.events.find( { \"speed\" : 20.50 } )'
    qail-mql --schema events.json encode 'db.events.find({\"severity\":{\"$gt\":5}})'
    qail-mql --schema events.json decode -f target.lines
    qail-mql --schema events.json verify -f queries.txt")]
struct Cli {
    /// Schema JSON file (overrides the config file)
    #[arg(short, long, global = true, env = "QAIL_MQL_SCHEMA")]
    schema: Option<PathBuf>,

    /// Config file (default: ./qail-mql.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Collection name written into generated queries
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Inline text, `-` for stdin, or `--file`.
#[derive(clap::Args)]
struct Input {
    /// Input text, or `-` to read stdin
    text: Option<String>,

    /// Read input from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form of a query
    Canon(Input),
    /// Convert a query to line-based IR
    Encode(Input),
    /// Convert line-based IR to a query
    Decode(Input),
    /// Round-trip check queries (one per line) and print their IR
    Verify {
        #[command(flatten)]
        input: Input,

        /// Emit one JSON object per converted query
        #[arg(long)]
        json: bool,
    },
    /// List flat field names and their dot paths
    Paths,
    /// Print the schema field listing
    Describe,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "qail_mql=debug" } else { "qail_mql=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Canon(input) => {
            println!("{}", qail_mql::canonicalize(&input.read()?));
        }
        Commands::Encode(input) => {
            let text = input.read()?;
            if cli.verbose {
                eprintln!("{} {}", "Input:".dimmed(), text.trim().yellow());
            }
            println!("{}", session(cli)?.to_lines(&text)?);
        }
        Commands::Decode(input) => {
            println!("{}", session(cli)?.from_lines(&input.read()?)?);
        }
        Commands::Verify { input, json } => verify(cli, input, *json)?,
        Commands::Paths => {
            let mql = session(cli)?;
            if mql.paths().is_empty() {
                println!("{}", "No fields in schema.".yellow());
            }
            for (flat, path) in mql.paths().iter() {
                println!("{:<32} {}", flat.cyan(), path.white());
            }
        }
        Commands::Describe => {
            let (schema, _) = load(cli)?;
            println!("{}", schema.describe());
        }
    }
    Ok(())
}

fn verify(cli: &Cli, input: &Input, json: bool) -> Result<()> {
    let text = input.read()?;
    let queries: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let report = session(cli)?.convert_all(&queries);

    for target in &report.targets {
        if json {
            let record = serde_json::json!({
                "collection": target.collection,
                "lines": target.lines,
            });
            println!("{}", record);
        } else {
            println!("{}", target.lines.green());
            println!();
        }
    }
    for (index, err) in &report.failures {
        eprintln!("{} #{}: {}", "Rejected".red().bold(), index + 1, err);
        if cli.verbose {
            eprintln!("  {}", queries[*index].dimmed());
        }
    }

    eprintln!(
        "{} {}/{} converted",
        "Done:".cyan().bold(),
        report.targets.len(),
        report.total()
    );
    if !report.failures.is_empty() {
        anyhow::bail!("{} queries failed the round trip", report.failures.len());
    }
    Ok(())
}

/// Resolve config and schema from the command line, then the config file.
fn load(cli: &Cli) -> Result<(DocumentSchema, MqlConfig)> {
    let config = match &cli.config {
        Some(path) => MqlConfig::from_file(path)?,
        None => MqlConfig::load()?,
    };
    let schema = match cli.schema.as_ref().or(config.schema.path.as_ref()) {
        Some(path) => read_schema(path)?,
        None => {
            tracing::warn!("no schema given; field names pass through unchanged");
            DocumentSchema::default()
        }
    };
    Ok((schema, config))
}

fn read_schema(path: &Path) -> Result<DocumentSchema> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    DocumentSchema::from_json(&text).with_context(|| format!("parsing schema {}", path.display()))
}

fn session(cli: &Cli) -> Result<Transpiler> {
    let (schema, config) = load(cli)?;
    let mut mql = Transpiler::new(&schema)?.with_config(config.generator_config());
    if let Some(collection) = cli.collection.as_ref().or(config.transpiler.collection.as_ref()) {
        mql = mql.with_collection(collection.clone());
    }
    Ok(mql)
}

impl Input {
    fn read(&self) -> Result<String> {
        if let Some(path) = &self.file {
            return fs::read_to_string(path).with_context(|| format!("reading {}", path.display()));
        }
        match self.text.as_deref() {
            Some("-") | None => {
                let mut buf = String::new();
                io::stdin().read_to_string(&mut buf).context("reading stdin")?;
                Ok(buf)
            }
            Some(text) => Ok(text.to_string()),
        }
    }
}
