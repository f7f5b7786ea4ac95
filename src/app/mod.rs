use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use context_ql::config::{load_context, load_contexts};
use context_ql::{Statement, compile, evaluate, grammar};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Number of threads for `filter` (default: all cores)
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse a query, print its canonical form and the keys it reads
    Check { query: String },

    /// Print the rendered syntax tree
    Render {
        query: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Print the query grammar
    Grammar,

    /// Evaluate a query against one document (exit status 1 when it does not match)
    Match {
        query: String,

        /// Document file (.json, .yaml, .toml)
        #[arg(short, long, env = "CQL_DATA")]
        data: PathBuf,

        /// Layer <PREFIX>__KEY environment variables over the document
        #[arg(long)]
        env_prefix: Option<String>,
    },

    /// Print the documents of a collection that match a query, as JSON lines
    Filter {
        query: String,

        /// Collection file (.jsonl, .json array, .yaml sequence)
        #[arg(short, long, env = "CQL_DATA")]
        data: PathBuf,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Compile a query, turning parse errors into a caret diagnostic.
fn compile_query(query: &str) -> Result<Statement> {
    compile(query).map_err(|e| anyhow!("Query: invalid syntax\n{}", e.pretty().trim_end()))
}

fn rendered(query: &str) -> Result<Statement> {
    Ok(compile_query(query)?.render()?)
}

fn status(matched: bool) -> ExitCode {
    if matched {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

pub fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Check { query } => {
            let stmt = compile_query(&query)?;
            println!("{stmt}");
            println!("keys: {}", stmt.context_keys().join(", "));
            Ok(ExitCode::SUCCESS)
        }

        Command::Render { query, format } => {
            let stmt = compile_query(&query)?;
            let text = match format {
                OutputFormat::Json => stmt.stringify()?,
                OutputFormat::Yaml => serde_yaml::to_string(&stmt.render()?)
                    .context("Render: Failed to serialize statement")?,
            };
            println!("{}", text.trim_end());
            Ok(ExitCode::SUCCESS)
        }

        Command::Grammar => {
            print!("{}", grammar());
            Ok(ExitCode::SUCCESS)
        }

        Command::Match {
            query,
            data,
            env_prefix,
        } => {
            let stmt = rendered(&query)?;
            let ctx = load_context(&data, env_prefix.as_deref())?;
            let matched = evaluate(&stmt, &ctx).context("Match: Evaluation failed")?;
            println!("{matched}");
            Ok(status(matched))
        }

        Command::Filter { query, data } => {
            // surface syntax errors before reading the collection
            compile_query(&query)?;
            let docs = load_contexts(&data)?;
            let found = docs.find_ql(&query)?;

            tracing::info!("{} of {} documents matched", found.len(), docs.len());
            for ctx in &found {
                println!(
                    "{}",
                    serde_json::to_string(ctx).context("Filter: Failed to serialize document")?
                );
            }
            Ok(status(!found.is_empty()))
        }
    }
}
