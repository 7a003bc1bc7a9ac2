use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rust_schematic::{
    load_layered_database, merge_snapshots, ColumnRef, DialectKind, Identifier,
    IdentifierComparer, IdentifierComparisonMode, MergeOptions, Parameters, SqlExpression,
};

#[derive(Parser)]
#[command(name = "rust-schematic")]
#[command(author, version, about = "Database schema metadata toolkit")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ObjectKind {
    Table,
    View,
    Sequence,
    Synonym,
    Routine,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a SQL fragment template for a dialect
    Render {
        /// Template text, e.g. "LOWER(@Email)"
        #[arg(short, long)]
        expr: String,

        /// Target dialect (mssql, postgres, mysql, sqlite)
        #[arg(short, long, default_value = "mssql")]
        dialect: DialectKind,

        /// Column parameter as NAME=COLUMN
        #[arg(long = "column", value_name = "NAME=COLUMN")]
        columns: Vec<String>,

        /// String parameter as NAME=VALUE
        #[arg(long = "string", value_name = "NAME=VALUE")]
        strings: Vec<String>,
    },

    /// Resolve an object across snapshot layers
    Find {
        /// Snapshot files, base first; later files override earlier ones
        #[arg(short, long = "layer", required = true)]
        layers: Vec<PathBuf>,

        /// Object kind to look up
        #[arg(short, long, value_enum, default_value = "table")]
        kind: ObjectKind,

        /// Dotted object name, e.g. dbo.Users
        #[arg(short, long)]
        name: Identifier,

        /// Identifier comparison mode
        #[arg(short, long, default_value = "ordinal")]
        mode: IdentifierComparisonMode,
    },

    /// Merge snapshot layers into a single snapshot file
    Merge {
        /// Snapshot files, base first; later files override earlier ones
        #[arg(short, long = "layer", required = true)]
        layers: Vec<PathBuf>,

        /// Output path for the merged snapshot
        #[arg(short, long)]
        output: PathBuf,

        /// Identifier comparison mode
        #[arg(short, long, default_value = "ordinal")]
        mode: IdentifierComparisonMode,
    },

    /// Check whether two dotted names denote the same object
    Compare {
        left: Identifier,
        right: Identifier,

        /// Identifier comparison mode
        #[arg(short, long, default_value = "ordinal")]
        mode: IdentifierComparisonMode,

        /// Schema assumed for names without one
        #[arg(long)]
        default_schema: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Render {
            expr,
            dialect,
            columns,
            strings,
        } => {
            let mut parameters = Parameters::new();
            for column in &columns {
                let (name, value) = split_assignment(column)?;
                parameters.insert(name, ColumnRef::new(value))?;
            }
            for string in &strings {
                let (name, value) = split_assignment(string)?;
                parameters.insert(name, value)?;
            }

            let expression = SqlExpression::new(expr, parameters)?;
            println!("{}", expression.render(dialect.dialect())?);
            if cli.verbose {
                eprintln!("identity: {}", expression.is_identity());
            }
        }
        Commands::Find {
            layers,
            kind,
            name,
            mode,
        } => {
            let database = load_layered_database(&layers, mode)?;
            let found = match kind {
                ObjectKind::Table => database.find_table(&name)?.map(|t| t.name),
                ObjectKind::View => database.find_view(&name)?.map(|v| v.name),
                ObjectKind::Sequence => database.find_sequence(&name)?.map(|s| s.name),
                ObjectKind::Synonym => database.find_synonym(&name)?.map(|s| s.target),
                ObjectKind::Routine => database.find_routine(&name)?.map(|r| r.name),
            };
            match found {
                Some(resolved) => println!("{}", resolved),
                None => bail!("{} not found in any layer", name),
            }
        }
        Commands::Merge {
            layers,
            output,
            mode,
        } => {
            let summary = merge_snapshots(MergeOptions {
                layer_paths: layers,
                output_path: output.clone(),
                comparison_mode: mode,
            })?;
            println!(
                "Wrote {} ({} tables, {} views, {} sequences, {} synonyms, {} routines)",
                output.display(),
                summary.tables,
                summary.views,
                summary.sequences,
                summary.synonyms,
                summary.routines
            );
        }
        Commands::Compare {
            left,
            right,
            mode,
            default_schema,
        } => {
            let comparer = IdentifierComparer::new(mode, default_schema.as_deref());
            println!("{}", comparer.equals(Some(&left), Some(&right)));
        }
    }

    Ok(())
}

fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    arg.split_once('=')
        .with_context(|| format!("expected NAME=VALUE, got '{}'", arg))
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "info,rust_schematic=debug"
        } else {
            "warn"
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
