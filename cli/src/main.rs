mod schema_file;

use std::path::PathBuf;

use clap::Parser;
use schema_args::{ArgumentParser, ConflictResolution, ParseError};
use schema_args_core::SchemaTree;
use tracing_subscriber::EnvFilter;

use crate::schema_file::{SchemaFile, SchemaFileError, load_value};

/// CLI-specific output format enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

/// CLI-specific conflict mode enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliConflicts {
    Error,
    Auto,
    Explicit,
    AlwaysMerge,
}

impl From<CliConflicts> for ConflictResolution {
    fn from(mode: CliConflicts) -> Self {
        match mode {
            CliConflicts::Error => Self::Error,
            CliConflicts::Auto => Self::Auto,
            CliConflicts::Explicit => Self::Explicit,
            CliConflicts::AlwaysMerge => Self::AlwaysMerge,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "schema-args")]
#[command(about = "Parse command-line arguments against nested record schemas")]
struct Cli {
    /// Schema file (YAML or JSON) describing the record types.
    #[arg(long)]
    schema: PathBuf,
    /// Root record type. Defaults to the schema file's `root`.
    #[arg(long)]
    root: Option<String>,
    /// Destination the root record is parsed into. Repeat to parse the
    /// record several times with shared flags.
    #[arg(long = "dest", default_value = "config")]
    dests: Vec<String>,
    /// Prefix added to every generated option string.
    #[arg(long, default_value = "")]
    prefix: String,
    /// YAML or JSON file holding a default instance of the root record.
    #[arg(long)]
    defaults: Option<PathBuf>,
    /// How to handle fields that map to the same option string.
    #[arg(long, value_enum, default_value_t = CliConflicts::Error)]
    conflicts: CliConflicts,
    /// Output format for the parsed instances.
    #[arg(long, value_enum, default_value_t = CliOutputFormat::Json)]
    format: CliOutputFormat,
    /// Print the generated help for the schema and exit.
    #[arg(long)]
    show_help: bool,
    /// Arguments to parse against the schema, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let schema = SchemaFile::load(&cli.schema)
        .map_err(|e| format!("failed to load {}: {e}", cli.schema.display()))?;
    let root = cli
        .root
        .as_deref()
        .or(schema.root.as_deref())
        .ok_or_else(|| SchemaFileError::NoRoot.to_string())?;
    let record = schema.resolve(root).map_err(|e| e.to_string())?;
    let defaults = match &cli.defaults {
        Some(path) => Some(
            load_value(path).map_err(|e| format!("failed to load {}: {e}", path.display()))?,
        ),
        None => None,
    };

    let mut parser = ArgumentParser::new(root).with_conflict_resolution(cli.conflicts.into());
    if let Some(doc) = &record.doc {
        parser = parser.with_about(doc);
    }
    for dest in &cli.dests {
        let built = match &defaults {
            Some(default) => SchemaTree::build_with_default(record.clone(), dest, default.clone()),
            None => SchemaTree::build(record.clone(), dest),
        };
        let mut tree = built.map_err(|e| e.to_string())?;
        if !cli.prefix.is_empty() {
            tree.set_prefix(SchemaTree::ROOT, &cli.prefix);
        }
        parser.add_tree(tree).map_err(|e| e.to_string())?;
    }

    if cli.show_help {
        print!("{}", parser.help().map_err(|e| e.to_string())?);
        return Ok(());
    }

    let argv = std::iter::once(root.to_string()).chain(cli.args);
    let parsed = match parser.parse_from(argv) {
        Ok(parsed) => parsed,
        Err(ParseError::Clap(err)) => err.exit(),
        Err(err) => return Err(err.to_string()),
    };

    let value = parsed.to_value();
    let rendered = match cli.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&value).map_err(|e| e.to_string())?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&value).map_err(|e| e.to_string())?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
