//! Rosterload CLI - dashboard backend and CSV import tools
//!
//! # Main Commands
//!
//! ```bash
//! rosterload serve                      # Start HTTP server (port 3000)
//! rosterload import roster.csv -k students   # Import a CSV into the store
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! rosterload preview roster.csv         # Show the 3-row confirmation preview
//! rosterload validate roster.csv -k students  # Offline rule check
//! rosterload schema students            # Show a kind's column table
//! ```

use clap::{Parser, Subcommand};
use rosterload::{
    format_validation_errors, parse_bytes, read_file, EntityKind, ImportError, ImportPipeline,
    RestStore,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rosterload")]
#[command(about = "Education dashboard backend: CSV roster imports and row CRUD", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Parse a CSV file and show the confirmation preview (first 3 rows)
    Preview {
        /// Input CSV file
        input: PathBuf,
    },

    /// Validate a CSV file offline (no store round-trip)
    Validate {
        /// Input CSV file
        input: PathBuf,

        /// Target entity kind
        #[arg(short, long)]
        kind: String,
    },

    /// Import a CSV file into the configured store
    Import {
        /// Input CSV file
        input: PathBuf,

        /// Target entity kind
        #[arg(short, long)]
        kind: String,
    },

    /// Show an entity kind's column table
    Schema {
        /// Entity kind name
        kind: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { port } => rosterload::server::start_server(port).await,
        Commands::Preview { input } => cmd_preview(input),
        Commands::Validate { input, kind } => cmd_validate(input, &kind),
        Commands::Import { input, kind } => cmd_import(input, &kind).await,
        Commands::Schema { kind } => cmd_schema(&kind),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn parse_kind(name: &str) -> Result<EntityKind, Box<dyn std::error::Error>> {
    EntityKind::from_name(name).ok_or_else(|| format!("unknown entity kind '{name}'").into())
}

fn cmd_preview(input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = read_file(&input)?;
    let preview = ImportPipeline::<RestStore>::preview(&bytes)?;

    println!("Encoding: {}", preview.encoding);
    println!("Columns:  {}", preview.headers.join(", "));
    println!("First {} row(s):", preview.rows.len());
    for row in &preview.rows {
        println!("  {}", serde_json::to_string(row)?);
    }
    Ok(())
}

fn cmd_validate(input: PathBuf, kind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    let bytes = read_file(&input)?;
    let outcome = parse_bytes(&bytes)?;

    // Offline: empty existing set, so cross-store duplicates are not checked.
    let errors = rosterload::validate_records(
        &outcome.records,
        kind.schema(),
        &Default::default(),
    );

    println!("Parsed {} row(s)", outcome.records.len());
    if errors.is_empty() {
        println!("All rows pass field validation");
        Ok(())
    } else {
        println!("{} validation error(s):", errors.len());
        println!("{}", format_validation_errors(&errors));
        Err("validation failed".into())
    }
}

async fn cmd_import(input: PathBuf, kind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    let bytes = read_file(&input)?;

    let pipeline = ImportPipeline::new(RestStore::from_env()?);
    match pipeline.run(kind, &bytes).await {
        Ok(report) => {
            println!("Imported {} row(s) into {}", report.inserted, report.kind);
            Ok(())
        }
        Err(ImportError::Validation(errors)) => {
            println!("Batch rejected, {} validation error(s):", errors.len());
            println!("{}", format_validation_errors(&errors));
            Err("validation failed".into())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_schema(kind: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kind = parse_kind(kind)?;
    let schema = kind.schema();

    println!("{}:", kind);
    for col in &schema.columns {
        let required = if col.required { " (required)" } else { "" };
        println!(
            "  {:<16} widget={:<12} coercion={:?}{}",
            col.name,
            format!("{:?}", col.widget),
            col.coercion,
            required
        );
    }
    if let Some(unique) = schema.unique_column {
        println!("  unique column: {unique}");
    }
    Ok(())
}
