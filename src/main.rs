//! threesixty CLI - validate and convert 360Giving grant data
//!
//! # Commands
//!
//! ```bash
//! threesixty validate grants.json              # Validate against the schema
//! threesixty validate https://example.org/g.json
//! threesixty convert grants.json grants.csv    # Export with titled columns
//! threesixty convert grants.json grants.xlsx --raw-fieldnames
//! threesixty fields                            # Show derived rename rules
//! ```
//!
//! JSON input only: CSV/spreadsheet input needs an unflattening
//! collaborator wired up through the library API.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use threesixty::{Config, Dataset, FileType, LoadError, LoadResult, Loader};

#[derive(Parser)]
#[command(name = "threesixty")]
#[command(about = "Load, validate and convert 360Giving grant data", long_about = None)]
struct Cli {
    /// Override the package schema URL
    #[arg(long, global = true)]
    schema_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a 360Giving document against the schema
    Validate {
        /// Input file path or URL
        input: String,

        /// Input filetype (json/csv/xlsx; guessed if not given)
        #[arg(short, long)]
        filetype: Option<String>,
    },

    /// Convert a 360Giving document to CSV, XLSX or pretty JSON
    Convert {
        /// Input file path or URL
        input: String,

        /// Output file; format chosen by extension
        output: PathBuf,

        /// Keep generated flat field names instead of schema titles
        #[arg(long)]
        raw_fieldnames: bool,

        /// One worksheet per entity (not implemented)
        #[arg(long)]
        multiple_sheets: bool,
    },

    /// Print the field rename rules derived from the schema
    Fields,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    if let Some(url) = cli.schema_url {
        config = config.with_schema_url(url);
    }
    let loader = Loader::new(config);

    match cli.command {
        Commands::Validate { input, filetype } => {
            let filetype = filetype.as_deref().map(parse_filetype).transpose()?;
            match load(&loader, &input, filetype) {
                Ok(dataset) => {
                    println!("Valid: {} grant(s)", dataset.len());
                }
                Err(LoadError::Invalid { errors }) => {
                    for error in &errors {
                        eprintln!("{error}");
                    }
                    eprintln!("Invalid: {} error(s)", errors.len());
                    std::process::exit(1);
                }
                Err(other) => return Err(other.into()),
            }
        }

        Commands::Convert {
            input,
            output,
            raw_fieldnames,
            multiple_sheets,
        } => {
            let dataset = load(&loader, &input, None)?;
            let convert_fieldnames = !raw_fieldnames;

            match FileType::from_path(&output) {
                Some(FileType::Json) => dataset.to_json_path(&output)?,
                Some(FileType::Csv) => dataset.to_csv_path(&output, convert_fieldnames)?,
                Some(FileType::Xlsx) => {
                    dataset.to_xlsx_path(&output, multiple_sheets, convert_fieldnames)?
                }
                None => {
                    return Err(LoadError::UnrecognisedFormat(output.display().to_string()).into())
                }
            }
            println!("Wrote {}", output.display());
        }

        Commands::Fields => {
            let schema = loader.resolve_schema()?;
            for rule in schema.rename_rules() {
                println!("{} -> {}", rule.pattern, rule.replacement);
            }
        }
    }

    Ok(())
}

/// Load from a local path or an http(s) URL.
fn load(loader: &Loader, input: &str, filetype: Option<FileType>) -> LoadResult<Dataset> {
    if input.starts_with("http://") || input.starts_with("https://") {
        loader.from_url(input, filetype)
    } else {
        loader.from_path(Path::new(input), filetype)
    }
}

fn parse_filetype(label: &str) -> Result<FileType, LoadError> {
    FileType::from_extension(label).ok_or_else(|| LoadError::UnrecognisedFormat(label.to_string()))
}
