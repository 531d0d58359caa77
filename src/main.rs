//! Nexus CLI - Command-line tool for catalogue upload validation.
//!
//! This is the main entry point for the Nexus command-line application.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use nexus::prelude::*;

/// Nexus - catalogue upload validation tool
#[derive(Parser)]
#[command(name = "nexus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the files recorded in a ZIP archive's central directory
    ZipIndex {
        /// Path to the ZIP file
        #[arg(short, long, env = "NEXUS_ZIP")]
        zip: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show entry sizes
        #[arg(short, long)]
        detailed: bool,
    },

    /// Validate a catalogue CSV against its image archive
    Validate {
        /// Path to the catalogue CSV
        #[arg(short, long, env = "NEXUS_CSV")]
        csv: PathBuf,

        /// Path to the image ZIP
        #[arg(short, long, env = "NEXUS_ZIP")]
        zip: Option<PathBuf>,

        /// Products carry their own locations in a `locations` column
        #[arg(long)]
        custom_locations: bool,

        /// Valid location name (repeatable, or comma-separated in the env var)
        #[arg(short, long = "location", env = "NEXUS_LOCATIONS", value_delimiter = ',')]
        locations: Vec<String>,

        /// JSON file with validator settings
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the normalized catalogue and extra columns
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of errors to print
        #[arg(long, default_value_t = 50)]
        max_errors: usize,

        /// Print errors as JSON
        #[arg(long)]
        json: bool,

        /// Directory of the draft cache
        #[arg(long, env = "NEXUS_DRAFT_DIR", default_value = ".nexus-draft")]
        draft_dir: PathBuf,
    },

    /// Inspect or discard the cached catalogue draft
    Draft {
        #[command(subcommand)]
        action: DraftAction,

        /// Directory of the draft cache
        #[arg(long, env = "NEXUS_DRAFT_DIR", default_value = ".nexus-draft", global = true)]
        draft_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum DraftAction {
    /// Print the cached catalogue
    Show,
    /// Delete the cached catalogue
    Clear,
}

/// Options for a validation run.
struct ValidateArgs {
    csv: PathBuf,
    zip: Option<PathBuf>,
    config: ValidatorConfig,
    output: Option<PathBuf>,
    max_errors: usize,
    json: bool,
    draft_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::ZipIndex {
            zip,
            filter,
            detailed,
        } => {
            cmd_zip_index(&zip, filter.as_deref(), detailed)?;
        }
        Commands::Validate {
            csv,
            zip,
            custom_locations,
            locations,
            config,
            output,
            max_errors,
            json,
            draft_dir,
        } => {
            let mut settings = match config {
                Some(path) => ValidatorConfig::from_json_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => ValidatorConfig::default(),
            };
            if custom_locations {
                settings = settings.with_custom_locations(locations);
            } else {
                settings.valid_locations.extend(locations);
            }

            cmd_validate(ValidateArgs {
                csv,
                zip,
                config: settings,
                output,
                max_errors,
                json,
                draft_dir,
            })?;
        }
        Commands::Draft { action, draft_dir } => {
            cmd_draft(action, &draft_dir)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_zip_index(zip_path: &Path, filter: Option<&str>, detailed: bool) -> Result<()> {
    let start = Instant::now();
    let blob = FileBlob::open(zip_path).context("Failed to open ZIP archive")?;
    let index = build_index(&blob).context("Failed to read ZIP central directory")?;

    tracing::info!(entries = index.len(), elapsed = ?start.elapsed(), "indexed archive");

    let pattern = filter
        .map(glob::Pattern::new)
        .transpose()
        .context("Invalid filter pattern")?;

    let mut entries: Vec<_> = index
        .iter()
        .filter(|(path, _)| pattern.as_ref().map_or(true, |p| p.matches(path)))
        .collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut total = 0u64;
    for (path, size) in &entries {
        if detailed {
            println!("{:>12} {}", size, path);
        } else {
            println!("{}", path);
        }
        total += size;
    }

    println!("\nTotal: {} entries, {} bytes", entries.len(), total);

    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let text = fs::read_to_string(&args.csv)
        .with_context(|| format!("Failed to read {}", args.csv.display()))?;

    let session = IndexSession::new();
    if let Some(zip_path) = &args.zip {
        let blob = FileBlob::open(zip_path).context("Failed to open ZIP archive")?;
        let token = session.select_zip(blob);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
        spinner.set_message(format!("Indexing {}", zip_path.display()));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let index = session.wait(token);
        spinner.finish_and_clear();

        let index = index.context("Failed to index ZIP archive")?;
        println!("Indexed {} files from {}", index.len(), zip_path.display());
    }

    let (_, outcome) = session.validate_csv(&text, &args.config);

    match &outcome {
        ValidationOutcome::Invalid(errors) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(errors)?);
            } else {
                for error in outcome.display_errors(args.max_errors) {
                    println!("{}", error);
                    println!("    {}", error.detail);
                    println!("    Fix: {}", error.fix);
                }
                if errors.len() > args.max_errors {
                    println!(
                        "\n... and {} more (showing {} of {})",
                        errors.len() - args.max_errors,
                        args.max_errors,
                        errors.len()
                    );
                }
            }
            anyhow::bail!("Validation failed: {}", outcome.summary());
        }
        ValidationOutcome::Valid(catalogue) => {
            println!("Validation passed: {}", outcome.summary());

            if let Some(output) = &args.output {
                write_catalogue(output, catalogue)?;
            }

            let filename = args
                .csv
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("catalogue.csv");
            let store = DraftStore::new(&args.draft_dir);
            if store.save(&Draft::from_catalogue(filename, catalogue)?) {
                println!("Draft saved to {}", store.dir().display());
            }
        }
    }

    Ok(())
}

fn write_catalogue(output: &Path, catalogue: &NormalizedCatalogue) -> Result<()> {
    fs::create_dir_all(output)?;

    let csv_path = output.join("catalogue.csv");
    fs::write(&csv_path, catalogue.to_csv()?).context("Failed to write normalized catalogue")?;
    println!("Wrote {}", csv_path.display());

    if let Some(extra) = &catalogue.extra {
        let extra_path = output.join("extra_columns.json");
        fs::write(&extra_path, extra.to_json()?).context("Failed to write extra columns")?;
        println!(
            "Wrote {} ({} extra columns: {})",
            extra_path.display(),
            extra.columns.len(),
            extra.columns.join(", ")
        );
    }

    Ok(())
}

fn cmd_draft(action: DraftAction, draft_dir: &Path) -> Result<()> {
    let store = DraftStore::new(draft_dir);

    match action {
        DraftAction::Show => match store.load() {
            Some(draft) => {
                println!("Draft from {}", draft.filename);
                print!("{}", draft.csv);
                if let Some(extras) = &draft.extras {
                    println!("\nExtra columns: {}", extras);
                }
            }
            None => println!("No draft in {}", store.dir().display()),
        },
        DraftAction::Clear => {
            store.clear();
            println!("Draft cleared");
        }
    }

    Ok(())
}
