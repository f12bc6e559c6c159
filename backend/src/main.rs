//! Datatranslator CLI - Translate accounting workbooks through a key mapping
//!
//! # Main Commands
//!
//! ```bash
//! datatranslator serve                                              # HTTP server (port 3000)
//! datatranslator translate gl --primary gl.xlsx --mapping map.xlsx  # Translated rows as JSON
//! datatranslator profile list                                       # Manage translation profiles
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! datatranslator locate ap detail.xlsx              # Where the header cells are
//! datatranslator splits gl --mapping map.xlsx       # Keys split across several targets
//! ```

use clap::{Parser, Subcommand};
use datatranslator::{
    locate_document, mapping_splits, read_grid_file, translate_files, ProfileRegistry,
    ReconcileOptions, TranslationProfile, WeightMap,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "datatranslator")]
#[command(about = "Translate AP/GL workbooks through a key mapping workbook", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full pipeline: locate headers, extract, join, split, project
    Translate {
        /// Profile name (built-in: ap, gl)
        profile: String,

        /// Primary workbook (AP detail, GL balances)
        #[arg(short, long)]
        primary: PathBuf,

        /// Mapping workbook
        #[arg(short, long)]
        mapping: PathBuf,

        /// Split weights JSON: { "key": { "0": 30, "1": 70 } }
        #[arg(short, long)]
        weights: Option<PathBuf>,

        /// Rows scanned for header cells
        #[arg(long)]
        max_header_rows: Option<usize>,

        /// Keep every joined column
        #[arg(long)]
        full: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List keys of a mapping workbook that split across several targets
    Splits {
        /// Profile name
        profile: String,

        /// Mapping workbook
        #[arg(short, long)]
        mapping: PathBuf,

        /// Write an equal-split weights file to edit
        #[arg(short, long)]
        template: Option<PathBuf>,

        /// Rows scanned for header cells
        #[arg(long)]
        max_header_rows: Option<usize>,
    },

    /// Show where the required header cells of a workbook are
    Locate {
        /// Profile name
        profile: String,

        /// Workbook to inspect
        file: PathBuf,

        /// Inspect against the mapping document instead of the primary one
        #[arg(long)]
        mapping: bool,

        /// Rows scanned for header cells
        #[arg(long)]
        max_header_rows: Option<usize>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage translation profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// List all profiles
    List,

    /// Print a profile as JSON
    Show {
        /// Profile name
        name: String,
    },

    /// Import a profile JSON file
    Import {
        /// Profile JSON file to import
        file: PathBuf,
        /// Name for the profile
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Delete a user profile
    Delete {
        /// Profile name
        name: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let options = ReconcileOptions::from_env();

    let result = match cli.command {
        Commands::Translate {
            profile,
            primary,
            mapping,
            weights,
            max_header_rows,
            full,
            output,
        } => {
            let options = ReconcileOptions {
                max_header_rows: max_header_rows.unwrap_or(options.max_header_rows),
                full_output: full,
                ..options
            };
            cmd_translate(&profile, &primary, &mapping, weights.as_deref(), &options, output.as_deref())
        }

        Commands::Splits {
            profile,
            mapping,
            template,
            max_header_rows,
        } => {
            let options = ReconcileOptions {
                max_header_rows: max_header_rows.unwrap_or(options.max_header_rows),
                ..options
            };
            cmd_splits(&profile, &mapping, template.as_deref(), &options)
        }

        Commands::Locate {
            profile,
            file,
            mapping,
            max_header_rows,
        } => {
            let max_rows = max_header_rows.unwrap_or(options.max_header_rows);
            cmd_locate(&profile, &file, mapping, max_rows, &options)
        }

        Commands::Serve { port } => cmd_serve(port, options).await,

        Commands::Profile { action } => cmd_profile(action, &options),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_profile(name: &str, options: &ReconcileOptions) -> Result<TranslationProfile, Box<dyn std::error::Error>> {
    let registry = ProfileRegistry::with_dir(&options.profile_dir);
    Ok(registry.require(name)?.clone())
}

fn cmd_translate(
    profile: &str,
    primary: &Path,
    mapping: &Path,
    weights: Option<&Path>,
    options: &ReconcileOptions,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = load_profile(profile, options)?;

    let weights = match weights {
        Some(path) => WeightMap::from_json_str(&fs::read_to_string(path)?)?,
        None => WeightMap::new(),
    };

    let result = translate_files(primary, mapping, &profile, &weights, options)?;

    eprintln!(
        "\n📊 {} rows ({} primary, {} mapping), {} warning(s)",
        result.table.len(),
        result.primary.rows,
        result.mapping.rows,
        result.warnings.len()
    );

    let json = serde_json::to_string_pretty(&result.table.to_records())?;
    write_output(&json, output)?;

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_splits(
    profile: &str,
    mapping: &Path,
    template: Option<&Path>,
    options: &ReconcileOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = load_profile(profile, options)?;
    let grid = read_grid_file(mapping)?;
    let groups = mapping_splits(grid, &profile, options)?;

    for group in &groups {
        eprintln!("  🔀 {} → {} targets", group.key, group.targets.len());
    }

    if let Some(path) = template {
        let json = serde_json::to_string_pretty(&WeightMap::defaults_for(&groups))?;
        fs::write(path, json)?;
        eprintln!("💾 Weights template written to: {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}

fn cmd_locate(
    profile: &str,
    file: &Path,
    mapping: bool,
    max_rows: usize,
    options: &ReconcileOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let profile = load_profile(profile, options)?;
    let (document, doc_profile) = if mapping {
        ("mapping", &profile.mapping)
    } else {
        ("primary", &profile.primary)
    };

    let grid = read_grid_file(file)?;
    let header_map = locate_document(document, &grid, doc_profile, max_rows)?;
    println!("{}", serde_json::to_string_pretty(&header_map)?);
    Ok(())
}

async fn cmd_serve(port: u16, options: ReconcileOptions) -> Result<(), Box<dyn std::error::Error>> {
    datatranslator::server::start_server(port, options).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}

fn cmd_profile(action: ProfileAction, options: &ReconcileOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut registry = ProfileRegistry::with_dir(&options.profile_dir);

    match action {
        ProfileAction::List => {
            let profiles = registry.list();
            eprintln!("📋 Profiles ({}):\n", profiles.len());
            for p in profiles {
                let kind = if p.builtin { "built-in" } else { "user" };
                println!("  📄 {} ({})", p.profile.name, kind);
                if !p.profile.description.is_empty() {
                    println!("     {}", p.profile.description);
                }
                println!("     Key: {}", p.profile.key_column);
                if let Some(ref allocation) = p.profile.allocation {
                    println!(
                        "     Splits: {} across {}",
                        allocation.value_column,
                        allocation.target_columns.join(", ")
                    );
                }
                if let Some(ref path) = p.path {
                    println!("     File: {}", path.display());
                }
                println!();
            }
        }

        ProfileAction::Show { name } => {
            let profile = registry.require(&name)?;
            println!("{}", profile.to_json()?);
        }

        ProfileAction::Import { file, name } => {
            eprintln!("📥 Importing profile from: {}", file.display());
            let name = registry.import(&file, name.as_deref())?;
            eprintln!("✅ Profile saved: {}", name);
        }

        ProfileAction::Delete { name } => {
            registry.delete(&name)?;
            eprintln!("🗑️  Profile deleted: {}", name);
        }
    }

    Ok(())
}
