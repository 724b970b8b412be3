// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC Takeoff CLI - material and quantity summaries of IFC models.
//!
//! Files are uploaded into a local store (`--uploads-dir`, default from
//! `TAKEOFF_UPLOADS_DIR`) and addressed by id afterwards; `analyze` works on
//! a path directly without touching the store.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ifc_takeoff_engine::{EngineConfig, FileId, SkipSet, TakeoffEngine};
use std::path::{Path, PathBuf};

mod output;

#[derive(Parser)]
#[command(name = "ifc-takeoff")]
#[command(version, about = "Material takeoff for IFC building models", long_about = None)]
struct Cli {
    /// Directory holding uploaded models and metadata
    #[arg(long, global = true)]
    uploads_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store an IFC file and print its id
    Upload {
        /// Path to the .ifc file
        file: PathBuf,
    },
    /// Material summary of an uploaded file
    Summary {
        file_id: String,
        /// Density in kg/m³ (default 2400)
        #[arg(short, long)]
        density: Option<f64>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Export the material summary as CSV
    Export {
        file_id: String,
        #[arg(short, long)]
        density: Option<f64>,
        /// Output path; "-" writes to stdout (default: materials_<name>.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show or record the ExpressIDs the mesh export skipped
    Skip {
        file_id: String,
        /// ExpressIDs to record; none prints the current skip set
        ids: Vec<u32>,
    },
    /// Print the mesh index <-> ExpressID table
    MeshMap { file_id: String },
    /// Summarize an IFC file without storing it
    Analyze {
        file: PathBuf,
        #[arg(short, long)]
        density: Option<f64>,
        /// ExpressIDs to leave out, comma separated
        #[arg(long, value_delimiter = ',')]
        skip: Vec<u32>,
        #[arg(long)]
        json: bool,
    },
    /// List uploaded files
    List,
    /// Delete an uploaded file
    Delete { file_id: String },
    /// Delete every uploaded file and all metadata
    Purge,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "warn,ifc_takeoff_engine=info,ifc_takeoff_processing=info".into()
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            file,
            density,
            skip,
            json,
        } => analyze(&file, density, &skip, json),
        command => {
            let engine = open_engine(cli.uploads_dir)?;
            run(&engine, command)
        }
    }
}

fn open_engine(uploads_dir: Option<PathBuf>) -> Result<TakeoffEngine> {
    let mut config = EngineConfig::from_env();
    if let Some(dir) = uploads_dir {
        config = EngineConfig::new(dir).with_default_density(config.default_density);
    }
    TakeoffEngine::new(config).context("Failed to open file store")
}

fn run(engine: &TakeoffEngine, command: Commands) -> Result<()> {
    match command {
        Commands::Upload { file } => {
            let content =
                std::fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let filename = file
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            let receipt = engine.upload(&content, filename)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Commands::Summary {
            file_id,
            density,
            json,
        } => {
            let groups = engine.get_summary(&parse_id(&file_id)?, density)?;
            output::print_groups(&groups, json)?;
        }
        Commands::Export {
            file_id,
            density,
            output,
        } => {
            let export = engine.export_csv(&parse_id(&file_id)?, density)?;
            match output {
                Some(path) if path.as_os_str() == "-" => print!("{}", export.content),
                path => {
                    let path = path.unwrap_or_else(|| PathBuf::from(&export.file_name));
                    std::fs::write(&path, &export.content)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("Exported {}", path.display());
                }
            }
        }
        Commands::Skip { file_id, ids } => {
            let file_id = parse_id(&file_id)?;
            if !ids.is_empty() {
                engine.record_skip_set(&file_id, ids)?;
            }
            let skip = engine.skip_set(&file_id)?;
            println!("{}", serde_json::to_string_pretty(&skip)?);
        }
        Commands::MeshMap { file_id } => {
            let file_id = parse_id(&file_id)?;
            match engine.express_id_map(&file_id)? {
                Some(map) => println!("{}", serde_json::to_string_pretty(&map.lookup())?),
                None => anyhow::bail!("Mesh export has not run for {}", file_id),
            }
        }
        Commands::Analyze {
            file,
            density,
            skip,
            json,
        } => analyze(&file, density, &skip, json)?,
        Commands::List => output::print_files(&engine.list_files()),
        Commands::Delete { file_id } => {
            engine.delete_file(&parse_id(&file_id)?)?;
        }
        Commands::Purge => {
            let removed = engine.purge_all()?;
            eprintln!("Removed {} files", removed);
        }
    }

    Ok(())
}

fn parse_id(value: &str) -> Result<FileId> {
    Ok(FileId::parse(value)?)
}

fn analyze(file: &Path, density: Option<f64>, skip: &[u32], json: bool) -> Result<()> {
    let density = density.unwrap_or(EngineConfig::from_env().default_density);
    if !(density.is_finite() && density > 0.0) {
        anyhow::bail!("Invalid density {}: must be a positive number", density);
    }
    let skip: SkipSet = skip.iter().copied().collect();
    let groups = ifc_takeoff_engine::summarize_file(file, &skip, density)
        .with_context(|| format!("Failed to analyze {}", file.display()))?;
    output::print_groups(&groups, json)
}
