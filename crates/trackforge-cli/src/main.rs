//! Trackforge CLI - Command-line interface for the Trackforge builder

mod commands;
mod format;
mod obj;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{build, validate};

#[derive(Parser)]
#[command(name = "trackforge")]
#[command(about = "Procedural racetrack geometry builder", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a track file into warped mesh geometry
    Build {
        /// Path to track TOML file
        track: String,

        /// Write built meshes to an OBJ file
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Validate a track file without building it
    Validate {
        /// Path to track TOML file
        track: String,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { track, output } => build::run(build::BuildArgs { track, output }),
        Commands::Validate { track, format } => {
            validate::run(validate::ValidateArgs { track, format })
        }
    }
}
