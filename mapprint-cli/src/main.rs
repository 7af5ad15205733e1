//! mapprint CLI - Command-line interface
//!
//! Renders print jobs described by INI job files into a PDF or page JPEGs.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::render::RenderArgs;
use commands::zooms::ZoomsArgs;

#[derive(Parser)]
#[command(name = "mapprint")]
#[command(version = mapprint::VERSION)]
#[command(about = "Print maps from tile servers to PDF or JPEG", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a job file
    Render {
        /// Job file (INI)
        #[arg(long)]
        job: PathBuf,

        /// Output path; derived from the layers and paper when omitted
        #[arg(long)]
        output: Option<PathBuf>,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// Show the zoom levels suggested for a scale and resolution
    Zooms {
        /// Metres on the ground per printed centimetre
        #[arg(long, default_value = "500")]
        scale: f64,

        /// Print resolution in dpi
        #[arg(long, default_value = "300")]
        resolution: f64,

        /// Reference latitude in decimal degrees
        #[arg(long, default_value = "0", allow_negative_numbers = true)]
        lat: f64,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Render { job, output, debug } => {
            commands::render::run(RenderArgs { job, output, debug })
        }
        Commands::Zooms {
            scale,
            resolution,
            lat,
        } => commands::zooms::run(ZoomsArgs {
            scale,
            resolution,
            lat,
        }),
    };

    if let Err(e) = result {
        e.exit();
    }
}
