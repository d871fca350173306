use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Video annotation timeline toolkit
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Chroma-key an image onto transparency and write it out as PNG
    Key {
        /// Source image (PNG or JPEG)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output PNG with keyed alpha
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: PathBuf,

        /// Key color as a hex string
        #[arg(short = 'c', long = "color", value_name = "#RRGGBB", default_value = "#00FF00")]
        color: String,

        /// Color match tolerance, 0-100
        #[arg(short = 't', long = "tolerance", value_name = "N", default_value = "40")]
        tolerance: f32,

        /// Spill suppression strength, 0-100
        #[arg(short = 's', long = "spill", value_name = "N", default_value = "50")]
        spill: f32,

        /// Edge softness, 0-100
        #[arg(short = 'e', long = "softness", value_name = "N", default_value = "20")]
        softness: f32,
    },

    /// Print a summary of a saved analysis session
    Inspect {
        /// Session JSON file
        #[arg(value_name = "SESSION")]
        session: PathBuf,
    },
}
