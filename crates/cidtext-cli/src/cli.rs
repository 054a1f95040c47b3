use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Extract reading-order text from PDF documents that use CID fonts.
#[derive(Debug, Parser)]
#[command(name = "cidtext", about, version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract text from PDF pages, one line per visual line
    Text {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Vertical distance within which runs share a line (default: 3.0)
        #[arg(long, default_value_t = 3.0)]
        y_tolerance: f64,

        /// Drop runs whose origin lies outside the page's visible box
        #[arg(long)]
        clip: bool,

        /// Omit the '--- Page N ---' header before each page
        #[arg(long)]
        no_page_marker: bool,
    },
    /// List the text runs of each page with their position, font and size
    Runs {
        /// Path to the PDF file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Page range (e.g. '1,3-5'). Default: all pages
        #[arg(long)]
        pages: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

/// Output format for both subcommands.
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// One JSON object per line
    Json,
}
