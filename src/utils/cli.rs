use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "auto-apply")]
#[command(about = "Search job boards, tailor your resume and submit applications automatically", long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Target role to search for (overrides config)
    #[arg(short, long, value_name = "ROLE")]
    pub role: Option<String>,

    /// Path to the resume file (.txt, .md or .pdf)
    #[arg(long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Search location (overrides config)
    #[arg(short, long, value_name = "LOCATION")]
    pub location: Option<String>,

    /// Maximum number of jobs to process (overrides config)
    #[arg(short, long, value_name = "N")]
    pub max_jobs: Option<usize>,

    /// Apply a predefined search preset (software_engineer, data_scientist,
    /// frontend_developer, machine_learning_engineer)
    #[arg(short, long, value_name = "PRESET")]
    pub preset: Option<String>,

    /// Submit applications automatically after analysis
    #[arg(long)]
    pub auto_apply: bool,

    /// Run the full pipeline without submitting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub config_check: bool,

    /// Sets the logger's verbosity level
    #[arg(short, long, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,
}
