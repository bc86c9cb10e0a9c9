use clap::{Parser, Subcommand, Args};

#[derive(Parser)]
#[command(name = "iqfetch", version, about = "Export the latest IQ Server policy violations as CSV")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress the progress display
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Append log records to this file
    #[arg(long, global = true, default_value = "app.log")]
    pub log_file: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the latest policy report of every application and write a CSV
    Fetch(FetchArgs),
    /// Validate configuration without contacting IQ Server
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Default)]
pub struct FetchArgs {
    /// YAML configuration file (default: config/iqfetch.yaml if present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Only include applications of this organization
    #[arg(long)]
    pub org_id: Option<String>,

    /// Directory the CSV is written to
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// CSV file name (default: current local time, e.g. 2024-05-01_13-45-00.csv)
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Overall timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Order rows by application instead of by completion
    #[arg(long)]
    pub stable_order: bool,
}

#[derive(Args, Clone, Default)]
pub struct ValidateArgs {
    /// YAML configuration file (default: config/iqfetch.yaml if present)
    #[arg(short, long)]
    pub config: Option<String>,
}
