use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use clap::Parser;
use iqfetch::cli::{self, commands::ValidateArgs, Commands};
use iqfetch::config;
use iqfetch::errors::IqFetchError;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let log_file = match OpenOptions::new().create(true).append(true).open(&cli.log_file) {
        Ok(f) => f,
        Err(e) => {
            // No subscriber yet
            eprintln!("FATAL: failed to open {}: {}", cli.log_file, e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(!cli.no_color))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .init();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        built = env!("BUILD_TIMESTAMP"),
        git = option_env!("GIT_HASH").unwrap_or("unknown"),
        "Starting iqfetch"
    );

    let result = match cli.command {
        Commands::Fetch(args) => cli::fetch::handle_fetch(args, cli.quiet).await,
        Commands::Validate(args) => handle_validate(args).await,
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(e: &IqFetchError) -> i32 {
    match e.root() {
        IqFetchError::Config(_) | IqFetchError::Yaml(_) => 2,
        IqFetchError::NoApplications { .. } => 3,
        IqFetchError::Network(_) | IqFetchError::Http { .. } | IqFetchError::Decode(_) => 4,
        IqFetchError::Persist { .. } => 5,
        _ => 1,
    }
}

async fn handle_validate(args: ValidateArgs) -> Result<(), IqFetchError> {
    let file_config = config::load_file_config(args.config.as_deref().map(Path::new)).await?;
    let config = config::resolve_config(file_config.as_ref(), |key| std::env::var(key).ok())?;
    config::validate_config(&config)?;

    println!("Configuration is valid");
    println!("  server:       {}", config.server_url);
    println!("  username:     {}", config.username);
    println!("  organization: {}", config.organization_id.as_deref().unwrap_or("all"));
    println!("  output dir:   {}", config.output_dir.display());
    println!("  timeout:      {}s", config.timeout.as_secs());
    println!("  merge order:  {}", config.merge_order);
    Ok(())
}
