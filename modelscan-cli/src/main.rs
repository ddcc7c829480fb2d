use clap::Parser;

use modelscan_cli::cli::{Cli, Commands};
use modelscan_cli::commands;
use modelscan_cli::error::CliError;
use modelscan_cli::logging;
use modelscan_cli::output::OutputWriter;
use modelscan_core::config::GeneralConfig;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // --help / --version are not failures
            let code = if e.use_stderr() { 4 } else { 0 };
            std::process::exit(code);
        }
    };

    if let Err(e) = run(cli).await {
        if !e.is_scan_outcome() {
            eprintln!("error: {}", e);
        }
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (config_path, explicit) = cli.config_path();
    let config_path = config_path.to_path_buf();

    let loaded = commands::load_config(&config_path, explicit).await;

    // `config validate` must still run when loading fails, so logging falls back to defaults.
    let mut general = match &loaded {
        Ok(config) => config.general.clone(),
        Err(_) => GeneralConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;
    modelscan_core::metrics::describe_metrics();

    tracing::debug!(
        config = %config_path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "modelscan starting"
    );

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Scan(args) => commands::scan::execute(args, loaded?, &writer).await,
        Commands::Check(args) => commands::check::execute(args, loaded?, &writer),
        Commands::Config(args) => {
            commands::config::execute(args, &config_path, explicit, &writer).await
        }
    }
}
