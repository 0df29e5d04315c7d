use clap::Parser;
use device_monitor::{cli, config::AppConfig, logging};

fn main() -> anyhow::Result<()> {
    let args = cli::CliArgs::parse();
    let config = AppConfig::load(&args)?;
    logging::init(&config.log_file, &config.log_level)?;
    tracing::info!(data_dir = %config.data_dir.display(), "device-monitor starting");

    let result = cli::run(args, &config);
    if let Err(e) = &result {
        tracing::error!(error = %e, "command failed");
    }
    result
}
