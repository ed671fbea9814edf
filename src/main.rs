//! PredMaint - Main Entry Point
//!
//! Offline training and single-reading scoring from the command line.

use clap::Parser;
use predmaint::cli::{cmd_info, cmd_score, cmd_train, Cli, Commands};
use predmaint::schema::Observation;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predmaint=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { config, data, models_dir } => {
            cmd_train(config.as_deref(), data, models_dir)?;
        }
        Commands::Score {
            air_temp,
            process_temp,
            rpm,
            torque,
            tool_wear,
            product_id,
            machine_type,
            config,
            models_dir,
            threshold,
            model,
        } => {
            let observation = Observation {
                air_temperature_k: air_temp,
                process_temperature_k: process_temp,
                rotational_speed_rpm: rpm,
                torque_nm: torque,
                tool_wear_min: tool_wear,
                product_id,
                machine_type,
            };
            cmd_score(observation, config.as_deref(), models_dir, threshold, model)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
    }

    Ok(())
}
