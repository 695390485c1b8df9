//! FM Radio
//!
//! Command-line front end for the TEA5767 FM receiver. Each invocation runs
//! one command against the receiver and remembers the registers it left
//! behind for the next run.

mod command;
mod radio;
mod settings;

use anyhow::{Context, Result};
use command::{Command, USAGE};
use radio::Radio;
use settings::Settings;
use tea5767_tuner::{CancelToken, StdDelay};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "fm_radio=info,tea5767_protocol=info,tea5767_tuner=info,tea5767_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let command = match Command::parse(std::env::args().skip(1)) {
        Ok(Command::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let mut settings = Settings::load();
    let cancel = CancelToken::new();

    let worker_settings = settings.clone();
    let worker_cancel = cancel.clone();
    let mut worker = tokio::task::spawn_blocking(move || {
        let mut radio = Radio::simulated(&worker_settings, StdDelay)?;
        let lines = radio.execute(
            command,
            &worker_cancel,
            worker_settings.scan_log.as_deref(),
        )?;
        anyhow::Ok((lines, radio.config()))
    });

    let joined = tokio::select! {
        joined = &mut worker => joined,
        _ = tokio::signal::ctrl_c() => {
            if command.is_long_running() {
                tracing::warn!("Interrupted, stopping");
            }
            cancel.cancel();
            worker.await
        }
    };
    let (lines, config) = joined.context("Radio task panicked")??;

    for line in lines {
        println!("{}", line);
    }

    settings.remember(config);
    if let Err(e) = settings.save() {
        tracing::warn!("Could not save settings: {:#}", e);
    }

    Ok(())
}
