// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod logger;

use anyhow::Context;
use std::{env, process};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use syslog_forwarder::{
    config::ForwarderConfig,
    errors::CompletionStatus,
    forwarder::Forwarder,
    transport,
};

/// Reported when no run could start; outside the 0/1/2 range of run outcomes.
const CONFIG_ERROR_EXIT_CODE: i32 = 3;

#[tokio::main]
pub async fn main() {
    let log_level = env::var("SYSLOG_FWD_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    if let Err(e) = init_logging(&log_level) {
        eprintln!("SYSLOG_FWD | ERROR | {e:#}");
        process::exit(CONFIG_ERROR_EXIT_CODE);
    }
    debug!("Logging subsystem enabled");

    let config = match ForwarderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to start syslog forwarder: {e}");
            process::exit(CONFIG_ERROR_EXIT_CODE);
        }
    };

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown_signal(cancel_token.clone()));

    let transport = transport::from_config(&config);
    let mut forwarder = Forwarder::new(config, transport, cancel_token.clone());
    let result = forwarder.run().await;
    // lets the signal task exit
    cancel_token.cancel();

    let status = CompletionStatus::from_result(&result);
    match &status {
        CompletionStatus::Success => info!("Syslog forwarder finished"),
        CompletionStatus::SourceUnavailable => error!("Source unavailable, nothing was sent"),
        CompletionStatus::TransportFailure { index, reason } => {
            error!("Stopped at record {index}: {reason}");
        }
    }
    process::exit(status.exit_code());
}

fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("could not parse log level {log_level:?}"))?;
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .event_format(logger::Formatter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

/// Cancels the run on ctrl-c or SIGTERM. The forwarder stops at the next record boundary.
async fn cancel_on_shutdown_signal(cancel_token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = cancel_token.cancelled() => return,
        result = signal::ctrl_c() => match result {
            Ok(()) => info!("Received Ctrl+C, stopping"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
        },
        () = terminate => info!("Received SIGTERM, stopping"),
    }
    cancel_token.cancel();
}
