//! # mountain
//!
//! Watches a device directory for new entries and mounts anything that
//! looks like a removable disk under `<mount root>/<name>-mountain`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

mod cli;

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use mountain_common::config::WatchConfig;
use mountain_common::constants::APP_NAME;
use mountain_common::error::MountainError;
use nix::unistd::Uid;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, LogFormat};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("{e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Every fatal error surfaces here and is printed once by [`main`].
fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;
    init_tracing(&config, cli.log_format);

    if config.mount_enabled {
        ensure_root(nix::unistd::geteuid())?;
    }
    config.validate()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set signal handler")?;

    mountain_core::watch::run(config, running)?;
    Ok(())
}

/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_tracing(config: &WatchConfig, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}

fn ensure_root(euid: Uid) -> Result<(), MountainError> {
    if euid.is_root() {
        return Ok(());
    }
    Err(MountainError::RootRequired { app: APP_NAME })
}
