//! # Command Line Interface
//!
//! `iam-recycler [--config PATH] [--verbose] <run|once|check>`

pub mod output;

use crate::config::{load_config, AppConfig};
use crate::observability::{init_logging, log_config_info};
use crate::recycler::next_run;
use crate::startup::build_controller;
use crate::status::{FileStatusStore, StatusStore};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

use output::{print_json, print_report_table, print_schedule_table, ReportRow, ScheduleRow};

#[derive(Parser)]
#[command(name = "iam-recycler")]
#[command(about = "Rotates access keys on a schedule and publishes them into secret records")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the controller for every policy until interrupted
    Run,

    /// Reconcile every policy once and exit
    Once {
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration and show each policy's schedule
    Check {
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    init_logging(&config.observability, cli.verbose)?;
    log_config_info(&config);

    match cli.command {
        Commands::Run => handle_run(&config).await?,
        Commands::Once { json } => handle_once(&config, json).await?,
        Commands::Check { json } => handle_check(&config, json).await?,
    }

    Ok(())
}

async fn handle_run(config: &AppConfig) -> anyhow::Result<()> {
    let controller = build_controller(config).await?;
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
        }
        signal_token.cancel();
    });

    controller.run(shutdown).await?;
    Ok(())
}

async fn handle_once(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let controller = build_controller(config).await?;
    let reports = controller.run_once().await;
    let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from).collect();

    if json {
        print_json(&rows)?;
    } else {
        print_report_table(&rows);
    }

    let failed = rows.iter().filter(|row| row.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} policies failed to reconcile", failed, rows.len());
    }
    Ok(())
}

async fn handle_check(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let status = FileStatusStore::new(config.controller.status_dir.clone());
    let mut rows = Vec::with_capacity(config.policies.len());

    for policy in &config.policies {
        let state = status
            .load(&policy.name)
            .await
            .with_context(|| format!("Failed to read status of policy '{}'", policy.name))?;
        rows.push(ScheduleRow {
            policy: policy.name.clone(),
            identity: policy.identity_name.clone(),
            secret: policy.secret_name.clone(),
            interval_minutes: policy.recycle_interval_minutes,
            last_rotation_time: state.last_rotation_time,
            next_run: next_run(&state, policy),
        });
    }

    if json {
        print_json(&rows)?;
    } else {
        println!("Configuration is valid ({} policies)", rows.len());
        print_schedule_table(&rows);
    }
    Ok(())
}
