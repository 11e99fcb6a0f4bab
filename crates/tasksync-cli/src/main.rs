//! tasksync binary entry point.
//!
//! Runs taskwarrior commands for one account and relays its sync traffic
//! over TLS while the process is alive.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;

use tasksync_cli::{Cli, Command};
use tasksync_core::{AccountConfig, AccountController};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_format = cli.log_format.into();
    if let Err(e) = tasksync_core::init_logging(cli.verbose, cli.log_file.as_deref(), log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "tasksync starting");

    let config = AccountConfig::new(
        &cli.account,
        cli.account_dir(),
        cli.task_bin.clone(),
        cli.root.clone(),
    );
    let controller = AccountController::new(config).await;

    match run(&controller, &cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(controller: &AccountController, command: &Command) -> tasksync_core::Result<()> {
    match command {
        Command::Add { fields } => controller.add(fields).await,
        Command::Modify { uuid, fields } => controller.modify(uuid, fields).await,
        Command::Done { uuid } => controller.done(uuid).await,
        Command::Sync => controller.sync().await,
        Command::Export { query } => {
            for task in controller.export(query).await {
                println!("{task}");
            }
            Ok(())
        }
        Command::Settings { keys } => {
            if keys.is_empty() {
                for (key, value) in controller.all_settings().await {
                    println!("{key} {value}");
                }
            } else {
                let wanted: Vec<&str> = keys.iter().map(String::as_str).collect();
                let settings = controller.settings(&wanted).await;
                for key in &wanted {
                    if let Some(value) = settings.get(*key) {
                        println!("{key} {value}");
                    }
                }
            }
            Ok(())
        }
        Command::Reports => {
            for (name, description) in controller.reports().await {
                println!("{name}\t{description}");
            }
            Ok(())
        }
        Command::Report { name } => {
            let info = controller.report_info(name).await;
            println!("description: {}", info.description);
            println!("filter: {}", info.query);
            for (field, modifier) in &info.fields {
                if modifier.is_empty() {
                    println!("column: {field}");
                } else {
                    println!("column: {field}.{modifier}");
                }
            }
            for (field, ascending) in &info.sort {
                let dir = if *ascending { "+" } else { "-" };
                println!("sort: {field}{dir}");
            }
            if !info.priorities.is_empty() {
                println!("priorities: {}", info.priorities.join(","));
            }
            Ok(())
        }
    }
}
