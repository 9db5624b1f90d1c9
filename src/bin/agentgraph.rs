//! Agentgraph CLI Binary
//!
//! Command-line interface for the knowledge graph and agent tool router.

use agentgraph::logging::init_logging;
use agentgraph::tooling::cli::{apply_log_overrides, load_config, Cli, CliContext, Commands};
use agentgraph::tooling::serve;
use clap::Parser;
use std::process;
use std::sync::Arc;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match load_config(&cli.workspace, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };
    apply_log_overrides(&cli, &mut config);

    if let Err(e) = init_logging(Some(&config.logging)) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let context = match CliContext::from_config(cli.workspace.clone(), config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "Failed to initialize workspace");
            eprintln!("Error initializing workspace: {}", e);
            process::exit(1);
        }
    };

    if cli.command.needs_agents() {
        context.start_agents().await;
    }

    let outcome = match &cli.command {
        Commands::Serve => serve(
            Arc::clone(context.api()),
            tokio::io::stdin(),
            tokio::io::stdout(),
        )
        .await
        .map(|_| None),
        command => context.execute(command).await.map(Some),
    };
    context.shutdown();

    match outcome {
        Ok(Some(output)) => println!("{}", output),
        Ok(None) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
