//! rbac-allowlist CLI - manage approved exceptions for Azure RBAC findings.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let context = commands::Context {
        config: cli.config,
        store: cli.store,
        verbose: cli.verbose,
    };

    let result = match cli.command {
        Commands::Add {
            identity,
            scope,
            scope_type,
            role,
            approval,
            modified_by,
        } => commands::add::run(
            &context,
            cli::build_draft(identity, scope, scope_type, role, approval, modified_by),
        ),

        Commands::Update {
            id,
            identity,
            scope,
            clear_scope,
            scope_type,
            role,
            approval,
            modified_by,
        } => commands::update::run(
            &context,
            &id,
            cli::build_patch(identity, scope, clear_scope, scope_type, role, approval),
            &modified_by,
        ),

        Commands::Remove {
            id,
            object_id,
            name_pattern,
            scope_type,
            role,
            scope_object_id,
            tenant,
        } => commands::remove::run(
            &context,
            id,
            cli::build_criteria(object_id, name_pattern, scope_type, role, scope_object_id, tenant),
        ),

        Commands::List { expired, json } => commands::list::run(&context, expired, json),

        Commands::Filter {
            dataset,
            mode,
            output,
            format,
            as_of,
        } => commands::filter::run(&context, dataset, mode, output, format, as_of),

        Commands::GetDataset { dir, prefix } => commands::get_dataset::run(&context, dir, prefix),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
