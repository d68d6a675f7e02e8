//! Command-line adapter for clipforge.
//!
//! The binary parses arguments ([`Cli`]), composes the components once
//! ([`bootstrap`]) and routes each subcommand to a handler.

#![deny(unsafe_code)]

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod presentation;

pub use bootstrap::{CliContext, bootstrap};
pub use commands::Commands;
pub use error::CliError;
pub use parser::Cli;

use clipforge_core::ComponentMetadata;

/// Run one parsed command against a composed context.
pub async fn dispatch(ctx: &CliContext, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Resolve { name, paths } => handlers::resolve::execute(ctx, &name, paths).await,
        Commands::Add {
            name,
            file,
            frames,
            width,
            height,
        } => handlers::add::execute(
            ctx,
            &name,
            &file,
            ComponentMetadata::new(frames, width, height),
        ),
        Commands::Repair => handlers::registry::repair(ctx),
        Commands::Validate => handlers::registry::validate(ctx),
        Commands::List => handlers::list::execute(ctx),
        Commands::Remove { name } => handlers::registry::remove(ctx, &name),
        Commands::Launch { port } => handlers::launch::execute(ctx, port).await,
        Commands::Doctor => handlers::doctor::diagnose(ctx).await,
        Commands::Fix => handlers::doctor::fix(ctx),
        Commands::LaunchSafe { port } => handlers::launch::execute_safe(ctx, port).await,
    }
}
