//! Resolve command handler.

use std::path::PathBuf;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_json;

/// Resolve `name`, searching `paths` before the configured extra paths.
pub async fn execute(ctx: &CliContext, name: &str, paths: Vec<PathBuf>) -> Result<(), CliError> {
    let mut search = paths;
    search.extend(ctx.config.extra_paths.iter().cloned());

    let resolved = ctx.resolver.resolve(name, &search).await?;
    if ctx.json {
        return print_json(&resolved);
    }

    println!("{} -> {}", resolved.name, resolved.path.display());
    println!("  version:  {}", resolved.version);
    println!("  strategy: {}", resolved.strategy);
    println!("  platform: {}", ctx.resolver.platform());
    for warning in &resolved.warnings {
        println!("  warning:  {warning}");
    }
    Ok(())
}
