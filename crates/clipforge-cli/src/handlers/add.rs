//! Add command handler.

use std::path::Path;

use clipforge_core::ComponentMetadata;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::print_json;

/// Read `file` and register it as component `name`.
///
/// The file is validated before anything is written; a rejected component
/// leaves the component directory and aggregation file untouched.
pub fn execute(
    ctx: &CliContext,
    name: &str,
    file: &Path,
    metadata: ComponentMetadata,
) -> Result<(), CliError> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| CliError::Io(format!("cannot read {}: {e}", file.display())))?;

    let entry = ctx.registry.add_component_safely(name, &content, metadata)?;
    if ctx.json {
        return print_json(&entry);
    }

    println!(
        "Added {} ({}) with {}",
        entry.name,
        entry.relative_path.display(),
        entry.metadata
    );
    Ok(())
}
