//! List command handler.

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{print_json, print_separator, truncate_string};

pub fn execute(ctx: &CliContext) -> Result<(), CliError> {
    let components = ctx.registry.list_components()?;
    if ctx.json {
        return print_json(&components);
    }

    if components.is_empty() {
        println!("No components found in {}.", ctx.registry.components_dir().display());
        println!("Use 'clipforge add <name> <file>' to add your first component.");
        return Ok(());
    }

    println!("Found {} component(s):\n", components.len());
    println!(
        "{:<28} {:>8} {:>11}  File",
        "Name", "Frames", "Size"
    );
    print_separator(72);
    for entry in &components {
        let size = format!("{}x{}", entry.metadata.width, entry.metadata.height);
        println!(
            "{:<28} {:>8} {:>11}  {}",
            truncate_string(&entry.name, 27),
            entry.metadata.duration_in_frames,
            size,
            entry.relative_path.display()
        );
    }
    Ok(())
}
