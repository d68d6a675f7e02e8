//! Corruption-safe component registry.
//!
//! A directory of component files is the source of truth. The aggregation
//! file that lists them (`src/Root.tsx` by default) is always regenerated
//! in full from a scan of that directory:
//!
//! 1. Every `.tsx`/`.jsx` file is checked against [`ComponentContract`]
//! 2. Invalid files are skipped and logged
//! 3. Valid entries are deduplicated by name, first file wins
//! 4. Survivors are sorted by name and rendered through a fixed template
//! 5. The result replaces the aggregation file atomically
//!
//! Regeneration is idempotent: the same directory always yields the same bytes.

mod contract;
mod error;
mod header;
mod manager;
mod render;
mod scan;

pub use contract::{ComponentContract, ContractViolation, exported_names};
pub use error::RegistryError;
pub use header::{HEADER_PREFIX, parse_header, render_header};
pub use manager::{RegistryIssue, RegistryManager, RepairReport, ValidationReport};
pub use render::{FPS, parse_composition_ids, render};
pub use scan::{COMPONENT_EXTENSIONS, DroppedDuplicate, ScanOutcome, SkippedFile, scan_components};
