//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the other crates expect from the host.
//! They contain no implementation details beyond the trivial production
//! adapter and a deterministic test double.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
