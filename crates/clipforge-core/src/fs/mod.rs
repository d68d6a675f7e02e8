//! Filesystem helpers shared by every writer.

mod atomic;

pub use atomic::{atomic_write, atomic_write_str, is_temp_artifact};
