//! Filesystem and path utilities.

pub mod fs;
pub mod paths;

pub use fs::{ensure_dir_exists, read_optional_to_string};
