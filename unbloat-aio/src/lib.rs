// unbloat-aio/src/lib.rs
//! Blocking filesystem primitives, JSON file IO and async process execution
//! for unbloat.

pub mod fs;
pub mod json_io;
pub mod process;

pub use fs::{atomic_write_file, read_optional_bytes, read_optional_string};
pub use json_io::{read_json_sync, write_json_sync};
pub use process::run_command_async;
