//! CLI command handlers.

pub mod config;
pub mod hash;
pub mod paths;
pub mod sync;

pub use config::run_config_print;
pub use hash::run_hash;
pub use paths::{run_decode_path, run_encode_path};
pub use sync::{SyncCommandInput, run_sync};
