//! User-facing configuration files.

pub mod sram;

pub use sram::{parse_sram_config, SramConfig};
