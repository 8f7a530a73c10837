//! SRAM block generators, from column peripherals up to the full macro.

pub mod bank;
pub mod bitcell_array;
pub mod column_mux;
pub mod columns;
pub mod completion;
pub mod control;
pub mod decoder;
pub mod lfsr;
pub mod logic;
pub mod multi_bank;
pub mod split_merge;
pub mod sram;
pub mod wl_driver;
