//! A Rust library for recovering GameMaker 8.0/8.1 projects from native archives and compiled
//! game executables.
pub mod driver;
pub mod gmk;
pub mod types;
pub mod utils;
