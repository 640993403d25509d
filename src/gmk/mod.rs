//! GameMaker 8.0/8.1 project formats.
pub mod action;
pub mod archive;
pub mod defaults;
pub mod exe;
pub mod obfuscation;
pub mod packing;
pub mod project;
pub mod resources;
pub mod settings;
pub mod stream;
pub mod tree;

/// Which container a record is being read from.
///
/// Compiled games share the record shapes of the archive but drop timestamps and editor-only
/// fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Native `.gmk` / `.gm81` project archive
    Archive,
    /// Game data embedded in a compiled executable
    Executable,
}
