use crate::types::*;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

/// Recover GameMaker 8.0/8.1 projects from archives and compiled games
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Arg {
    #[arg(global = true, action = ArgAction::SetTrue, short, long)]
    /// Print backtrace on error
    pub backtrace: bool,
    #[command(subcommand)]
    /// Command
    pub command: Command,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
/// Executable version to assume
pub enum ExeVersion {
    #[default]
    /// Try 8.0 first, then 8.1
    Auto,
    #[value(name = "800", alias("8.0"))]
    /// GameMaker 8.0
    V800,
    #[value(name = "810", alias("8.1"))]
    /// GameMaker 8.1
    V810,
}

impl ExeVersion {
    pub fn version(self) -> Option<GmkVersion> {
        match self {
            Self::Auto => None,
            Self::V800 => Some(GmkVersion::V800),
            Self::V810 => Some(GmkVersion::V810),
        }
    }
}

#[derive(Args, Debug)]
/// Options for reading the input file
pub struct LoadArgs {
    /// Input game executable or project archive
    pub input: String,
    #[arg(long, value_enum, default_value_t = ExeVersion::Auto)]
    /// Executable version, ignored for archives
    pub exe_version: ExeVersion,
    #[arg(long, action = ArgAction::SetTrue)]
    /// Do not extract the game icon from the executable
    pub no_icon: bool,
}

impl LoadArgs {
    pub fn config(&self) -> LoadConfig {
        LoadConfig {
            exe_version: self.exe_version.version(),
            extract_icon: !self.no_icon,
        }
    }
}

#[derive(Subcommand, Debug)]
/// Commands
pub enum Command {
    /// Convert a game or archive into a project archive
    Convert {
        #[command(flatten)]
        load: LoadArgs,
        /// Output archive, defaults to the input path plus .gmk or .gm81
        output: Option<String>,
        #[arg(short = 'V', long, value_enum)]
        /// Archive version to write, defaults to the input's version
        output_version: Option<GmkVersion>,
    },
    /// Print a JSON summary of a game or archive
    Info {
        #[command(flatten)]
        load: LoadArgs,
    },
}

pub fn parse_args() -> Arg {
    Arg::parse()
}
