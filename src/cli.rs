//! CLI argument parsing using clap derive macros

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{build::BuildCommand, platforms::PlatformsCommand};

/// wheelforge - remote multi-platform wheel builder
///
/// Creates a project on the ActiveState Platform, builds wheels for the
/// requested platforms, downloads them and optionally uploads them.
#[derive(Parser, Debug)]
#[command(name = "wheelforge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, download and optionally publish wheels for a package
    Build(BuildCommand),

    /// List accepted platform names
    Platforms(PlatformsCommand),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // Set up terminal colors
        if self.no_color {
            console::set_colors_enabled(false);
            console::set_colors_enabled_stderr(false);
        }

        match self.command {
            Commands::Build(cmd) => cmd.execute(self.verbose),
            Commands::Platforms(cmd) => cmd.execute(self.verbose),
        }
    }
}
