//! Platforms command implementation

use anyhow::Result;
use clap::Args;
use console::style;

use crate::pipeline::platforms::Platform;

/// List accepted platform names and their build tags
#[derive(Args, Debug)]
pub struct PlatformsCommand {}

impl PlatformsCommand {
    /// Execute the platforms command
    pub fn execute(self, _verbose: bool) -> Result<()> {
        println!(
            "{}",
            style(format!("{:<10} {:<8} {}", "PLATFORM", "SHORT", "BUILD TAG")).bold()
        );
        for platform in Platform::ALL {
            println!(
                "{:<10} {:<8} {}",
                platform.as_str(),
                platform.short_form(),
                platform.build_tag()
            );
        }

        if let Some(host) = Platform::host() {
            println!("\nThis machine is {}; it is skipped unless --include-host is given.", host);
        }
        Ok(())
    }
}
