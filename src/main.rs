//! wheelforge - build Python wheels on a remote build service
//!
//! ## Architecture
//!
//! ```text
//! Rust CLI → pipeline/ → State Tool + build service + mediator → dist/ → twine
//! ```

mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod pipeline;
mod utils;

use clap::Parser;

use cli::Cli;
use error::WheelforgeError;

fn main() {
    // Credentials and endpoint overrides may live in .env
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        match err.downcast_ref::<WheelforgeError>() {
            Some(e) => e.display_with_hints(),
            None => utils::terminal::print_error(&format!("{:#}", err)),
        }
        std::process::exit(1);
    }
}
