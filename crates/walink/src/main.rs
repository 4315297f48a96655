// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Walink - a supervised messaging session with an HTTP control surface.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use walink_config::WalinkConfig;

/// Walink - a supervised messaging session with an HTTP control surface.
#[derive(Parser, Debug)]
#[command(name = "walink", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the session supervisor, relay and HTTP gateway.
    Serve,
    /// Show the state of a running service.
    Status {
        /// Output as JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Unlink the device and clear stored credentials on a running service.
    Logout,
}

fn load_config(path: Option<&PathBuf>) -> WalinkConfig {
    let loaded = match path {
        Some(path) => walink_config::load_and_validate_path(path),
        None => walink_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            walink_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => walink::serve::run_serve(config).await,
        Some(Commands::Status { json, plain }) => {
            walink::status::run_status(&config, json, plain).await
        }
        Some(Commands::Logout) => walink::logout::run_logout(&config).await,
        None => {
            println!("walink: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn status_flags_parse() {
        let cli = Cli::try_parse_from(["walink", "--config", "w.toml", "status", "--json"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("w.toml")));
        assert!(matches!(
            cli.command,
            Some(Commands::Status {
                json: true,
                plain: false
            })
        ));
    }

    #[test]
    fn default_config_is_valid() {
        let config = walink_config::load_and_validate_str("").expect("defaults should validate");
        assert!(config.gateway.enabled);
    }
}
