// SPDX-FileCopyrightText: 2026 Reactiv Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reactiv - fallback-and-recovery delivery for outbound WhatsApp campaigns.
//!
//! This is the binary entry point for the Reactiv service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod client;
mod commands;
mod serve;
mod shutdown;
mod status;

use clap::{Parser, Subcommand};

use crate::commands::SendArgs;

/// Reactiv - fallback-and-recovery delivery for outbound WhatsApp campaigns.
#[derive(Parser, Debug)]
#[command(name = "reactiv", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the delivery service (health loop, queue drain, gateway).
    Serve,
    /// Show health level, mode and queue counts of a running service.
    Status {
        /// Output as JSON for scripting.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Send one message through the fallback chain.
    Send {
        /// Recipient phone number.
        #[arg(long)]
        to: String,
        /// Message text.
        #[arg(long)]
        body: String,
        /// Campaign tag forwarded with the message.
        #[arg(long)]
        campaign: Option<String>,
        /// Queue ahead of normal traffic if every channel fails.
        #[arg(long)]
        high: bool,
        /// Dispatch in this process instead of through the running gateway.
        /// Do not combine with a live `reactiv serve` on the same state.
        #[arg(long)]
        offline: bool,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Trigger a manual recovery on the running service.
    Recover {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run one queue drain cycle on the running service.
    Drain {
        /// Upper bound on items processed this cycle.
        #[arg(long)]
        max_items: Option<usize>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match reactiv_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            reactiv_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Send {
            to,
            body,
            campaign,
            high,
            offline,
            json,
        }) => {
            commands::run_send(
                &config,
                SendArgs {
                    to,
                    body,
                    campaign,
                    high,
                    offline,
                    json,
                },
            )
            .await
        }
        Some(Commands::Recover { json }) => commands::run_recover(&config, json).await,
        Some(Commands::Drain { max_items, json }) => {
            commands::run_drain(&config, max_items, json).await
        }
        None => {
            println!("reactiv: use --help for available commands");
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

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_minimal_config() {
        let config = reactiv_config::load_and_validate_str(
            r#"
[channels.primary]
url = "https://flows.example.com/webhook/send"
"#,
        )
        .expect("minimal config should be valid");
        assert_eq!(config.service.name, "reactiv");
        assert!(!config.gateway.enabled);
    }

    #[test]
    fn cli_parses_send_flags() {
        let cli = Cli::try_parse_from([
            "reactiv", "send", "--to", "5511999999999", "--body", "Oi", "--high",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Send {
                to,
                high,
                campaign,
                offline,
                ..
            }) => {
                assert_eq!(to, "5511999999999");
                assert!(high);
                assert!(campaign.is_none());
                assert!(!offline);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_offline_send() {
        let cli = Cli::try_parse_from([
            "reactiv", "send", "--to", "5511", "--body", "Oi", "--offline",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Send { offline: true, high: false, .. })
        ));
    }

    #[test]
    fn cli_parses_drain_limit() {
        let cli = Cli::try_parse_from(["reactiv", "drain", "--max-items", "5", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Drain { max_items: Some(5), json: true })
        ));
    }
}
