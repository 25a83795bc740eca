// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! busauth-ctl
//!
//! ```bash
//! # Check a configuration file
//! busauth-ctl validate --config busauth.yaml
//!
//! # List built-in interfaces (or dump introspection XML)
//! busauth-ctl interfaces --xml
//!
//! # Simulate an engine authenticating peer.A against the configured passwords
//! busauth-ctl probe --config busauth.yaml --peer peer.A --secret secret1 --retries 2
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use busauth::interface::MemberKind;
use busauth::{
    AuthConfig, AuthenticationCoordinator, AuthenticationOutcome, CoordinatorStatsSnapshot,
    InterfaceRegistry, PasswordTable, PeerIdentity, PeerStateTable,
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "busauth-ctl")]
#[command(about = "Peer authentication coordinator toolbox")]
#[command(version)]
struct Cli {
    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error).
    /// Defaults to the config file's `log_level`, then `warn`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a configuration file
    Validate {
        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// List built-in bus interfaces
    Interfaces {
        /// Print introspection XML instead of a summary
        #[arg(long)]
        xml: bool,
    },

    /// Run one simulated handshake against the configured passwords
    Probe {
        /// Configuration file
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Remote peer bus name
        #[arg(long)]
        peer: String,

        /// Secret the simulated peer expects
        #[arg(long)]
        secret: String,

        /// Mechanism to report (defaults to the first configured one)
        #[arg(short, long)]
        mechanism: Option<String>,

        /// Credential requests before giving up. The password table answers
        /// the same way each time, so retries only exercise the request path.
        #[arg(long, default_value = "1")]
        retries: u32,
    },
}

const DEFAULT_LOG_LEVEL: &str = "warn";

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let flag = cli.log_level.as_deref();

    // Commands taking a config load it first: its `log_level` is the
    // logger's default.
    match cli.command {
        Commands::Validate { config: path } => {
            let config = load_config(&path)?;
            init_logging(effective_log_level(flag, Some(&config)));
            cmd_validate(&path, &config)
        }
        Commands::Interfaces { xml } => {
            init_logging(effective_log_level(flag, None));
            cmd_interfaces(xml)
        }
        Commands::Probe {
            config: path,
            peer,
            secret,
            mechanism,
            retries,
        } => {
            let config = load_config(&path)?;
            init_logging(effective_log_level(flag, Some(&config)));
            cmd_probe(&config, &peer, &secret, mechanism, retries)
        }
    }
}

/// `--log-level`, else the config's `log_level`, else `warn`.
/// `RUST_LOG` still overrides the result.
fn effective_log_level<'a>(flag: Option<&'a str>, config: Option<&'a AuthConfig>) -> &'a str {
    flag.or_else(|| config.map(|c| c.log_level.as_str()))
        .unwrap_or(DEFAULT_LOG_LEVEL)
}

fn init_logging(default_level: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .try_init();
    log::debug!("[ctl] Log level {}", default_level);
}

fn load_config(path: &Path) -> anyhow::Result<AuthConfig> {
    AuthConfig::from_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn cmd_validate(path: &Path, config: &AuthConfig) -> anyhow::Result<ExitCode> {
    println!("Configuration valid: {}", path.display());
    println!("  Mechanisms:       {}", config.mechanism_list());
    println!("  Peers:            {}", config.peers.len());
    println!("  Log level:        {}", config.log_level);
    println!(
        "  Default password: {}",
        if config.default_password.is_some() {
            "set"
        } else {
            "unset"
        }
    );
    if !config.needs_password_handler() {
        println!("  Note: no configured mechanism uses a password");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_interfaces(xml: bool) -> anyhow::Result<ExitCode> {
    let registry = InterfaceRegistry::with_builtin().context("Built-in interface table")?;

    for descriptor in registry.iter() {
        if xml {
            print!("{}", descriptor.to_introspection_xml());
            continue;
        }

        println!(
            "{} at {}{}",
            descriptor.name,
            descriptor.object_path.unwrap_or("(any path)"),
            if descriptor.announced { " [announced]" } else { "" }
        );
        for member in descriptor.members {
            let shape = match member.kind {
                MemberKind::Method => format!("({}) -> ({})", member.signature, member.reply_signature),
                MemberKind::Signal => format!("({})", member.signature),
                MemberKind::Property => format!(
                    ": {} [{}]",
                    member.signature,
                    member.access.map(|a| a.as_str()).unwrap_or("read")
                ),
            };
            println!("  {:<8} {}{}", member.kind.as_str(), member.name, shape);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Result of one simulated handshake.
struct HandshakeReport {
    succeeded: bool,
    requests: u32,
    handler_outcome: Option<AuthenticationOutcome>,
    secure: bool,
    stats: CoordinatorStatsSnapshot,
}

impl HandshakeReport {
    fn exit_code(&self) -> ExitCode {
        if self.succeeded {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

fn run_handshake(
    config: &AuthConfig,
    peer: &str,
    secret: &str,
    mechanism: Option<String>,
    retries: u32,
) -> anyhow::Result<HandshakeReport> {
    let peer = PeerIdentity::new(peer)?;
    let mechanism = match mechanism {
        Some(m) => m,
        None => config
            .mechanisms
            .first()
            .cloned()
            .context("No mechanism configured")?,
    };

    let table = Arc::new(PasswordTable::from_config(config)?);
    let coordinator = AuthenticationCoordinator::with_handler(table.clone());
    let peers = PeerStateTable::new();

    let _guard = peers.try_begin_attempt(&peer)?;
    let mut attempt = coordinator.begin_attempt(peer.clone());

    let mut succeeded = false;
    for n in 1..=retries.max(1) {
        match attempt.request_credential()? {
            Some(credential) if credential.expose() == secret => {
                println!("Attempt {}: credential accepted", n);
                succeeded = true;
                break;
            }
            Some(_) => println!("Attempt {}: credential rejected", n),
            None => println!("Attempt {}: no credential available", n),
        }
    }
    let requests = attempt.credential_requests();

    let outcome = attempt.complete(&mechanism, succeeded);
    peers.record_outcome(&outcome);

    Ok(HandshakeReport {
        succeeded,
        requests,
        handler_outcome: table.last_outcome(&peer),
        secure: peers.get(&peer).is_some_and(|state| state.is_secure()),
        stats: coordinator.stats(),
    })
}

fn cmd_probe(
    config: &AuthConfig,
    peer: &str,
    secret: &str,
    mechanism: Option<String>,
    retries: u32,
) -> anyhow::Result<ExitCode> {
    let report = run_handshake(config, peer, secret, mechanism, retries)?;

    match &report.handler_outcome {
        Some(seen) => println!("Handler saw: {}", seen),
        None => println!("Handler saw no outcome for {}", peer),
    }
    println!(
        "Peer state: secure={} credential requests={}",
        report.secure, report.requests
    );
    print_stats(&report.stats);

    Ok(report.exit_code())
}

fn print_stats(stats: &CoordinatorStatsSnapshot) {
    println!("Statistics:");
    println!("  Credentials requested:   {}", stats.credentials_requested);
    println!("  Credentials unavailable: {}", stats.credentials_unavailable);
    println!("  Outcomes succeeded:      {}", stats.outcomes_succeeded);
    println!("  Outcomes failed:         {}", stats.outcomes_failed);
    println!("  Callback failures:       {}", stats.callback_failures);
}
