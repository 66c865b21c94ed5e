//! CLI entry point for `inboxpeek`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};

use inboxpeek::config::{self, Config};
use inboxpeek::error::InboxError;
use inboxpeek::inspector::MessageView;
use inboxpeek::model::message::MessageEnvelope;
use inboxpeek::sync::{MemoryTransport, StatusSync};

/// Inspect saved inbox messages and replay verification push events.
#[derive(Parser)]
#[command(name = "inboxpeek", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the standard location)
    #[arg(long, global = true, env = "INBOXPEEK_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a saved message envelope and show its text and verification link
    Inspect {
        /// JSON file holding a message envelope as returned by the backend
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Feed a JSON-lines file of push frames through the status channel
    Replay {
        /// One inbound frame per line
        path: PathBuf,
        /// Address to subscribe for
        #[arg(short, long)]
        address: String,
        #[arg(long)]
        json: bool,
    },
    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write the default configuration to the standard location
    Init,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Inspect { path, json } => cmd_inspect(&path, json, &config),
        Commands::Replay {
            path,
            address,
            json,
        } => cmd_replay(&path, &address, json, &config),
        Commands::Config { action } => cmd_config(action, &config),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if config.general.log_to_file && std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "inboxpeek.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn read_file(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).map_err(|e| InboxError::io(path, e).into())
}

/// Run the content pipeline over a saved envelope.
fn cmd_inspect(path: &Path, json: bool, config: &Config) -> anyhow::Result<()> {
    let envelope = MessageEnvelope::from_json(&read_file(path)?)?;
    let view = MessageView::from_envelope(&envelope, &config.content);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Id:          {}", view.id);
    println!("From:        {}", view.from);
    println!("Subject:     {}", view.subject);
    if let Some(status) = envelope.verification_status.as_deref() {
        println!("Status:      {status}");
    }
    println!(
        "Verify link: {}",
        view.verify_url.as_deref().unwrap_or("(none)")
    );
    for attachment in &view.attachments {
        println!(
            "Attachment:  {} ({}, {} bytes)",
            attachment.filename, attachment.mime_type, attachment.size
        );
    }
    println!();
    println!("{}", view.display_text);
    Ok(())
}

/// Replay recorded push frames and print the resulting status map.
fn cmd_replay(path: &Path, address: &str, json: bool, config: &Config) -> anyhow::Result<()> {
    let contents = read_file(path)?;

    let transport = MemoryTransport::new();
    let mut sync =
        StatusSync::new(transport.clone()).with_event_budget(config.sync.max_events_per_pump);
    sync.subscribe(address)?;

    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        transport.push_to_latest(line);
    }
    while sync.pump() > 0 {}

    let state = sync.state();
    let stats = sync.stats();
    sync.close();

    if json {
        let report = serde_json::json!({
            "address": address,
            "state": state,
            "statuses": sync.statuses(),
            "stats": stats,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Address: {address}");
    println!("State:   {state:?}");
    println!("Applied: {}  Dropped: {}", stats.applied, stats.dropped);
    println!();
    if sync.statuses().is_empty() {
        println!("(no verification updates)");
    }
    for (id, status) in sync.statuses().iter() {
        println!("{id:<24} {status}");
    }
    Ok(())
}

fn cmd_config(action: ConfigAction, config: &Config) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
        ConfigAction::Init => {
            config::save_config(&Config::default())?;
            if let Some(path) = config::config_file_path() {
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "inboxpeek", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
