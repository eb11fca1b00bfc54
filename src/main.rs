//! `livefetch` CLI - Resolve playable live-stream URLs

mod cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use livefetch::Platform;

#[derive(Parser)]
#[command(name = "livefetch")]
#[command(about = "Resolve playable live-stream URLs from streaming platforms")]
#[command(version)]
struct Cli {
    /// Platform id (see --list)
    #[arg(short = 'l', long, required_unless_present = "list")]
    platform: Option<String>,

    /// Room id or full room URL
    #[arg(short = 'i', long = "id", required_unless_present = "list")]
    room: Option<String>,

    /// Quality label (OD, BD, UHD, HD, SD, LD) or index into the platform's list
    #[arg(short, long)]
    quality: Option<String>,

    /// HTTP(S) proxy, overrides the configured one
    #[arg(short, long)]
    proxy: Option<String>,

    /// Print the full result record instead of the URL envelope
    #[arg(long)]
    full: bool,

    /// List supported platforms and exit
    #[arg(long)]
    list: bool,

    /// Settings file (default: ~/.config/livefetch/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("livefetch=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("livefetch=warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        cmd::list::cmd_list();
        return ExitCode::SUCCESS;
    }

    let (Some(platform), Some(room)) = (cli.platform, cli.room) else {
        // clap enforces both unless --list
        return ExitCode::FAILURE;
    };

    let args = cmd::resolve::ResolveArgs {
        platform,
        room,
        quality: cli.quality,
        proxy: cli.proxy,
        full: cli.full,
        config: cli.config,
    };

    match cmd::resolve::cmd_resolve(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!();
            eprintln!("Please ensure:");
            eprintln!("1. Platform name and room id are correct");
            eprintln!("2. The proxy is reachable (if using -p/--proxy)");
            eprintln!("3. Supported platforms: {}", Platform::supported_list());
            ExitCode::FAILURE
        }
    }
}
