use anyhow::Result;
use clap::{Parser, Subcommand};
use ember::{LaunchConfig, Launcher, Renderer};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "ember-launcher")]
#[command(about = "Launcher for the Ember engine with build-specific fixes")]
struct Args {
    /// Filesystem root for logs and crash reports
    #[arg(long)]
    root: Option<PathBuf>,

    /// Engine log file name
    #[arg(long, default_value = "engine.log")]
    log_file: PathBuf,

    /// Override the engine language (e.g. "english")
    #[arg(long)]
    language: Option<String>,

    /// Keep the vendor intro videos
    #[arg(long)]
    splash: bool,

    /// Force the D3D9 renderer
    #[arg(long, conflicts_with = "dx10")]
    dx9: bool,

    /// Force the D3D10 renderer
    #[arg(long)]
    dx10: bool,

    /// Run as a dedicated server (loads no renderer)
    #[arg(long)]
    dedicated: bool,

    /// Override the user data directory
    #[arg(long)]
    user_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List every engine build this launcher recognizes
    Builds,
    /// Show the patch catalog for one build
    Catalog {
        /// Engine build number (e.g. 6156)
        build: u32,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ember=info".parse()?)
                .add_directive("ember_cli=info".parse()?),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Some(Command::Builds) => commands::builds::run(),
        Some(Command::Catalog { build, json }) => commands::catalog::run(build, json),
        None => launch(args),
    }
}

fn launch(args: Args) -> Result<()> {
    let renderer = if args.dx9 {
        Renderer::D3D9
    } else if args.dx10 {
        Renderer::D3D10
    } else {
        Renderer::Auto
    };

    let config = LaunchConfig {
        root: args.root,
        log_file: Some(args.log_file),
        language: args.language,
        keep_intros: args.splash,
        renderer,
        dedicated: args.dedicated,
        user_dir: args.user_dir,
    };

    info!("ember launcher starting");

    match Launcher::new(config).run() {
        Ok(code) => {
            info!(code, "engine exited");
            std::process::exit(code);
        }
        Err(e) => {
            // One diagnostic line, then a non-zero status. The engine never
            // received control on this path.
            error!("launch aborted: {e}");
            std::process::exit(1);
        }
    }
}
