//! webpub: publish local web files to a remote platform environment.
//!
//! # Usage
//!
//! ```text
//! webpub bind <path> --remote <name> --package <pkg> [--workspace <dir>]
//! webpub unbind <path> [--workspace <dir>]
//! webpub bindings [--workspace <dir>]
//! webpub env list
//! webpub env add <name> --url <url> [--no-create] [--token-env <VAR>] [--api-version <v>]
//! webpub publish <path> --env <name> [--no-cache] [--details] [--workspace <dir>]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    bind::{BindArgs, BindingsArgs, UnbindArgs},
    env::EnvCommand,
    publish::PublishArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "webpub",
    version,
    about = "Publish local web resources to a remote environment",
    long_about = None,
)]
struct Cli {
    /// Log pipeline steps and HTTP activity to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind a local file or folder to a remote name inside a package.
    Bind(BindArgs),

    /// Remove the binding declared for a local path.
    Unbind(UnbindArgs),

    /// List the bindings of a workspace.
    Bindings(BindingsArgs),

    /// Manage configured environments.
    Env {
        #[command(subcommand)]
        command: EnvCommand,
    },

    /// Publish a bound file, or every supported file under a bound folder.
    Publish(PublishArgs),
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Bind(args) => args.run(),
        Commands::Unbind(args) => args.run(),
        Commands::Bindings(args) => args.run(),
        Commands::Env { command } => commands::env::run(command),
        Commands::Publish(args) => args.run().await,
    }
}
