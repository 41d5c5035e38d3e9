//! `webpub env list` and `webpub env add <name>`

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use webpub_core::{config, Config, CoreError, Environment, EnvironmentName};

#[derive(Subcommand, Debug)]
pub enum EnvCommand {
    /// List configured environments.
    List,

    /// Add an environment to `~/.webpub/config.yaml`.
    Add(AddArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Environment name used with `publish --env`.
    pub name: String,

    /// Organization root URL.
    #[arg(long)]
    pub url: String,

    /// Skip files whose resource does not exist yet instead of creating it.
    #[arg(long)]
    pub no_create: bool,

    /// Variable holding the bearer token. Defaults to WEBPUB_TOKEN.
    #[arg(long, value_name = "VAR")]
    pub token_env: Option<String>,

    /// Web API version, e.g. `v9.2`.
    #[arg(long)]
    pub api_version: Option<String>,
}

pub fn run(cmd: EnvCommand) -> Result<()> {
    match cmd {
        EnvCommand::List => list(),
        EnvCommand::Add(args) => add(args),
    }
}

#[derive(Tabled)]
struct EnvRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "url")]
    url: String,
    #[tabled(rename = "creates missing")]
    creates_missing: String,
    #[tabled(rename = "token variable")]
    token_env: String,
    #[tabled(rename = "api")]
    api_version: String,
}

fn list() -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let config = match config::load_at(&home) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { path }) => {
            println!("No environments configured ({} does not exist).", path.display());
            println!("Run: webpub env add <name> --url <url>");
            return Ok(());
        }
        Err(err) => return Err(err).context("failed to load configuration"),
    };
    if config.environments.is_empty() {
        println!("No environments configured.");
        return Ok(());
    }

    let rows: Vec<EnvRow> = config
        .environments
        .iter()
        .map(|env| EnvRow {
            name: env.name.to_string(),
            url: env.url.clone(),
            creates_missing: if env.create_missing_resources {
                "yes".green().to_string()
            } else {
                "no".yellow().to_string()
            },
            token_env: env.token_env().to_string(),
            api_version: env.api_version().to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn add(args: AddArgs) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let mut config = match config::load_at(&home) {
        Ok(config) => config,
        Err(CoreError::ConfigNotFound { .. }) => Config::default(),
        Err(err) => return Err(err).context("failed to load configuration"),
    };

    let url = args.url.trim().trim_end_matches('/').to_string();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        bail!("--url must be an http(s) URL, got '{url}'");
    }
    if config.environment(&args.name).is_ok() {
        bail!("environment '{}' is already configured", args.name);
    }

    config.environments.push(Environment {
        name: EnvironmentName::from(args.name.as_str()),
        url,
        create_missing_resources: !args.no_create,
        token_env: args.token_env,
        api_version: args.api_version,
    });
    config::save_at(&home, &config).context("failed to save configuration")?;
    println!("✓ environment '{}' added", args.name);
    Ok(())
}
