mod cli;
mod commands;
mod observability;
mod output;

use anyhow::{Context as _, Result};
use clap::Parser;

use arbor_config::{bootstrap, load_config};
use arbor_policy::RuleRegistry;

use cli::{Cli, Commands};
use output::{print_error, print_success};

fn main() {
    if let Err(e) = run() {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    observability::init_tracing_with_level("warn");

    let cfg = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    observability::apply_logging_level(&cfg.logging.level);

    if let Commands::Config = cli.command {
        let rendered = toml::to_string_pretty(&cfg).context("failed to render configuration")?;
        println!("{rendered}");
        return Ok(());
    }

    let registry = RuleRegistry::with_builtin();
    let booted = bootstrap(&cfg, &registry).context("failed to bootstrap policies")?;
    tracing::debug!(
        resources = booted.catalog.len(),
        policies = booted.policies,
        "policy store ready"
    );

    match &cli.command {
        Commands::Check(args) => commands::access::check(&booted, args, format)?,
        Commands::Rules(args) => commands::inspect::rules(&booted, args, format)?,
        Commands::Policy(args) => commands::inspect::policy(&booted, args, format)?,
        Commands::Resources => {
            commands::inspect::resources(&booted, format)?;
            if matches!(format, cli::OutputFormat::Table) {
                print_success(&format!(
                    "{} resources, {} policies loaded",
                    booted.catalog.len(),
                    booted.policies
                ));
            }
        }
        Commands::Config => {}
    }

    Ok(())
}
