use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Arbor CLI: inspect hierarchical policies and access decisions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./arbor.toml)
    #[arg(short, long, global = true, env = "ARBOR_CONFIG")]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decide which resources a user may access for a purpose
    Check(CheckArgs),
    /// Show the merged rules applying to a resource
    Rules(RulesArgs),
    /// Show the policy stored directly on a resource or data type
    Policy(PolicyArgs),
    /// List the configured resource tree
    Resources,
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Requesting user id
    #[arg(short, long)]
    pub user: String,
    /// Role held by the user (repeatable)
    #[arg(long = "role")]
    pub roles: Vec<String>,
    /// Authorisation held by the user (repeatable)
    #[arg(long = "auth")]
    pub auths: Vec<String>,
    /// Purpose of the request
    #[arg(short, long)]
    pub purpose: String,
    /// Extra context entries as key=value pairs
    #[arg(long = "context")]
    pub context: Vec<String>,
    /// Resource ids to check (all leaves if omitted)
    pub resources: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum RuleLevelArg {
    #[default]
    Resource,
    Record,
}

#[derive(clap::Args)]
pub struct RulesArgs {
    /// Resource id
    pub resource: String,
    /// Rule level to resolve
    #[arg(short, long, default_value = "resource")]
    pub level: RuleLevelArg,
    /// Data type used for the type overlay (defaults to the resource's own)
    #[arg(short = 't', long = "type")]
    pub resource_type: Option<String>,
}

#[derive(clap::Args)]
pub struct PolicyArgs {
    /// Resource id
    #[arg(required_unless_present = "resource_type", conflicts_with = "resource_type")]
    pub resource: Option<String>,
    /// Data type instead of a resource
    #[arg(short = 't', long = "type")]
    pub resource_type: Option<String>,
}
