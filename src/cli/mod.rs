pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "shopdesk")]
#[command(about = "Shopdesk operator CLI - tenant tables, namespaces and schema inspection")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Tenant provisioning, repair, teardown and export")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },

    #[command(about = "Inspect live entity columns of a tenant")]
    Describe {
        #[command(subcommand)]
        cmd: commands::describe::DescribeCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let state = AppState::connect(config::config().clone()).await?;

    let result = match cli.command {
        Commands::Tenant { cmd } => commands::tenant::handle(&state, cmd, output_format).await,
        Commands::Describe { cmd } => commands::describe::handle(&state, cmd, output_format).await,
    };
    state.db().close().await;
    result
}
