use clap::Subcommand;
use futures::StreamExt;
use serde_json::json;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::state::AppState;
use crate::types::TenantId;

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Create any missing entity tables for a tenant")]
    Provision {
        #[arg(help = "Tenant id")]
        tenant: i64,
    },

    #[command(about = "Drop every entity table of a tenant")]
    Deprovision {
        #[arg(help = "Tenant id")]
        tenant: i64,

        #[arg(long, help = "Also delete the tenant's filesystem namespace")]
        purge_files: bool,
    },

    #[command(about = "Recreate missing tables and namespace pieces")]
    Heal {
        #[arg(help = "Tenant id")]
        tenant: i64,
    },

    #[command(about = "Write a tar.gz export of a tenant")]
    Export {
        #[arg(help = "Tenant id")]
        tenant: i64,

        #[arg(long, short, help = "Destination file")]
        output: PathBuf,
    },
}

pub async fn handle(state: &AppState, cmd: TenantCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::Provision { tenant } => {
            let tenant = TenantId::new(tenant)?;
            let tables = state.provisioner().provision(tenant).await?;
            let names: Vec<&str> = tables.iter().map(|t| t.as_str()).collect();
            output_success(
                output_format,
                &format!("Provisioned {} tables for tenant {}", names.len(), tenant),
                Some(json!({ "tenant": tenant, "tables": names })),
            )
        }
        TenantCommands::Deprovision { tenant, purge_files } => {
            let tenant = TenantId::new(tenant)?;
            let tables = state.provisioner().deprovision(tenant).await?;
            let removed = if purge_files {
                state.fs().delete_namespace(tenant).await?
            } else {
                false
            };
            output_success(
                output_format,
                &format!("Dropped {} tables for tenant {}", tables.len(), tenant),
                Some(json!({ "tenant": tenant, "tables_dropped": tables.len(), "namespace_removed": removed })),
            )
        }
        TenantCommands::Heal { tenant } => {
            let tenant = TenantId::new(tenant)?;
            if state.accounts().find(tenant.get()).await?.is_none() {
                anyhow::bail!("tenant {} has no account; refusing to recreate its storage", tenant);
            }
            let tables = state.provisioner().provision(tenant).await?;
            let repaired = state.fs().ensure_namespace(tenant).await?;
            let snapshot = state.namespace().update_archive_snapshot(tenant).await?;
            output_success(
                output_format,
                &format!("Tenant {} healed ({} namespace pieces recreated)", tenant, repaired.len()),
                Some(json!({
                    "tenant": tenant,
                    "tables": tables.len(),
                    "repaired": repaired,
                    "workers": snapshot.subordinate_workers.total,
                })),
            )
        }
        TenantCommands::Export { tenant, output } => {
            let tenant = TenantId::new(tenant)?;
            let mut stream = state.namespace().export(tenant).await?;
            let mut file = tokio::fs::File::create(&output).await?;
            let mut written = 0u64;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            output_success(
                output_format,
                &format!("Exported tenant {} to {} ({} bytes)", tenant, output.display(), written),
                Some(json!({ "tenant": tenant, "output": output, "bytes": written })),
            )
        }
    }
}
