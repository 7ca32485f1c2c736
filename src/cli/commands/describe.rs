use clap::Subcommand;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::entity::Entity;
use crate::state::AppState;
use crate::types::TenantId;

#[derive(Subcommand)]
pub enum DescribeCommands {
    #[command(about = "Show live columns of an entity table")]
    Columns {
        #[arg(help = "Entity name (customers, products, paymentlogs, ...)")]
        entity: String,

        #[arg(long, help = "Tenant id")]
        tenant: i64,
    },

    #[command(about = "Show columns with their inferred form field type")]
    Fields {
        #[arg(help = "Entity name (customers, products, paymentlogs, ...)")]
        entity: String,

        #[arg(long, help = "Tenant id")]
        tenant: i64,
    },
}

async fn provisioned_target(state: &AppState, entity: &str, tenant: i64) -> anyhow::Result<(Entity, TenantId)> {
    let entity: Entity = entity.parse()?;
    let tenant = TenantId::new(tenant)?;
    if !state.introspector().table_exists(tenant, entity).await? {
        anyhow::bail!("table for {} is not provisioned for tenant {}", entity, tenant);
    }
    Ok((entity, tenant))
}

pub async fn handle(state: &AppState, cmd: DescribeCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        DescribeCommands::Columns { entity, tenant } => {
            let (entity, tenant) = provisioned_target(state, &entity, tenant).await?;
            let columns = state.introspector().get_columns(tenant, entity).await?;
            let rows: Vec<(String, String)> = columns
                .into_iter()
                .map(|c| {
                    let nullable = if c.nullable { "" } else { " NOT NULL" };
                    let default = c.default.map(|d| format!(" DEFAULT {}", d)).unwrap_or_default();
                    (c.name, format!("{}{}{}", c.sql_type, nullable, default))
                })
                .collect();
            output_pairs(output_format, "columns", &rows)
        }
        DescribeCommands::Fields { entity, tenant } => {
            let (entity, tenant) = provisioned_target(state, &entity, tenant).await?;
            let rows: Vec<(String, String)> = state
                .introspector()
                .get_field_types(tenant, entity)
                .await?
                .into_iter()
                .map(|(name, field_type)| (name, field_type.as_str().to_string()))
                .collect();
            output_pairs(output_format, "fields", &rows)
        }
    }
}
