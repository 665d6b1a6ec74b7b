//! storage-api-branch - print the branch a Storage API configuration resolves to

use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storage_api_branch::{config::Args, ClientWrapper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("storage_api_branch={},warn", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let options = args.client_options()?;
    info!("Storage API: {}", args.url);
    info!(
        "Branch: {}",
        options.branch_id().unwrap_or(storage_api_branch::BRANCH_DEFAULT)
    );

    let mut wrapper = ClientWrapper::new(options);
    let branch = wrapper.branch().await?;
    let default_branch = wrapper.default_branch().await?;
    let token = wrapper.token().await?;

    let summary = json!({
        "branchId": branch.id,
        "branchName": branch.name,
        "isDefault": wrapper.is_default_branch().await?,
        "defaultBranchId": default_branch.id,
        "defaultBranchName": default_branch.name,
        "authMethod": wrapper.auth_method()?.as_str(),
        "tokenId": token.token_id(),
        "projectId": token.project_id(),
        "projectName": token.project_name(),
        "permissions": token.permissions(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
