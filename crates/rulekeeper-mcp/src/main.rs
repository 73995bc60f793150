mod init;
mod server;

use rmcp::ServiceExt;
use rulekeeper_core::RulesConfig;
use server::RulekeeperServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Handle `rulekeeper-mcp init` subcommand
    if std::env::args().nth(1).as_deref() == Some("init") {
        return init::init_project();
    }

    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = RulesConfig::from_env();
    tracing::info!(
        rules_dir = %config.rules_dir.display(),
        manifest = %config.manifest_path.display(),
        "starting rulekeeper MCP server"
    );

    let service = RulekeeperServer::new(config)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!("MCP server error: {}", e))?;
    service.waiting().await?;
    Ok(())
}
