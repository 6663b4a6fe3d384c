use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rmcp::ServiceExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod clockify;
mod config;
mod dates;
mod models;
mod server;
mod tools;
mod transport;

use clockify::ClockifyClient;
use server::ClockifyServer;
use tools::Registry;

/// Clockify time tracking as MCP tools over stdio.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file to read when environment variables are not set
    #[arg(long, env = "CLOCKIFY_MCP_CONFIG")]
    config: Option<PathBuf>,
    /// Default workspace ID, overriding config and environment
    #[arg(long)]
    workspace: Option<String>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            eprintln!("clockify-mcp: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let client = ClockifyClient::new(config.api_key.clone(), config.endpoints.clone())
        .context("failed to build HTTP client")?;

    let requested = cli
        .workspace
        .filter(|id| !id.trim().is_empty())
        .or(config.workspace_id);
    let workspace_id = resolve_default_workspace(&client, requested).await?;
    info!(%workspace_id, "using default workspace");

    let (stdin, stdout) = rmcp::transport::stdio();
    let (service_io, writer) = transport::frame(stdin, stdout);
    let service = ClockifyServer::new(Registry::new(client, workspace_id))
        .serve(service_io)
        .await
        .context("MCP initialization failed")?;
    let reason = service.waiting().await.context("stdio session failed")?;
    info!(?reason, "session ended");
    writer
        .await
        .context("output writer panicked")?
        .context("failed to write to stdout")?;
    Ok(())
}

/// An explicit workspace is used as-is; otherwise the first listed one.
async fn resolve_default_workspace(
    client: &ClockifyClient,
    requested: Option<String>,
) -> Result<String> {
    if let Some(workspace_id) = requested {
        return Ok(workspace_id);
    }
    let workspaces = client.workspaces().await.context("failed to list workspaces")?;
    match workspaces.into_iter().next() {
        Some(workspace) => {
            info!(name = %workspace.name, "no workspace configured, picked the first one");
            Ok(workspace.id)
        }
        None => bail!("no workspaces found for this API key"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clockify::Endpoints;
    use mockito::Server as MockServer;

    fn client_for(server: &MockServer) -> ClockifyClient {
        ClockifyClient::new(
            "secret".to_string(),
            Endpoints {
                api: server.url(),
                reports: server.url(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn explicit_workspace_skips_listing() {
        let mut server = MockServer::new_async().await;
        let listing = server
            .mock("GET", "/workspaces")
            .expect(0)
            .create_async()
            .await;

        let id = resolve_default_workspace(&client_for(&server), Some("w9".to_string()))
            .await
            .unwrap();
        listing.assert_async().await;
        assert_eq!(id, "w9");
    }

    #[tokio::test]
    async fn first_listed_workspace_is_the_default() {
        let mut server = MockServer::new_async().await;
        let _listing = server
            .mock("GET", "/workspaces")
            .with_status(200)
            .with_body(r#"[{"id":"w1","name":"Main"},{"id":"w2","name":"Side"}]"#)
            .create_async()
            .await;

        let id = resolve_default_workspace(&client_for(&server), None)
            .await
            .unwrap();
        assert_eq!(id, "w1");
    }

    #[tokio::test]
    async fn no_workspaces_is_fatal() {
        let mut server = MockServer::new_async().await;
        let _listing = server
            .mock("GET", "/workspaces")
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let err = resolve_default_workspace(&client_for(&server), None)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no workspaces found for this API key");
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::parse_from(["clockify-mcp", "--workspace", "w3", "--verbose"]);
        assert_eq!(cli.workspace.as_deref(), Some("w3"));
        assert!(cli.verbose);
    }
}
