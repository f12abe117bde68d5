mod config;

use clap::{Parser, Subcommand};
use config::{DocrelayConfig, UPSTREAM_URL_ENV};
use docrelay_core::ToolCall;
use docrelay_gateway::{serve_stdio, GatewayServer, McpServer};
use docrelay_tools::{register_all, RelayContext, ToolRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "docrelay",
    version,
    about = "MCP relay for the AWS Knowledge documentation server"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "docrelay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve MCP over HTTP
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Serve MCP over stdin/stdout
    Stdio,
    /// List the exposed tools
    Tools,
    /// Invoke one tool and print its text
    Call {
        /// Tool name, e.g. `list_regions`
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
}

fn init_tracing(json_to_stdout: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json_to_stdout {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        // stdout belongs to protocol frames and tool output
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::Serve { .. }));

    let config = DocrelayConfig::load(&cli.config)?
        .with_upstream_override(std::env::var(UPSTREAM_URL_ENV).ok());

    let context = Arc::new(RelayContext::http(
        config.upstream.url.clone(),
        config.upstream.timeout(),
    ));
    info!(
        upstream = %context.endpoint(),
        timeout_secs = config.upstream.timeout_secs,
        "Upstream configured"
    );

    let mut registry = ToolRegistry::new();
    register_all(&mut registry, context);
    let registry = Arc::new(registry);

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let app = GatewayServer::build(Arc::new(McpServer::new(registry)));
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            info!("docrelay listening on {addr}");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Stdio => {
            let server = McpServer::new(registry);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            serve_stdio(&server, stdin, tokio::io::stdout()).await?;
        }
        Commands::Tools => {
            let tools = registry.list_descriptors();
            for tool in &tools {
                println!("  {:<28} {}", tool.name, tool.description);
            }
            println!("\nTotal: {} tool(s)", tools.len());
        }
        Commands::Call { tool, args } => {
            let arguments: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| anyhow::anyhow!("--args is not valid JSON: {e}"))?;
            let call = ToolCall::new(uuid::Uuid::new_v4().to_string(), tool, arguments);

            let result = registry.execute(call).await?;
            if result.is_error {
                eprintln!("{}", result.content);
                std::process::exit(1);
            }
            println!("{}", result.content);
        }
    }

    Ok(())
}
