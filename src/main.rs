use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use cpg_explorer::api::http::run_http_server;
use cpg_explorer::config::{load_config, ExplorerConfig};
use cpg_explorer::error::Result;
use cpg_explorer::graph::profile::{TraversalProfile, CALL_GRAPH, DATA_FLOW};
use cpg_explorer::graph::store::GraphStore;
use cpg_explorer::observability::init_logging;

#[derive(Debug, Parser)]
#[command(name = "cpg-explorer", version, about = "Explore a precomputed code property graph")]
struct Cli {
    /// Explicit YAML config file (highest file priority).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the CPG database. Overrides config and environment.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Listen address, e.g. 127.0.0.1:8080.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Print the call-graph neighborhood of a function as JSON.
    Callgraph(TraversalArgs),
    /// Print the data-flow neighborhood of a node as JSON.
    Dataflow(TraversalArgs),
}

#[derive(Debug, Args)]
struct TraversalArgs {
    /// Root node id.
    id: String,

    /// Maximum depth; clamped to the profile's range.
    #[arg(long)]
    depth: Option<String>,

    /// Direction word (callgraph: outgoing|incoming|both, dataflow: forward|backward|both).
    #[arg(long)]
    direction: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn resolve_config(cli: &Cli) -> Result<ExplorerConfig> {
    let project_root = std::env::current_dir().ok();
    let mut config = load_config(cli.config.as_deref(), project_root.as_deref())?;
    if let Some(db) = &cli.db {
        config.database.path = db.clone();
    }
    if let Command::Serve { addr: Some(addr) } = &cli.command {
        config.server.addr = addr.clone();
    }
    Ok(config)
}

fn print_traversal(
    config: &ExplorerConfig,
    profile: &TraversalProfile,
    args: &TraversalArgs,
) -> Result<()> {
    let request = profile.resolve(
        Some(args.id.as_str()),
        args.depth.as_deref(),
        args.direction.as_deref(),
    )?;
    let store = GraphStore::open(&config.database.path, &config.database)?;
    let graph = profile.run(&store, &request)?;
    let json = if args.pretty {
        serde_json::to_string_pretty(&graph)
    } else {
        serde_json::to_string(&graph)
    }
    .map_err(std::io::Error::other)?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match &cli.command {
        Command::Serve { .. } => run_http_server(&config).await?,
        Command::Callgraph(args) => print_traversal(&config, &CALL_GRAPH, args)?,
        Command::Dataflow(args) => print_traversal(&config, &DATA_FLOW, args)?,
    }
    Ok(())
}
