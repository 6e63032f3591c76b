// feedmesh: registry and routing inspection CLI
//
// Operates on this node's registry tables, with configured peers joined
// into the distributed scope.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use feedmesh_core::registry::Route;
use feedmesh_core::store::Table;
use feedmesh_core::{FeedMesh, FeedSelector, NeighbourState, TableStore};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "feedmesh")]
#[command(about = "FeedMesh — registry and route inspection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List candidate routes between two nodes
    Routes { start: String, end: String },
    /// Resolve the hop list between two nodes
    Resolve { start: String, end: String },
    /// Routes towards the nodes hosting task feeds
    FeedRoutes {
        #[arg(short, long, default_value = "*")]
        task: String,
        #[arg(short, long, default_value = "*")]
        platform: String,
        #[arg(short, long, default_value = "*")]
        system: String,
        #[arg(short, long, default_value = "*")]
        feed: String,
        /// Start node (defaults to this node)
        #[arg(long)]
        from: Option<String>,
    },
    /// Show the neighbour edges of a node
    Neighbours { node: String },
    /// Manage route rows
    Route {
        #[command(subcommand)]
        action: RouteAction,
    },
    /// Configure settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show node and table status
    Status,
}

#[derive(Subcommand)]
enum RouteAction {
    Add {
        start: String,
        end: String,
        ordinal: i64,
        descriptor: String,
    },
    Remove {
        start: String,
        end: String,
        ordinal: i64,
    },
    List {
        /// Only routes starting at this node
        start: Option<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Set { key: String, value: String },
    Get { key: String },
    List,
    Peer {
        #[command(subcommand)]
        action: PeerAction,
    },
}

#[derive(Subcommand)]
enum PeerAction {
    Add { id: String, storage_path: String },
    Remove { id: String },
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Routes { start, end } => cmd_routes(&start, &end),
        Commands::Resolve { start, end } => cmd_resolve(&start, &end),
        Commands::FeedRoutes {
            task,
            platform,
            system,
            feed,
            from,
        } => cmd_feed_routes(FeedSelector::new(task, platform, system, feed), from),
        Commands::Neighbours { node } => cmd_neighbours(&node),
        Commands::Route { action } => cmd_route(action),
        Commands::Config { action } => cmd_config(action),
        Commands::Status => cmd_status(),
    }
}

/// Open this node's registry and join every reachable configured peer.
fn open_mesh() -> Result<FeedMesh> {
    let config = config::Config::load()?;
    let default_storage = config::Config::data_dir()?.join("registry");
    let mesh = FeedMesh::open(config.registry_config(default_storage))
        .context("Failed to open registry")?;

    for peer in &config.peers {
        match TableStore::open(&peer.storage_path) {
            Ok(store) => mesh.join_peer(peer.id.clone(), Arc::new(store)),
            Err(e) => {
                tracing::warn!("Skipping peer {} at {}: {}", peer.id, peer.storage_path, e);
            }
        }
    }
    Ok(mesh)
}

fn cmd_routes(start: &str, end: &str) -> Result<()> {
    let mesh = open_mesh()?;
    let routes = mesh
        .route_resolver()
        .get_routes(start, end)
        .context("Route lookup failed")?;

    println!("{} {} → {}", "Routes".bold(), start.bright_cyan(), end.bright_cyan());
    if routes.is_empty() {
        println!("  {}", "(no routes)".dimmed());
    }
    for route in &routes {
        print_route(route);
    }
    Ok(())
}

fn cmd_resolve(start: &str, end: &str) -> Result<()> {
    let mesh = open_mesh()?;
    let hops = mesh
        .route_resolver()
        .resolve(start, end)
        .with_context(|| format!("Failed to resolve {} → {}", start, end))?;

    println!("{} {}", "✓".green(), hops.join(" → ").bright_green());
    Ok(())
}

fn cmd_feed_routes(selector: FeedSelector, from: Option<String>) -> Result<()> {
    let mesh = open_mesh()?;
    let start = from.unwrap_or_else(|| mesh.node_id().to_string());
    let routes = mesh
        .feed_route_query()
        .get_feed_routes(&selector, &start)
        .context("Feed route query failed")?;

    println!("{} from {}", "Feed routes".bold(), start.bright_cyan());
    if routes.is_empty() {
        println!("  {}", "(no matching feeds)".dimmed());
        return Ok(());
    }
    for route in &routes {
        println!(
            "  {}/{}/{}/{} @ {} [{}] {}",
            route.task_id.bright_cyan(),
            route.platform_id,
            route.system_id,
            route.feed_id,
            route.end_node_id.bright_yellow(),
            route.ordinal,
            route.route
        );
    }
    Ok(())
}

fn cmd_neighbours(node: &str) -> Result<()> {
    let mesh = open_mesh()?;
    let discovery = mesh.neighbour_discovery();
    let edges = discovery.get_unique_neighbours_by_neighbour_id(node);

    println!("{} of {}", "Neighbours".bold(), node.bright_cyan());
    if edges.is_empty() {
        println!("  {}", "(none recorded)".dimmed());
    }
    for edge in &edges {
        let state = match NeighbourState::of(Some(edge.entity())) {
            NeighbourState::StaticAvailable => "static".green(),
            NeighbourState::DynamicAvailable => "dynamic".bright_green(),
            NeighbourState::Unavailable => "down".red(),
            NeighbourState::Unknown => "unknown".dimmed(),
        };
        let endpoint = discovery
            .get_ip_mapping_for_neighbour(edge)
            .map(|m| m.endpoint())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<8} {}:{} → {}:{}  {}",
            state,
            edge.node_id,
            edge.node_interface,
            edge.neighbour_id.bright_cyan(),
            edge.neighbour_interface,
            endpoint.dimmed()
        );
    }
    Ok(())
}

fn cmd_route(action: RouteAction) -> Result<()> {
    let mesh = open_mesh()?;
    let routes = &mesh.registry().local().routes;

    match action {
        RouteAction::Add {
            start,
            end,
            ordinal,
            descriptor,
        } => {
            let mut route = routes.create_with(Route::new(start, end, ordinal, descriptor));
            if !routes.save(&mut route).context("Invalid route")? {
                anyhow::bail!("Failed to store route");
            }
            mesh.flush()?;
            println!("{} Added route", "✓".green());
            print_route(&route);
        }

        RouteAction::Remove { start, end, ordinal } => {
            let route = routes
                .get_by_key(&[start.as_str().into(), end.as_str().into(), ordinal.into()])
                .with_context(|| format!("No route {} → {} [{}]", start, end, ordinal))?;
            if !routes.delete(&route) {
                anyhow::bail!("Failed to remove route");
            }
            mesh.flush()?;
            println!("{} Removed route", "✓".green());
        }

        RouteAction::List { start } => {
            let listed = match &start {
                Some(start) => routes.get_routes_by_start_node(start),
                None => routes.get_all_routes(),
            };
            println!("{}", "Routes".bold());
            if listed.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for route in &listed {
                print_route(route);
            }
        }
    }

    Ok(())
}

fn cmd_config(action: ConfigAction) -> Result<()> {
    let mut config = config::Config::load()?;

    match action {
        ConfigAction::Set { key, value } => {
            config.set(&key, &value)?;
            config.save()?;
            println!("{} Set {} = {}", "✓".green(), key.bright_cyan(), value);
        }

        ConfigAction::Get { key } => {
            if let Some(value) = config.get(&key) {
                println!("{} = {}", key.bright_cyan(), value);
            } else {
                anyhow::bail!("Unknown config key: {}", key);
            }
        }

        ConfigAction::List => {
            println!("{}", "Configuration".bold());
            println!();

            for (key, value) in config.list() {
                println!("  {:<20} {}", key.bright_cyan(), value);
            }

            println!();
            print_peers(&config);
        }

        ConfigAction::Peer { action } => match action {
            PeerAction::Add { id, storage_path } => {
                config.add_peer(id.clone(), storage_path);
                config.save()?;
                println!("{} Added peer: {}", "✓".green(), id);
            }

            PeerAction::Remove { id } => {
                if !config.remove_peer(&id) {
                    anyhow::bail!("Unknown peer: {}", id);
                }
                config.save()?;
                println!("{} Removed peer", "✓".green());
            }

            PeerAction::List => print_peers(&config),
        },
    }

    Ok(())
}

fn cmd_status() -> Result<()> {
    let mesh = open_mesh()?;
    let config = mesh.registry().config();

    println!("{}", "FeedMesh Status".bold());
    println!("  Node:       {}", config.node_id.bright_cyan());
    println!(
        "  Storage:    {}",
        config.storage_path.as_deref().unwrap_or("(memory)")
    );
    println!("  Strategy:   {}", config.default_strategy);
    let peers = mesh.store().peer_ids();
    println!(
        "  Peers:      {}",
        if peers.is_empty() {
            "(none)".to_string()
        } else {
            peers.join(", ")
        }
    );
    println!();

    println!("{}", "Local tables".bold());
    for table in Table::ALL {
        let count = mesh
            .store()
            .local()
            .count(table)
            .with_context(|| format!("Failed to count {}", table))?;
        println!("  {:<28} {}", table.name(), count);
    }
    Ok(())
}

fn print_route(route: &Route) {
    println!(
        "  [{}] {} → {}  {}",
        route.ordinal.to_string().bright_yellow(),
        route.start_node,
        route.end_node,
        route.route
    );
}

fn print_peers(config: &config::Config) {
    println!("{}", "Peers:".bold());
    if config.peers.is_empty() {
        println!("  {}", "(none configured)".dimmed());
    } else {
        for (i, peer) in config.peers.iter().enumerate() {
            println!("  {}. {} ({})", i + 1, peer.id.bright_cyan(), peer.storage_path);
        }
    }
}
