use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use portalspace_assets::{DirectorySource, DocumentSource};
use portalspace_common::WorldUrl;
use portalspace_render::HeadlessScene;
use portalspace_stream::{StreamConfig, StreamController};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "portalspace-cli", about = "CLI tool for portal world graphs")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Streaming config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the preload hop count
    #[arg(long, global = true)]
    hops: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Parse every world document in a directory and check portal targets
    Validate {
        /// Directory holding *.json world documents
        dir: PathBuf,
    },
    /// Load a root world and print the resulting registry
    Load {
        /// Directory world URLs resolve against
        dir: PathBuf,
        /// Root world URL, relative to the directory
        root: String,
    },
    /// Load a root world, then cross portals by destination name
    Walk {
        dir: PathBuf,
        root: String,
        /// Destination names (or URLs) to cross into, in order
        #[arg(required = true)]
        path: Vec<String>,
    },
}

type Controller = StreamController<DirectorySource, HeadlessScene>;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => StreamConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StreamConfig::default(),
    };
    if let Some(hops) = cli.hops {
        config.preload_hops = hops;
    }

    match cli.command {
        Commands::Info => {
            println!("portalspace-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", portalspace_common::crate_info());
            println!("assets: {}", portalspace_assets::crate_info());
            println!("render: {}", portalspace_render::crate_info());
            println!("stream: {}", portalspace_stream::crate_info());
            println!(
                "config: hops={} cell={} grid={}x{}",
                config.preload_hops, config.grid.cell_extent, config.grid.columns, config.grid.rows
            );
        }
        Commands::Validate { dir } => validate(dir)?,
        Commands::Load { dir, root } => {
            let mut controller = open(dir, config);
            let root = WorldUrl::parse(root)?;
            let report = controller
                .load_world_as_root(&root, None)
                .with_context(|| format!("loading root {root}"))?;
            settle(&mut controller);
            println!(
                "Loaded {} neighbour(s), {} failed, {} link(s)",
                report.loaded.len(),
                report.failed.len(),
                report.links_created
            );
            print!("{}", controller.summary());
        }
        Commands::Walk { dir, root, path } => {
            let mut controller = open(dir, config);
            let root = WorldUrl::parse(root)?;
            controller
                .load_world_as_root(&root, None)
                .with_context(|| format!("loading root {root}"))?;
            settle(&mut controller);
            print!("{}", controller.summary());

            for step in path {
                walk_into(&mut controller, &step)?;
                settle(&mut controller);
                print!("{}", controller.summary());
            }
        }
    }

    Ok(())
}

fn open(dir: PathBuf, config: StreamConfig) -> Controller {
    StreamController::new(config, DirectorySource::new(dir), HeadlessScene::new())
}

/// Resolve every queued asset load.
fn settle(controller: &mut Controller) {
    for done in controller.scene_mut().finish_loads() {
        controller.complete_asset(done);
    }
}

/// Walk the camera through the root's portal leading to `step`.
fn walk_into(controller: &mut Controller, step: &str) -> anyhow::Result<()> {
    let root = controller
        .root()
        .cloned()
        .context("no root world loaded")?;
    let state = controller
        .registry()
        .get(&root)
        .context("root world missing from registry")?;
    let link = state
        .links()
        .iter()
        .find(|l| l.destination().as_str() == step || l.destination().display_name() == step)
        .with_context(|| format!("{root} has no portal to {step}"))?;
    let id = link.id();
    let entry = link.placement().entry;

    // Step through the entry plane along its facing direction.
    let forward = entry.forward();
    let events = controller
        .scene()
        .move_camera(entry.position - forward * 0.5, entry.position + forward * 0.5);
    let Some(event) = events.into_iter().find(|e| e.link == id && e.from_entry_side) else {
        bail!("camera path missed the portal to {step}");
    };

    let outcome = controller.handle_crossing(event)?;
    println!(
        "Crossed {} -> {}: evicted {:?}, loaded {:?}, camera shift {}",
        outcome.old_root,
        outcome.new_root,
        outcome.flush.evicted.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
        outcome.load.loaded.iter().map(|u| u.as_str()).collect::<Vec<_>>(),
        outcome.camera_shift
    );
    Ok(())
}

fn validate(dir: PathBuf) -> anyhow::Result<()> {
    let source = DirectorySource::new(&dir);
    let urls = source
        .list(".")
        .with_context(|| format!("listing {}", dir.display()))?;
    let known: BTreeSet<&WorldUrl> = urls.iter().collect();

    let mut errors = 0;
    let mut portals = 0;
    for url in &urls {
        match source.fetch(url) {
            Ok(doc) => {
                for (index, dest) in doc.destinations(url) {
                    portals += 1;
                    if !known.contains(&dest) {
                        println!("  {url}: portal {index} -> {dest} (dangling)");
                    }
                }
            }
            Err(e) => {
                errors += 1;
                println!("  {url}: {e}");
            }
        }
    }
    println!(
        "Validated {} document(s), {portals} portal(s), {errors} error(s)",
        urls.len()
    );
    if errors > 0 {
        bail!("{errors} invalid world document(s)");
    }
    Ok(())
}
