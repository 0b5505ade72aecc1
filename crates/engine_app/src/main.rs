//! # rtype
//!
//! Runs the R-Type engine as a solo host, a lobby host or a client, and
//! inspects the search index of the generated documentation.
//!
//! `RTYPE_PORT` and `RTYPE_HOST` override the defaults; command-line flags
//! override both.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use engine_app::game::register_worlds;
use engine_app::{Engine, EngineConfig};
use engine_docs::{BrokenLink, SearchIndex, SearchShard, ShardIssue};
use engine_net::waiting_room::MAX_PLAYERS;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rtype", about = "R-Type engine runtime and tools")]
struct Cli {
    /// Target frames per second
    #[arg(long, global = true, default_value_t = 60.0)]
    tick_rate: f64,

    /// Stop after this many frames (0 = run until interrupted)
    #[arg(long, global = true, default_value_t = 0)]
    max_ticks: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host a game alone
    Solo,
    /// Host a lobby and start once enough players joined
    Host {
        /// UDP port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Players, the host included, needed to start
        #[arg(long, default_value_t = 2)]
        players: usize,
    },
    /// Join a host's lobby
    Join {
        /// Host address
        #[arg(long)]
        host: Option<IpAddr>,

        /// Host UDP port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect the documentation search index
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },
}

#[derive(Subcommand, Debug)]
enum DocsAction {
    /// Print entries whose label contains QUERY, as JSON
    Search {
        query: String,

        /// Shard files (`search/all_0.js`, ...)
        #[arg(required = true)]
        shards: Vec<PathBuf>,
    },
    /// Validate every shard under DOC_ROOT/search and report broken links
    Check { doc_root: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::new()
        .with_env_overrides()
        .with_tick_rate(cli.tick_rate)
        .with_max_ticks(cli.max_ticks);

    match cli.command {
        Command::Solo => {
            let mut engine = Engine::new(config.with_solo(true).with_auto_start(1));
            engine.host().await?;
            play(engine).await
        }
        Command::Host { port, players } => {
            if !(1..=MAX_PLAYERS).contains(&players) {
                bail!("--players must be between 1 and {MAX_PLAYERS}");
            }
            let config = match port {
                Some(port) => config.with_port(port),
                None => config,
            };
            let mut engine = Engine::new(config.with_auto_start(players));
            let addr = engine.host().await?;
            info!(%addr, players, "waiting for players");
            play(engine).await
        }
        Command::Join { host, port } => {
            let config = match host {
                Some(host) => config.with_host(host),
                None => config,
            };
            let config = match port {
                Some(port) => config.with_port(port),
                None => config,
            };
            let mut engine = Engine::new(config);
            engine.connect().await?;
            play(engine).await
        }
        Command::Docs { action } => match action {
            DocsAction::Search { query, shards } => search(&query, &shards),
            DocsAction::Check { doc_root } => check(&doc_root),
        },
    }
}

async fn play(mut engine: Engine) -> Result<()> {
    register_worlds(&mut engine);
    tokio::select! {
        result = engine.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
    engine.disconnect();
    Ok(())
}

fn search(query: &str, paths: &[PathBuf]) -> Result<()> {
    let shards = paths
        .iter()
        .map(SearchShard::load)
        .collect::<Result<Vec<_>, _>>()?;
    let index = SearchIndex::merge(&shards);
    print_json(&index.search(query))
}

#[derive(Serialize)]
struct CheckReport {
    shards: usize,
    entries: usize,
    issues: Vec<FileIssue>,
    broken_links: Vec<BrokenLink>,
}

#[derive(Serialize)]
struct FileIssue {
    file: PathBuf,
    issue: ShardIssue,
}

fn check(doc_root: &Path) -> Result<()> {
    let search_dir = doc_root.join("search");
    let mut paths = std::fs::read_dir(&search_dir)
        .with_context(|| format!("cannot list {}", search_dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    paths.retain(|p| p.extension().is_some_and(|ext| ext == "js") && is_shard(p));
    paths.sort();

    let mut shards = Vec::with_capacity(paths.len());
    let mut issues = Vec::new();
    for path in paths {
        let shard = SearchShard::load(&path)?;
        for issue in shard.validate() {
            warn!(file = %path.display(), %issue, "shard issue");
            issues.push(FileIssue {
                file: path.clone(),
                issue,
            });
        }
        shards.push(shard);
    }

    let index = SearchIndex::merge(&shards);
    let broken_links = index.check_links(doc_root);
    for link in &broken_links {
        warn!(%link, "broken link");
    }
    let failed = !issues.is_empty() || !broken_links.is_empty();
    print_json(&CheckReport {
        shards: shards.len(),
        entries: index.len(),
        issues,
        broken_links,
    })?;
    if failed {
        bail!("documentation index has problems");
    }
    Ok(())
}

/// `all_0.js`, `classes_3.js`, ...; skips `search.js` and `searchdata.js`.
fn is_shard(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit_once('_'))
        .is_some_and(|(_, bucket)| !bucket.is_empty())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
